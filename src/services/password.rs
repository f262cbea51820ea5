//! Password hashing
//!
//! Passwords are stored as Argon2id PHC strings. Each hash carries its own
//! random salt and parameters, so verification needs nothing but the string.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};

/// Hash a password with Argon2id and a fresh salt.
///
/// ```ignore
/// use newsdesk::services::password::hash_password;
///
/// let hash = hash_password("correct horse")?;
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Check a password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only a malformed hash is an error. There is no
/// login page, so only tests check hashes.
#[cfg(test)]
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool> {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}
