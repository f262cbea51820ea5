//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A story author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Login name (unique)
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, not yet persisted user.
    ///
    /// The password must already be hashed, see `services::password::hash_password`.
    pub fn new(
        first_name: String,
        last_name: String,
        username: String,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            first_name,
            last_name,
            username,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Label used in author pickers: "First Last (username)"
    pub fn display_label(&self) -> String {
        format_author_label(&self.first_name, &self.last_name, &self.username)
    }
}

/// Build the "First Last (username)" label shown for an author.
pub fn format_author_label(first_name: &str, last_name: &str, username: &str) -> String {
    format!("{} {} ({})", first_name, last_name, username)
}

/// Validated input for creating or editing a user.
///
/// `password` is plaintext and only present when it should be (re)set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: Option<String>,
}
