//! User service
//!
//! Creates and edits story authors. Usernames are unique: a taken name is
//! reported as [`UserServiceError::UsernameTaken`] whether it is caught by
//! the pre-check or by the unique index when two requests race.

use crate::db::repositories::UserRepository;
use crate::db::DbError;
use crate::models::{User, UserInput};
use crate::services::password::hash_password;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Another user already has this username
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// No user with this id
    #[error("User not found: {0}")]
    NotFound(i64),

    /// The write was rejected by a database constraint
    #[error("Conflicting change: {0}")]
    Conflict(String),

    /// The database could not be reached
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl UserServiceError {
    fn from_db(err: DbError, username: &str) -> Self {
        match err {
            DbError::UniqueViolation(_) => Self::UsernameTaken(username.to_string()),
            DbError::Constraint(msg) => Self::Conflict(msg),
            DbError::NotFound { id, .. } => Self::NotFound(id),
            DbError::Unavailable(e) => Self::Unavailable(e.to_string()),
            DbError::Query(e) => Self::InternalError(anyhow::Error::new(e)),
        }
    }
}

impl From<DbError> for UserServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation(msg) | DbError::Constraint(msg) => Self::Conflict(msg),
            DbError::NotFound { id, .. } => Self::NotFound(id),
            DbError::Unavailable(e) => Self::Unavailable(e.to_string()),
            DbError::Query(e) => Self::InternalError(anyhow::Error::new(e)),
        }
    }
}

/// User service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// All users, ordered by name
    pub async fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list().await?)
    }

    /// Get a user by id; a missing user is `Ok(None)`
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await?)
    }

    /// Create a user, hashing the supplied password.
    ///
    /// # Errors
    ///
    /// - `UsernameTaken` if the username is in use
    /// - `InternalError` if no password was supplied or hashing failed
    pub async fn create_user(&self, input: UserInput) -> Result<User, UserServiceError> {
        if self.user_repo.get_by_username(&input.username).await?.is_some() {
            return Err(UserServiceError::UsernameTaken(input.username));
        }

        let password = input
            .password
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("A new user needs a password"))?;
        let password_hash = hash_password(password)?;

        let user = User::new(input.first_name, input.last_name, input.username, password_hash);
        let created = self
            .user_repo
            .create(&user)
            .await
            .map_err(|e| UserServiceError::from_db(e, &user.username))?;

        tracing::info!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    /// Update names and username of a user, and its password when one is
    /// supplied. Without a password the stored hash is kept.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `UsernameTaken` if another user has the new username
    pub async fn update_user(&self, id: i64, input: UserInput) -> Result<User, UserServiceError> {
        let mut user = self
            .user_repo
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound(id))?;

        if input.username != user.username {
            if let Some(other) = self.user_repo.get_by_username(&input.username).await? {
                if other.id != id {
                    return Err(UserServiceError::UsernameTaken(input.username));
                }
            }
        }

        if let Some(password) = input.password.as_deref() {
            user.password_hash = hash_password(password)?;
        }
        user.first_name = input.first_name;
        user.last_name = input.last_name;
        user.username = input.username;

        let updated = self
            .user_repo
            .update(&user)
            .await
            .map_err(|e| UserServiceError::from_db(e, &user.username))?;

        tracing::info!(user_id = updated.id, "User updated");
        Ok(updated)
    }
}
