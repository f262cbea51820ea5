//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DbError, DynDatabasePool};
use crate::models::User;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user, returning it with its new id
    async fn create(&self, user: &User) -> Result<User, DbError>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, DbError>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError>;

    /// List all users ordered by name
    async fn list(&self) -> Result<Vec<User>, DbError>;

    /// Overwrite names, username and password hash of an existing user
    async fn update(&self, user: &User) -> Result<User, DbError>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_user_by_id_mysql(pool, id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_user_by_username_sqlite(pool, username).await,
            Backend::Mysql(pool) => get_user_by_username_mysql(pool, username).await,
        }
    }

    async fn list(&self) -> Result<Vec<User>, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_users_sqlite(pool).await,
            Backend::Mysql(pool) => list_users_mysql(pool).await,
        }
    }

    async fn update(&self, user: &User) -> Result<User, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => update_user_mysql(pool, user).await,
        }
    }
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, username, password_hash, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User, DbError> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, username, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn get_user_by_username_sqlite(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    let row = sqlx::query(&sql).bind(username).fetch_optional(pool).await?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn list_users_sqlite(pool: &SqlitePool) -> Result<Vec<User>, DbError> {
    let sql = format!(
        "SELECT {} FROM users ORDER BY first_name, last_name, id",
        USER_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_to_user_sqlite).collect()
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User, DbError> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE users
        SET first_name = ?, last_name = ?, username = ?, password_hash = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            resource: "user",
            id: user.id,
        });
    }

    Ok(User {
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User, DbError> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, username, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

async fn get_user_by_username_mysql(
    pool: &MySqlPool,
    username: &str,
) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    let row = sqlx::query(&sql).bind(username).fetch_optional(pool).await?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

async fn list_users_mysql(pool: &MySqlPool) -> Result<Vec<User>, DbError> {
    let sql = format!(
        "SELECT {} FROM users ORDER BY first_name, last_name, id",
        USER_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_to_user_mysql).collect()
}

// MySQL reports changed rows, not matched rows, so existence is checked
// separately instead of trusting rows_affected.
async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User, DbError> {
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let exists = sqlx::query("SELECT id FROM users WHERE id = ? FOR UPDATE")
        .bind(user.id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !exists {
        return Err(DbError::NotFound {
            resource: "user",
            id: user.id,
        });
    }

    sqlx::query(
        r#"
        UPDATE users
        SET first_name = ?, last_name = ?, username = ?, password_hash = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(now)
    .bind(user.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(User {
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User, DbError> {
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
