//! Typed persistence errors
//!
//! Repositories report failures as [`DbError`] so callers can tell a
//! rejected write (constraint) from an unreachable database without
//! inspecting error strings.

use sqlx::error::ErrorKind;

/// Error returned by repository operations
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A unique index rejected the write (e.g. a taken username)
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A foreign key, not-null or check constraint rejected the write
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The row a write depends on does not exist
    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: i64 },

    /// The database could not be reached
    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// Any other database failure
    #[error("database error: {0}")]
    Query(#[source] sqlx::Error),
}

impl DbError {
    /// True for unique, foreign key, not-null and check violations
    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::UniqueViolation(_) | Self::Constraint(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let message = db_err.message().to_string();
            return match db_err.kind() {
                ErrorKind::UniqueViolation => Self::UniqueViolation(message),
                ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => Self::Constraint(message),
                _ => Self::Query(err),
            };
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err),
            other => Self::Query(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::Unavailable(_)));
        assert!(matches!(DbError::from(sqlx::Error::PoolClosed), DbError::Unavailable(_)));
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Query(_)));
        assert!(!err.is_constraint());
    }

    #[tokio::test]
    async fn test_unique_violation_classified() {
        let pool = create_test_pool().await.unwrap();
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("CREATE TABLE t (name TEXT UNIQUE)").execute(sqlite).await.unwrap();
        sqlx::query("INSERT INTO t VALUES ('a')").execute(sqlite).await.unwrap();

        let err = sqlx::query("INSERT INTO t VALUES ('a')")
            .execute(sqlite)
            .await
            .unwrap_err();

        assert!(matches!(DbError::from(err), DbError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_foreign_key_violation_classified() {
        let pool = create_test_pool().await.unwrap();
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("CREATE TABLE p (id INTEGER PRIMARY KEY)").execute(sqlite).await.unwrap();
        sqlx::query("CREATE TABLE c (p_id INTEGER REFERENCES p(id))")
            .execute(sqlite)
            .await
            .unwrap();

        let err = sqlx::query("INSERT INTO c VALUES (7)")
            .execute(sqlite)
            .await
            .unwrap_err();

        let err = DbError::from(err);
        assert!(matches!(err, DbError::Constraint(_)));
        assert!(err.is_constraint());
    }
}
