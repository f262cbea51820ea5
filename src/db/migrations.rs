//! Database migrations
//!
//! Migrations are embedded as SQL strings, one set per backend, and applied
//! in version order. Applied versions are recorded in `_migrations`, so
//! running them again is a no-op.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::{Backend, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All schema migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                username VARCHAR(50) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                username VARCHAR(50) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE
            );
        "#,
    },
    Migration {
        version: 3,
        name: "create_stories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS stories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                author_id INTEGER NOT NULL,
                is_private BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_stories_author_id ON stories(author_id);
            CREATE INDEX IF NOT EXISTS idx_stories_created_at ON stories(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS stories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                author_id BIGINT NOT NULL,
                is_private BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_stories_author_id ON stories(author_id);
            CREATE INDEX idx_stories_created_at ON stories(created_at);
        "#,
    },
    Migration {
        version: 4,
        name: "create_story_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS story_categories (
                story_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                PRIMARY KEY (story_id, category_id),
                FOREIGN KEY (story_id) REFERENCES stories(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_story_categories_category_id ON story_categories(category_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS story_categories (
                story_id BIGINT NOT NULL,
                category_id BIGINT NOT NULL,
                PRIMARY KEY (story_id, category_id),
                FOREIGN KEY (story_id) REFERENCES stories(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_story_categories_category_id ON story_categories(category_id);
        "#,
    },
    // There is no category editor, so the starting set ships with the schema.
    Migration {
        version: 5,
        name: "seed_categories",
        up_sqlite: r#"
            INSERT OR IGNORE INTO categories (name) VALUES ('World');
            INSERT OR IGNORE INTO categories (name) VALUES ('Politics');
            INSERT OR IGNORE INTO categories (name) VALUES ('Business');
            INSERT OR IGNORE INTO categories (name) VALUES ('Technology');
            INSERT OR IGNORE INTO categories (name) VALUES ('Science');
            INSERT OR IGNORE INTO categories (name) VALUES ('Sport');
            INSERT OR IGNORE INTO categories (name) VALUES ('Culture');
        "#,
        up_mysql: r#"
            INSERT IGNORE INTO categories (name) VALUES ('World');
            INSERT IGNORE INTO categories (name) VALUES ('Politics');
            INSERT IGNORE INTO categories (name) VALUES ('Business');
            INSERT IGNORE INTO categories (name) VALUES ('Technology');
            INSERT IGNORE INTO categories (name) VALUES ('Science');
            INSERT IGNORE INTO categories (name) VALUES ('Sport');
            INSERT IGNORE INTO categories (name) VALUES ('Culture');
        "#,
    },
];

/// Names of the categories inserted by the seed migration.
pub const SEED_CATEGORIES: &[&str] = &[
    "World",
    "Politics",
    "Business",
    "Technology",
    "Science",
    "Sport",
    "Culture",
];

/// Run all pending migrations, returning how many were applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_versions(pool).await?;

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.name
        );
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Versions of the migrations already applied, in ascending order
async fn get_applied_versions(pool: &DynDatabasePool) -> Result<Vec<i32>> {
    match pool.backend() {
        Backend::Sqlite(sqlite) => get_applied_versions_sqlite(sqlite).await,
        Backend::Mysql(mysql) => get_applied_versions_mysql(mysql).await,
    }
}

async fn get_applied_versions_sqlite(pool: &SqlitePool) -> Result<Vec<i32>> {
    let rows = sqlx::query("SELECT version FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows.iter().map(|row| row.get::<i64, _>("version") as i32).collect())
}

async fn get_applied_versions_mysql(pool: &MySqlPool) -> Result<Vec<i32>> {
    let rows = sqlx::query("SELECT version FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows.iter().map(|row| row.get::<i32, _>("version")).collect())
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.backend() {
        Backend::Sqlite(sqlite) => apply_migration_sqlite(sqlite, migration).await,
        Backend::Mysql(mysql) => apply_migration_mysql(mysql, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// MySQL commits DDL implicitly, so statements run one by one on the pool.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_applied_versions_recorded() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        create_migrations_table(&pool).await.unwrap();
        assert!(get_applied_versions(&pool).await.unwrap().is_empty());

        run_migrations(&pool).await.expect("Failed to run migrations");

        let expected: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert_eq!(get_applied_versions(&pool).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_seed_categories_present() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let names: Vec<String> = sqlx::query("SELECT name FROM categories ORDER BY id")
            .fetch_all(sqlite_pool)
            .await
            .unwrap()
            .iter()
            .map(|row| row.get("name"))
            .collect();

        assert_eq!(names, SEED_CATEGORIES);
    }

    #[tokio::test]
    async fn test_username_unique_constraint() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let insert = "INSERT INTO users (first_name, last_name, username, password_hash) VALUES ('A', 'B', 'dup', 'x')";
        sqlx::query(insert).execute(sqlite_pool).await.unwrap();
        let second = sqlx::query(insert).execute(sqlite_pool).await;

        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_story_requires_existing_author() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let result = sqlx::query("INSERT INTO stories (title, content, author_id) VALUES ('t', 'c', 999)")
            .execute(sqlite_pool)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_story_private_by_default() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO users (first_name, last_name, username, password_hash) VALUES ('A', 'B', 'ab', 'x')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO stories (title, content, author_id) VALUES ('t', 'c', 1)")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let row = sqlx::query("SELECT is_private FROM stories WHERE id = 1")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let is_private: bool = row.get("is_private");
        assert!(is_private);
    }

    #[tokio::test]
    async fn test_story_category_membership_is_unique() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO users (first_name, last_name, username, password_hash) VALUES ('A', 'B', 'ab', 'x')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO stories (title, content, author_id) VALUES ('t', 'c', 1)")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let link = "INSERT INTO story_categories (story_id, category_id) VALUES (1, 1)";
        sqlx::query(link).execute(sqlite_pool).await.unwrap();
        assert!(sqlx::query(link).execute(sqlite_pool).await.is_err());
    }

    #[test]
    fn test_versions_sequential() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, index as i32 + 1, "{}", migration.name);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT);\n  -- only a comment\n;\nINSERT INTO a VALUES (1);";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec!["CREATE TABLE a (id INT)", "INSERT INTO a VALUES (1)"]);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- hello\n   -- world"));
        assert!(!is_comment_only("-- hello\nSELECT 1"));
    }
}
