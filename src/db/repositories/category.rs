//! Category repository
//!
//! Categories are seeded by migration and only read by the site, but
//! `create` is kept for fixtures and for operators who seed by hand.

use crate::db::{Backend, DbError, DynDatabasePool};
use crate::models::Category;
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a category, returning it with its new id
    async fn create(&self, category: &Category) -> Result<Category, DbError>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>, DbError>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<Category>, DbError>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => create_category_mysql(pool, category).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_category_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_category_by_id_mysql(pool, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_categories_sqlite(pool).await,
            Backend::Mysql(pool) => list_categories_mysql(pool).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(
    pool: &SqlitePool,
    category: &Category,
) -> Result<Category, DbError> {
    let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(&category.name)
        .execute(pool)
        .await?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: category.name.clone(),
    })
}

async fn get_category_by_id_sqlite(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<Category>, DbError> {
    let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|row| row_to_category_sqlite(&row)).transpose()
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>, DbError> {
    let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name, id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_category_sqlite).collect()
}

pub(crate) fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category, DbError> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category, DbError> {
    let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(&category.name)
        .execute(pool)
        .await?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        name: category.name.clone(),
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>, DbError> {
    let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|row| row_to_category_mysql(&row)).transpose()
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>, DbError> {
    let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name, id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_category_mysql).collect()
}

pub(crate) fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category, DbError> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}
