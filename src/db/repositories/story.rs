//! Story repository
//!
//! Stories are written together with their `story_categories` rows, so every
//! write runs in a single transaction: either the story and its full
//! category set land, or nothing does.

use crate::db::repositories::category::{row_to_category_mysql, row_to_category_sqlite};
use crate::db::{Backend, DbError, DynDatabasePool};
use crate::models::{AuthorSummary, Category, Story, StoryRecord, StoryWithAuthor};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Story repository trait
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Insert a story and its categories
    async fn create(&self, record: &StoryRecord) -> Result<Story, DbError>;

    /// Get a story with its categories
    async fn get_by_id(&self, id: i64) -> Result<Option<Story>, DbError>;

    /// All stories with author and categories, newest first
    async fn list(&self) -> Result<Vec<StoryWithAuthor>, DbError>;

    /// Replace every column and the whole category set of a story
    async fn update(&self, id: i64, record: &StoryRecord) -> Result<Story, DbError>;

    /// Delete a story, returning whether it existed
    async fn delete(&self, id: i64) -> Result<bool, DbError>;

    /// Count all stories
    async fn count(&self) -> Result<i64, DbError>;
}

/// SQLx-based story repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxStoryRepository {
    pool: DynDatabasePool,
}

impl SqlxStoryRepository {
    /// Create a new SQLx story repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn StoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl StoryRepository for SqlxStoryRepository {
    async fn create(&self, record: &StoryRecord) -> Result<Story, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_story_sqlite(pool, record).await,
            Backend::Mysql(pool) => create_story_mysql(pool, record).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Story>, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_story_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_story_by_id_mysql(pool, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<StoryWithAuthor>, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_stories_sqlite(pool).await,
            Backend::Mysql(pool) => list_stories_mysql(pool).await,
        }
    }

    async fn update(&self, id: i64, record: &StoryRecord) -> Result<Story, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_story_sqlite(pool, id, record).await,
            Backend::Mysql(pool) => update_story_mysql(pool, id, record).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_story_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_story_mysql(pool, id).await,
        }
    }

    async fn count(&self) -> Result<i64, DbError> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_stories_sqlite(pool).await,
            Backend::Mysql(pool) => count_stories_mysql(pool).await,
        }
    }
}

/// Category ids in first-seen order with repeats removed
fn distinct_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn not_found(id: i64) -> DbError {
    DbError::NotFound {
        resource: "story",
        id,
    }
}

const LIST_SQL: &str = r#"
    SELECT s.id, s.title, s.content, s.author_id, s.is_private, s.created_at, s.updated_at,
           u.first_name, u.last_name, u.username
    FROM stories s
    JOIN users u ON u.id = s.author_id
    ORDER BY s.created_at DESC, s.id DESC
"#;

const LIST_LINKS_SQL: &str = r#"
    SELECT sc.story_id, c.id, c.name
    FROM story_categories sc
    JOIN categories c ON c.id = sc.category_id
    ORDER BY c.name, c.id
"#;

const STORY_CATEGORIES_SQL: &str = r#"
    SELECT c.id, c.name
    FROM story_categories sc
    JOIN categories c ON c.id = sc.category_id
    WHERE sc.story_id = ?
    ORDER BY c.name, c.id
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_story_sqlite(pool: &SqlitePool, record: &StoryRecord) -> Result<Story, DbError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO stories (title, content, author_id, is_private, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.title)
    .bind(&record.content)
    .bind(record.author_id)
    .bind(record.is_private)
    .bind(record.created_at)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let id = result.last_insert_rowid();

    insert_links_sqlite(&mut tx, id, &record.category_ids).await?;
    let story = fetch_story_sqlite(&mut *tx, id).await?.ok_or_else(|| not_found(id))?;

    tx.commit().await?;
    Ok(story)
}

async fn get_story_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Story>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_story_sqlite(&mut *conn, id).await
}

async fn list_stories_sqlite(pool: &SqlitePool) -> Result<Vec<StoryWithAuthor>, DbError> {
    let rows = sqlx::query(LIST_SQL).fetch_all(pool).await?;
    let link_rows = sqlx::query(LIST_LINKS_SQL).fetch_all(pool).await?;

    let mut categories: HashMap<i64, Vec<Category>> = HashMap::new();
    for row in &link_rows {
        let story_id: i64 = row.try_get("story_id")?;
        categories
            .entry(story_id)
            .or_default()
            .push(row_to_category_sqlite(row)?);
    }

    rows.iter()
        .map(|row| {
            let mut story = row_to_story_sqlite(row)?;
            story.categories = categories.remove(&story.id).unwrap_or_default();
            let author = AuthorSummary {
                id: story.author_id,
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                username: row.try_get("username")?,
            };
            Ok(StoryWithAuthor { story, author })
        })
        .collect()
}

async fn update_story_sqlite(
    pool: &SqlitePool,
    id: i64,
    record: &StoryRecord,
) -> Result<Story, DbError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE stories
        SET title = ?, content = ?, author_id = ?, is_private = ?, created_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&record.title)
    .bind(&record.content)
    .bind(record.author_id)
    .bind(record.is_private)
    .bind(record.created_at)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    sqlx::query("DELETE FROM story_categories WHERE story_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_links_sqlite(&mut tx, id, &record.category_ids).await?;

    let story = fetch_story_sqlite(&mut *tx, id).await?.ok_or_else(|| not_found(id))?;

    tx.commit().await?;
    Ok(story)
}

async fn delete_story_sqlite(pool: &SqlitePool, id: i64) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM story_categories WHERE story_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM stories WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

async fn count_stories_sqlite(pool: &SqlitePool) -> Result<i64, DbError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM stories")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("count")?)
}

async fn insert_links_sqlite(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    story_id: i64,
    category_ids: &[i64],
) -> Result<(), DbError> {
    for category_id in distinct_ids(category_ids) {
        sqlx::query("INSERT INTO story_categories (story_id, category_id) VALUES (?, ?)")
            .bind(story_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn fetch_story_sqlite(
    conn: &mut sqlx::SqliteConnection,
    id: i64,
) -> Result<Option<Story>, DbError> {
    let row = sqlx::query(
        r#"
        SELECT id, title, content, author_id, is_private, created_at, updated_at
        FROM stories
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut story = row_to_story_sqlite(&row)?;

    let category_rows = sqlx::query(STORY_CATEGORIES_SQL)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    story.categories = category_rows
        .iter()
        .map(row_to_category_sqlite)
        .collect::<Result<_, _>>()?;

    Ok(Some(story))
}

fn row_to_story_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Story, DbError> {
    Ok(Story {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        is_private: row.try_get("is_private")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        categories: Vec::new(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_story_mysql(pool: &MySqlPool, record: &StoryRecord) -> Result<Story, DbError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO stories (title, content, author_id, is_private, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.title)
    .bind(&record.content)
    .bind(record.author_id)
    .bind(record.is_private)
    .bind(record.created_at)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let id = result.last_insert_id() as i64;

    insert_links_mysql(&mut tx, id, &record.category_ids).await?;
    let story = fetch_story_mysql(&mut *tx, id).await?.ok_or_else(|| not_found(id))?;

    tx.commit().await?;
    Ok(story)
}

async fn get_story_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Story>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_story_mysql(&mut *conn, id).await
}

async fn list_stories_mysql(pool: &MySqlPool) -> Result<Vec<StoryWithAuthor>, DbError> {
    let rows = sqlx::query(LIST_SQL).fetch_all(pool).await?;
    let link_rows = sqlx::query(LIST_LINKS_SQL).fetch_all(pool).await?;

    let mut categories: HashMap<i64, Vec<Category>> = HashMap::new();
    for row in &link_rows {
        let story_id: i64 = row.try_get("story_id")?;
        categories
            .entry(story_id)
            .or_default()
            .push(row_to_category_mysql(row)?);
    }

    rows.iter()
        .map(|row| {
            let mut story = row_to_story_mysql(row)?;
            story.categories = categories.remove(&story.id).unwrap_or_default();
            let author = AuthorSummary {
                id: story.author_id,
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                username: row.try_get("username")?,
            };
            Ok(StoryWithAuthor { story, author })
        })
        .collect()
}

// rows_affected counts changed rows on MySQL, so existence is checked with
// a locking read first.
async fn update_story_mysql(
    pool: &MySqlPool,
    id: i64,
    record: &StoryRecord,
) -> Result<Story, DbError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let exists = sqlx::query("SELECT id FROM stories WHERE id = ? FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !exists {
        return Err(not_found(id));
    }

    sqlx::query(
        r#"
        UPDATE stories
        SET title = ?, content = ?, author_id = ?, is_private = ?, created_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&record.title)
    .bind(&record.content)
    .bind(record.author_id)
    .bind(record.is_private)
    .bind(record.created_at)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM story_categories WHERE story_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_links_mysql(&mut tx, id, &record.category_ids).await?;

    let story = fetch_story_mysql(&mut *tx, id).await?.ok_or_else(|| not_found(id))?;

    tx.commit().await?;
    Ok(story)
}

async fn delete_story_mysql(pool: &MySqlPool, id: i64) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM story_categories WHERE story_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM stories WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

async fn count_stories_mysql(pool: &MySqlPool) -> Result<i64, DbError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM stories")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("count")?)
}

async fn insert_links_mysql(
    tx: &mut sqlx::Transaction<'_, MySql>,
    story_id: i64,
    category_ids: &[i64],
) -> Result<(), DbError> {
    for category_id in distinct_ids(category_ids) {
        sqlx::query("INSERT INTO story_categories (story_id, category_id) VALUES (?, ?)")
            .bind(story_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn fetch_story_mysql(
    conn: &mut sqlx::MySqlConnection,
    id: i64,
) -> Result<Option<Story>, DbError> {
    let row = sqlx::query(
        r#"
        SELECT id, title, content, author_id, is_private, created_at, updated_at
        FROM stories
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut story = row_to_story_mysql(&row)?;

    let category_rows = sqlx::query(STORY_CATEGORIES_SQL)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    story.categories = category_rows
        .iter()
        .map(row_to_category_mysql)
        .collect::<Result<_, _>>()?;

    Ok(Some(story))
}

fn row_to_story_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Story, DbError> {
    Ok(Story {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        is_private: row.try_get("is_private")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        categories: Vec::new(),
    })
}
