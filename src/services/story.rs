//! Story service
//!
//! Resolves validated form input against defaults or the stored story and
//! hands the result to the repository, which writes the story and its
//! category set in one transaction.

use crate::db::repositories::{CategoryRepository, StoryRepository, UserRepository};
use crate::db::DbError;
use crate::forms::{Choice, StoryFormChoices};
use crate::models::{Story, StoryInput, StoryRecord, StoryWithAuthor};
use chrono::Utc;
use std::sync::Arc;

/// Error types for story service operations
#[derive(Debug, thiserror::Error)]
pub enum StoryServiceError {
    /// No story with this id
    #[error("Story not found: {0}")]
    NotFound(i64),

    /// The write was rejected by a database constraint, typically because an
    /// author or category was removed after the form was rendered
    #[error("Conflicting change: {0}")]
    Conflict(String),

    /// The database could not be reached
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<DbError> for StoryServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation(msg) | DbError::Constraint(msg) => Self::Conflict(msg),
            DbError::NotFound { id, .. } => Self::NotFound(id),
            DbError::Unavailable(e) => Self::Unavailable(e.to_string()),
            DbError::Query(e) => Self::InternalError(anyhow::Error::new(e)),
        }
    }
}

/// Story service
pub struct StoryService {
    story_repo: Arc<dyn StoryRepository>,
    user_repo: Arc<dyn UserRepository>,
    category_repo: Arc<dyn CategoryRepository>,
}

impl StoryService {
    /// Create a new story service
    pub fn new(
        story_repo: Arc<dyn StoryRepository>,
        user_repo: Arc<dyn UserRepository>,
        category_repo: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            story_repo,
            user_repo,
            category_repo,
        }
    }

    /// Every story with its author and categories, newest first
    pub async fn list_stories(&self) -> Result<Vec<StoryWithAuthor>, StoryServiceError> {
        Ok(self.story_repo.list().await?)
    }

    /// Get a story by id; a missing story is `Ok(None)`
    pub async fn get_story(&self, id: i64) -> Result<Option<Story>, StoryServiceError> {
        Ok(self.story_repo.get_by_id(id).await?)
    }

    /// Author and category choices for the story form, read fresh on every
    /// call so new users show up immediately.
    pub async fn form_choices(&self) -> Result<StoryFormChoices, StoryServiceError> {
        let authors = self
            .user_repo
            .list()
            .await?
            .into_iter()
            .map(|user| Choice::new(user.id, user.display_label()))
            .collect();
        let categories = self
            .category_repo
            .list()
            .await?
            .into_iter()
            .map(|category| Choice::new(category.id, category.name))
            .collect();

        Ok(StoryFormChoices {
            authors,
            categories,
        })
    }

    /// Create a story. It is private unless the input says `public`, and
    /// dated now unless a creation date was given.
    pub async fn create_story(&self, input: StoryInput) -> Result<Story, StoryServiceError> {
        let record = StoryRecord::for_new(input, Utc::now());
        let story = self.story_repo.create(&record).await?;

        tracing::info!(
            story_id = story.id,
            author_id = story.author_id,
            categories = story.categories.len(),
            "Story created"
        );
        Ok(story)
    }

    /// Replace a story's fields and category set. Omitted scope and creation
    /// date keep their stored values.
    pub async fn update_story(
        &self,
        id: i64,
        input: StoryInput,
    ) -> Result<Story, StoryServiceError> {
        let existing = self
            .story_repo
            .get_by_id(id)
            .await?
            .ok_or(StoryServiceError::NotFound(id))?;

        let record = StoryRecord::for_existing(input, &existing);
        let story = self.story_repo.update(id, &record).await?;

        tracing::info!(
            story_id = story.id,
            categories = story.categories.len(),
            "Story updated"
        );
        Ok(story)
    }

    /// Delete a story and its category links
    pub async fn delete_story(&self, id: i64) -> Result<(), StoryServiceError> {
        if !self.story_repo.delete(id).await? {
            return Err(StoryServiceError::NotFound(id));
        }

        tracing::info!(story_id = id, "Story deleted");
        Ok(())
    }
}
