//! Story model
//!
//! A story belongs to exactly one author and may be filed under any number
//! of categories. Visibility is a single `is_private` flag; the form talks
//! about it as a [`Scope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::Category;
use super::user::format_author_label;

/// A published or private story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    /// Unique identifier
    pub id: i64,
    /// Headline
    pub title: String,
    /// Body text
    pub content: String,
    /// Author (foreign key to users)
    pub author_id: i64,
    /// Hidden from readers when true
    pub is_private: bool,
    /// Creation date, editable from the story form
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Categories, ordered by name, without duplicates
    pub categories: Vec<Category>,
}

impl Story {
    /// Visibility as the form presents it
    pub fn scope(&self) -> Scope {
        if self.is_private {
            Scope::Private
        } else {
            Scope::Public
        }
    }

    /// Identifiers of the story's categories
    pub fn category_ids(&self) -> Vec<i64> {
        self.categories.iter().map(|c| c.id).collect()
    }
}

/// Story visibility as chosen on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Public,
    Private,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Public => "public",
            Scope::Private => "private",
        }
    }

    /// Parse the submitted radio value; anything else is not a valid choice.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Scope::Public),
            "private" => Some(Scope::Private),
            _ => None,
        }
    }

    /// Resolve the stored flag from an optional submitted scope.
    ///
    /// An omitted scope keeps `current`, which is `true` for new stories.
    pub fn resolve_private(scope: Option<Scope>, current: bool) -> bool {
        match scope {
            Some(Scope::Public) => false,
            Some(Scope::Private) => true,
            None => current,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal author data shown next to a story.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

impl AuthorSummary {
    pub fn display_label(&self) -> String {
        format_author_label(&self.first_name, &self.last_name, &self.username)
    }
}

/// A story joined with its author, as listed on the front page.
#[derive(Debug, Clone, Serialize)]
pub struct StoryWithAuthor {
    #[serde(flatten)]
    pub story: Story,
    pub author: AuthorSummary,
}

/// Validated story form data, before visibility and date are resolved
/// against defaults or the stored story.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryInput {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    /// Distinct category ids in submission order
    pub category_ids: Vec<i64>,
    pub scope: Option<Scope>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fully resolved story columns written by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryRecord {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    /// Replaces the whole category set on update
    pub category_ids: Vec<i64>,
}

impl StoryRecord {
    /// Resolve input for a brand-new story: private and "now" unless given.
    pub fn for_new(input: StoryInput, now: DateTime<Utc>) -> Self {
        Self {
            is_private: Scope::resolve_private(input.scope, true),
            created_at: input.created_at.unwrap_or(now),
            title: input.title,
            content: input.content,
            author_id: input.author_id,
            category_ids: input.category_ids,
        }
    }

    /// Resolve input against an existing story, keeping omitted values.
    pub fn for_existing(input: StoryInput, existing: &Story) -> Self {
        Self {
            is_private: Scope::resolve_private(input.scope, existing.is_private),
            created_at: input.created_at.unwrap_or(existing.created_at),
            title: input.title,
            content: input.content,
            author_id: input.author_id,
            category_ids: input.category_ids,
        }
    }
}
