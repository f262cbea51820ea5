//! Data models
//!
//! Persisted entities (User, Story, Category) and the input types that carry
//! validated form data into the services.

mod category;
mod story;
mod user;

pub use category::Category;
pub use story::{AuthorSummary, Scope, Story, StoryInput, StoryRecord, StoryWithAuthor};
pub use user::{format_author_label, User, UserInput};
