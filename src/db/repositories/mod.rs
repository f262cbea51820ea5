//! Database repositories
//!
//! One repository per entity. Each exposes a trait so services can be
//! handed any implementation, and an `Sqlx*Repository` covering SQLite and
//! MySQL.

pub mod category;
pub mod story;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use story::{SqlxStoryRepository, StoryRepository};
pub use user::{SqlxUserRepository, UserRepository};
