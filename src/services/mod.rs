//! Services layer
//!
//! Business rules between the forms and the repositories: password
//! hashing, username uniqueness, story visibility and dating defaults.

pub mod password;
pub mod story;
pub mod user;

pub use password::hash_password;
pub use story::{StoryService, StoryServiceError};
pub use user::{UserService, UserServiceError};
