//! Category model

use serde::{Deserialize, Serialize};

/// A topic a story can be filed under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
}

impl Category {
    /// Create a new, not yet persisted category.
    #[cfg(test)]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0, // Will be set by the database
            name: name.into(),
        }
    }
}
