//! Template engine error types

use thiserror::Error;

/// Template loading and rendering errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template failed to parse or its inheritance chain is broken
    #[error("Invalid template {name}: {message}")]
    Invalid { name: String, message: String },

    /// Rendering failed; the message includes the full cause chain
    #[error("{0}")]
    Render(String),

    /// Override directory could not be read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
