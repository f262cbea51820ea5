//! Page errors
//!
//! Failures that end a request without a form to re-render. Each maps to a
//! status code and a small HTML page; database details go to the log only.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::services::{StoryServiceError, UserServiceError};
use crate::templates::{simple_error_page, TemplateError};

/// Error returned by page handlers
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The addressed entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// A database constraint rejected the change
    #[error("Conflicting change")]
    Conflict,

    /// The database could not be reached
    #[error("Service unavailable")]
    Unavailable,

    /// Anything else
    #[error("Internal error")]
    Internal,
}

impl PageError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Not found",
            Self::Conflict => "Conflict",
            Self::Unavailable => "Service unavailable",
            Self::Internal => "Something went wrong",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::NotFound(message) => message.clone(),
            Self::Conflict => CONFLICT_MESSAGE.to_string(),
            Self::Unavailable => "The database is unavailable right now. Please try again shortly."
                .to_string(),
            Self::Internal => "The request could not be completed.".to_string(),
        }
    }
}

/// Shown when a write is rejected because the data changed underneath it
pub const CONFLICT_MESSAGE: &str =
    "The change conflicts with the current data, for example an author or topic that no longer exists. Reload the form and try again.";

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let body = simple_error_page(self.title(), &self.message());
        (self.status(), Html(body)).into_response()
    }
}

impl From<UserServiceError> for PageError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound(id) => {
                Self::NotFound(format!("User with id {} does not exist.", id))
            }
            UserServiceError::UsernameTaken(_) | UserServiceError::Conflict(_) => {
                tracing::warn!("User write rejected: {}", err);
                Self::Conflict
            }
            UserServiceError::Unavailable(_) => {
                tracing::error!("{}", err);
                Self::Unavailable
            }
            UserServiceError::InternalError(ref e) => {
                tracing::error!("User service failed: {:#}", e);
                Self::Internal
            }
        }
    }
}

impl From<StoryServiceError> for PageError {
    fn from(err: StoryServiceError) -> Self {
        match err {
            StoryServiceError::NotFound(id) => {
                Self::NotFound(format!("Story with id {} does not exist.", id))
            }
            StoryServiceError::Conflict(_) => {
                tracing::warn!("Story write rejected: {}", err);
                Self::Conflict
            }
            StoryServiceError::Unavailable(_) => {
                tracing::error!("{}", err);
                Self::Unavailable
            }
            StoryServiceError::InternalError(ref e) => {
                tracing::error!("Story service failed: {:#}", e);
                Self::Internal
            }
        }
    }
}

impl From<TemplateError> for PageError {
    fn from(err: TemplateError) -> Self {
        tracing::error!("{}", err);
        Self::Internal
    }
}
