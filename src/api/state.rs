//! Shared application state and page helpers

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context as TeraContext;

use super::error::PageError;
use crate::db::repositories::{SqlxCategoryRepository, SqlxStoryRepository, SqlxUserRepository};
use crate::db::DynDatabasePool;
use crate::services::{StoryService, UserService};
use crate::templates::{simple_error_page, TemplateEngine, PAGE_NOT_FOUND};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub story_service: Arc<StoryService>,
    pub templates: Arc<TemplateEngine>,
}

impl AppState {
    /// Wire repositories and services onto a migrated pool
    pub fn new(pool: DynDatabasePool, templates: TemplateEngine) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let story_repo = SqlxStoryRepository::boxed(pool);

        Self {
            user_service: Arc::new(UserService::new(user_repo.clone())),
            story_service: Arc::new(StoryService::new(story_repo, user_repo, category_repo)),
            templates: Arc::new(templates),
        }
    }

    /// Render a page with the given status
    pub fn render(
        &self,
        template: &str,
        context: &TeraContext,
        status: StatusCode,
    ) -> Result<Response, PageError> {
        let html = self.templates.render(template, context)?;
        Ok((status, Html(html)).into_response())
    }

    /// The 404 page, with an optional explanation
    pub fn not_found(&self, message: Option<&str>) -> Response {
        let mut context = TeraContext::new();
        if let Some(message) = message {
            context.insert("message", message);
        }

        match self.render(PAGE_NOT_FOUND, &context, StatusCode::NOT_FOUND) {
            Ok(response) => response,
            Err(_) => (
                StatusCode::NOT_FOUND,
                Html(simple_error_page(
                    "Page not found",
                    message.unwrap_or("The page you are looking for does not exist."),
                )),
            )
                .into_response(),
        }
    }
}

/// Parse an `{id}` path segment. Only plain non-negative integers match,
/// anything else is treated like an unknown route.
pub fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
