//! HTTP layer
//!
//! Every page is a GET that displays and, for forms, a POST that submits.
//! A successful submit redirects to `/index` with 303; a submit that fails
//! validation re-renders the form with 422.

pub mod error;
pub mod state;
pub mod stories;
pub mod users;

use axum::{extract::State, response::Response, routing::get, Router};
use tower_http::trace::TraceLayer;

pub use error::PageError;
pub use state::AppState;

/// Build the site router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(stories::list_stories))
        .route("/index", get(stories::list_stories))
        .route("/add-user", get(users::add_user_page).post(users::add_user))
        .route("/edit-user/{id}", get(users::edit_user_page).post(users::edit_user))
        .route("/add-story", get(stories::add_story_page).post(stories::add_story))
        .route(
            "/edit-story/{id}",
            get(stories::edit_story_page).post(stories::edit_story),
        )
        .route("/delete-story/{id}", get(stories::delete_story))
        .fallback(page_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn page_not_found(State(state): State<AppState>) -> Response {
    state.not_found(None)
}
