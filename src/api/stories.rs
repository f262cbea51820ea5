//! Story pages: the listing, `/add-story`, `/edit-story/{id}` and
//! `/delete-story/{id}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use tera::Context as TeraContext;

use super::error::{PageError, CONFLICT_MESSAGE};
use super::state::{parse_id, AppState};
use crate::forms::{FormData, StoryForm};
use crate::services::StoryServiceError;
use crate::templates::{ADD_STORY_PAGE, ALL_NEWS_PAGE, EDIT_STORY_PAGE};

fn story_form_context(form: &StoryForm, story_id: Option<i64>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("f", form);
    if let Some(id) = story_id {
        context.insert("story_id", &id);
    }
    context
}

fn missing_story(state: &AppState, id: i64) -> Response {
    state.not_found(Some(&format!("Story with id {} does not exist.", id)))
}

/// Re-render the form after the database refused the write
fn conflict_page(
    state: &AppState,
    template: &str,
    form: &StoryForm,
    story_id: Option<i64>,
) -> Result<Response, PageError> {
    let mut context = story_form_context(form, story_id);
    context.insert("error", CONFLICT_MESSAGE);
    state.render(template, &context, StatusCode::CONFLICT)
}

/// GET / and /index
pub async fn list_stories(State(state): State<AppState>) -> Result<Response, PageError> {
    let stories = state.story_service.list_stories().await?;

    let mut context = TeraContext::new();
    context.insert("stories", &stories);
    state.render(ALL_NEWS_PAGE, &context, StatusCode::OK)
}

/// GET /add-story
pub async fn add_story_page(State(state): State<AppState>) -> Result<Response, PageError> {
    let choices = state.story_service.form_choices().await?;
    let form = StoryForm::new(choices, Utc::now());

    state.render(ADD_STORY_PAGE, &story_form_context(&form, None), StatusCode::OK)
}

/// POST /add-story
pub async fn add_story(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let choices = state.story_service.form_choices().await?;
    let mut form = StoryForm::from_form(&FormData::new(pairs), choices);

    let Some(input) = form.validate() else {
        return state.render(
            ADD_STORY_PAGE,
            &story_form_context(&form, None),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    };

    match state.story_service.create_story(input).await {
        Ok(_) => Ok(Redirect::to("/index").into_response()),
        Err(StoryServiceError::Conflict(msg)) => {
            tracing::warn!("Story not created: {}", msg);
            conflict_page(&state, ADD_STORY_PAGE, &form, None)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /edit-story/{id}
pub async fn edit_story_page(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, PageError> {
    let Some(id) = parse_id(&raw_id) else {
        return Ok(state.not_found(None));
    };
    let Some(story) = state.story_service.get_story(id).await? else {
        return Ok(missing_story(&state, id));
    };

    let choices = state.story_service.form_choices().await?;
    let form = StoryForm::from_story(&story, choices);

    state.render(EDIT_STORY_PAGE, &story_form_context(&form, Some(id)), StatusCode::OK)
}

/// POST /edit-story/{id}
pub async fn edit_story(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let Some(id) = parse_id(&raw_id) else {
        return Ok(state.not_found(None));
    };
    if state.story_service.get_story(id).await?.is_none() {
        return Ok(missing_story(&state, id));
    }

    let choices = state.story_service.form_choices().await?;
    let mut form = StoryForm::from_form(&FormData::new(pairs), choices);

    let Some(input) = form.validate() else {
        return state.render(
            EDIT_STORY_PAGE,
            &story_form_context(&form, Some(id)),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    };

    match state.story_service.update_story(id, input).await {
        Ok(_) => Ok(Redirect::to("/index").into_response()),
        Err(StoryServiceError::NotFound(_)) => Ok(missing_story(&state, id)),
        Err(StoryServiceError::Conflict(msg)) => {
            tracing::warn!(story_id = id, "Story not updated: {}", msg);
            conflict_page(&state, EDIT_STORY_PAGE, &form, Some(id))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /delete-story/{id}
pub async fn delete_story(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, PageError> {
    let Some(id) = parse_id(&raw_id) else {
        return Ok(state.not_found(None));
    };
    if state.story_service.get_story(id).await?.is_none() {
        return Ok(missing_story(&state, id));
    }

    match state.story_service.delete_story(id).await {
        Ok(()) => Ok(Redirect::to("/index").into_response()),
        Err(StoryServiceError::NotFound(_)) => Ok(missing_story(&state, id)),
        Err(e) => Err(e.into()),
    }
}
