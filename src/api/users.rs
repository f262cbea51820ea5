//! User pages: `/add-user` and `/edit-user/{id}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tera::Context as TeraContext;

use super::error::PageError;
use super::state::{parse_id, AppState};
use crate::forms::{FormData, UserForm};
use crate::services::UserServiceError;
use crate::templates::{ADD_USER_PAGE, EDIT_USER_PAGE};

fn user_form_context(form: &UserForm, user_id: Option<i64>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("f", form);
    if let Some(id) = user_id {
        context.insert("user_id", &id);
    }
    context
}

fn missing_user(state: &AppState, id: i64) -> Response {
    state.not_found(Some(&format!("User with id {} does not exist.", id)))
}

/// GET /add-user
pub async fn add_user_page(State(state): State<AppState>) -> Result<Response, PageError> {
    state.render(
        ADD_USER_PAGE,
        &user_form_context(&UserForm::default(), None),
        StatusCode::OK,
    )
}

/// POST /add-user
pub async fn add_user(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let mut form = UserForm::from_form(&FormData::new(pairs));

    let Some(input) = form.validate_create() else {
        return state.render(
            ADD_USER_PAGE,
            &user_form_context(&form, None),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    };

    match state.user_service.create_user(input).await {
        Ok(_) => Ok(Redirect::to("/index").into_response()),
        Err(UserServiceError::UsernameTaken(_)) => {
            form.reject_username();
            state.render(
                ADD_USER_PAGE,
                &user_form_context(&form, None),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /edit-user/{id}
pub async fn edit_user_page(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, PageError> {
    let Some(id) = parse_id(&raw_id) else {
        return Ok(state.not_found(None));
    };
    let Some(user) = state.user_service.get_user(id).await? else {
        return Ok(missing_user(&state, id));
    };

    state.render(
        EDIT_USER_PAGE,
        &user_form_context(&UserForm::from_user(&user), Some(id)),
        StatusCode::OK,
    )
}

/// POST /edit-user/{id}
pub async fn edit_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let Some(id) = parse_id(&raw_id) else {
        return Ok(state.not_found(None));
    };
    if state.user_service.get_user(id).await?.is_none() {
        return Ok(missing_user(&state, id));
    }

    let mut form = UserForm::from_form(&FormData::new(pairs));
    let Some(input) = form.validate_edit() else {
        return state.render(
            EDIT_USER_PAGE,
            &user_form_context(&form, Some(id)),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    };

    match state.user_service.update_user(id, input).await {
        Ok(_) => Ok(Redirect::to("/index").into_response()),
        Err(UserServiceError::UsernameTaken(_)) => {
            form.reject_username();
            state.render(
                EDIT_USER_PAGE,
                &user_form_context(&form, Some(id)),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
        Err(UserServiceError::NotFound(_)) => Ok(missing_user(&state, id)),
        Err(e) => Err(e.into()),
    }
}
