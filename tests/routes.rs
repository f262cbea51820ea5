//! End-to-end page tests against an in-memory database

use axum::http::StatusCode;
use axum_test::TestServer;

use newsdesk::api::{build_router, AppState};
use newsdesk::db::{create_test_pool, migrations};
use newsdesk::models::{Scope, StoryInput, UserInput};
use newsdesk::templates::TemplateEngine;

async fn setup() -> (TestServer, AppState) {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let templates = TemplateEngine::new("Test Gazette", None).expect("Failed to load templates");
    let state = AppState::new(pool, templates);
    let server = TestServer::new(build_router(state.clone())).expect("Failed to start server");

    (server, state)
}

async fn seed_author(state: &AppState, username: &str) -> i64 {
    state
        .user_service
        .create_user(UserInput {
            first_name: "Martha".to_string(),
            last_name: "Gellhorn".to_string(),
            username: username.to_string(),
            password: Some("dispatch".to_string()),
        })
        .await
        .expect("Failed to seed author")
        .id
}

async fn category_id(state: &AppState, name: &str) -> i64 {
    state
        .story_service
        .form_choices()
        .await
        .unwrap()
        .categories
        .into_iter()
        .find(|c| c.label == name)
        .map(|c| c.value)
        .expect("seeded category")
}

async fn seed_story(state: &AppState, author_id: i64, category_ids: Vec<i64>) -> i64 {
    state
        .story_service
        .create_story(StoryInput {
            title: "Seeded".to_string(),
            content: "Seeded content".to_string(),
            author_id,
            category_ids,
            scope: Some(Scope::Public),
            created_at: None,
        })
        .await
        .expect("Failed to seed story")
        .id
}

fn assert_redirects_to_index(response: &axum_test::TestResponse) {
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/index");
}

// ============================================================================
// Listing and fallback
// ============================================================================

#[tokio::test]
async fn index_lists_nothing_initially() {
    let (server, _state) = setup().await;

    for path in ["/", "/index"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let html = response.text();
        assert!(html.contains("Test Gazette"));
        assert!(html.contains("No stories yet"));
    }
}

#[tokio::test]
async fn unknown_route_renders_not_found_page() {
    let (server, _state) = setup().await;

    let response = server.get("/no/such/page").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().contains("Page not found"));
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn add_user_page_shows_empty_form() {
    let (server, _state) = setup().await;

    let response = server.get("/add-user").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains(r#"name="first_name""#));
    assert!(html.contains(r#"name="confirm_password""#));
}

#[tokio::test]
async fn add_user_with_mismatched_passwords_is_not_persisted() {
    let (server, state) = setup().await;

    let response = server
        .post("/add-user")
        .form(&[
            ("first_name", "Ida"),
            ("last_name", "Wells"),
            ("username", "ida"),
            ("password", "lynching-report"),
            ("confirm_password", "something-else"),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text();
    assert!(html.contains("Passwords do not match."));
    assert!(html.contains(r#"value="Ida""#));
    assert!(state.user_service.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_user_creates_user_and_redirects() {
    let (server, state) = setup().await;

    let response = server
        .post("/add-user")
        .form(&[
            ("first_name", "Ida"),
            ("last_name", "Wells"),
            ("username", "ida"),
            ("password", "lynching-report"),
            ("confirm_password", "lynching-report"),
        ])
        .await;

    assert_redirects_to_index(&response);
    let users = state.user_service.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "ida");
    assert!(users[0].password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn add_user_with_taken_username_is_rejected() {
    let (server, state) = setup().await;
    seed_author(&state, "martha").await;

    let response = server
        .post("/add-user")
        .form(&[
            ("first_name", "Other"),
            ("last_name", "Person"),
            ("username", "martha"),
            ("password", "secret123"),
            ("confirm_password", "secret123"),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().contains("This username is already taken."));
    assert_eq!(state.user_service.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn edit_user_page_prefills_without_password() {
    let (server, state) = setup().await;
    let id = seed_author(&state, "martha").await;

    let response = server.get(&format!("/edit-user/{}", id)).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains(r#"value="Martha""#));
    assert!(html.contains(r#"value="martha""#));
    assert!(!html.contains("dispatch"));
    assert!(!html.contains("$argon2"));
}

#[tokio::test]
async fn edit_user_updates_and_redirects() {
    let (server, state) = setup().await;
    let id = seed_author(&state, "martha").await;

    let response = server
        .post(&format!("/edit-user/{}", id))
        .form(&[
            ("first_name", "Martha Ellis"),
            ("last_name", "Gellhorn"),
            ("username", "mgellhorn"),
            ("password", ""),
            ("confirm_password", ""),
        ])
        .await;

    assert_redirects_to_index(&response);
    let user = state.user_service.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.first_name, "Martha Ellis");
    assert_eq!(user.username, "mgellhorn");
}

#[tokio::test]
async fn edit_user_to_taken_username_is_rejected() {
    let (server, state) = setup().await;
    seed_author(&state, "martha").await;
    let second = seed_author(&state, "ernest").await;

    let response = server
        .post(&format!("/edit-user/{}", second))
        .form(&[
            ("first_name", "Ernest"),
            ("last_name", "Hemingway"),
            ("username", "martha"),
            ("password", ""),
            ("confirm_password", ""),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text();
    assert!(html.contains("This username is already taken."));
    assert!(html.contains(&format!(r#"action="/edit-user/{}""#, second)));

    let user = state.user_service.get_user(second).await.unwrap().unwrap();
    assert_eq!(user.username, "ernest");
    assert_eq!(user.first_name, "Martha");
}

#[tokio::test]
async fn edit_missing_user_is_not_found() {
    let (server, state) = setup().await;

    let response = server.get("/edit-user/999").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().contains("User with id 999 does not exist."));

    let response = server
        .post("/edit-user/999")
        .form(&[
            ("first_name", "Ghost"),
            ("last_name", "Writer"),
            ("username", "ghost"),
        ])
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(state.user_service.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_integer_ids_are_not_found() {
    let (server, _state) = setup().await;

    for path in ["/edit-user/abc", "/edit-story/1x", "/delete-story/-1"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", path);
        assert!(response.text().contains("Page not found"));
    }
}

// ============================================================================
// Stories
// ============================================================================

#[tokio::test]
async fn add_story_page_offers_authors_and_topics() {
    let (server, state) = setup().await;
    seed_author(&state, "martha").await;

    let response = server.get("/add-story").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Martha Gellhorn (martha)"));
    assert!(html.contains("Politics"));
    assert!(html.contains(r#"name="creation_date""#));
}

#[tokio::test]
async fn added_public_story_appears_on_index() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;
    let science = category_id(&state, "Science").await;

    let response = server
        .post("/add-story")
        .form(&[
            ("story_title", "T".to_string()),
            ("story_content", "C".to_string()),
            ("story_author", author_id.to_string()),
            ("story_topics", science.to_string()),
            ("scope", "public".to_string()),
            ("responsibility", "y".to_string()),
        ])
        .await;
    assert_redirects_to_index(&response);

    let html = server.get("/").await.text();
    assert!(html.contains("<h2>T</h2>"));
    assert!(html.contains(r#"<span class="scope scope-public">public</span>"#));
    assert!(html.contains(r#"<span class="category">Science</span>"#));
    assert!(html.contains("Martha Gellhorn (martha)"));
}

#[tokio::test]
async fn story_without_scope_is_private() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;

    let response = server
        .post("/add-story")
        .form(&[
            ("story_title", "Quiet".to_string()),
            ("story_content", "Unlisted".to_string()),
            ("story_author", author_id.to_string()),
            ("responsibility", "y".to_string()),
        ])
        .await;
    assert_redirects_to_index(&response);

    let stories = state.story_service.list_stories().await.unwrap();
    assert_eq!(stories.len(), 1);
    assert!(stories[0].story.is_private);
}

#[tokio::test]
async fn invalid_story_is_rerendered_and_not_saved() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;

    let response = server
        .post("/add-story")
        .form(&[
            ("story_title", "Unsigned".to_string()),
            ("story_content", "No responsibility taken".to_string()),
            ("story_author", author_id.to_string()),
            ("scope", "classified".to_string()),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = response.text();
    assert!(html.contains("Not a valid choice"));
    assert!(html.contains("You must take responsibility for this story."));
    assert!(html.contains(r#"value="Unsigned""#));
    assert!(state.story_service.list_stories().await.unwrap().is_empty());
}

#[tokio::test]
async fn story_dated_outside_storable_years_is_rejected() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;

    for date in ["0001-01-01 00:00:00", "+10000-01-01 00:00:00"] {
        let response = server
            .post("/add-story")
            .form(&[
                ("story_title", "Ancient".to_string()),
                ("story_content", "Before the press".to_string()),
                ("story_author", author_id.to_string()),
                ("creation_date", date.to_string()),
                ("responsibility", "y".to_string()),
            ])
            .await;

        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY, "{}", date);
        assert!(response.text().contains("Not a valid datetime value."));
    }
    assert!(state.story_service.list_stories().await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_story_page_prefills_story() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;
    let world = category_id(&state, "World").await;
    let story_id = seed_story(&state, author_id, vec![world]).await;

    let response = server.get(&format!("/edit-story/{}", story_id)).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains(r#"value="Seeded""#));
    assert!(html.contains(r#"value="public" checked"#));
    assert!(html.contains(&format!(r#"value="{}" checked"#, world)));
    assert!(html.contains(r#"name="responsibility" value="y" checked"#));
}

#[tokio::test]
async fn edit_story_with_no_topics_clears_categories() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;
    let world = category_id(&state, "World").await;
    let sport = category_id(&state, "Sport").await;
    let story_id = seed_story(&state, author_id, vec![world, sport]).await;

    let response = server
        .post(&format!("/edit-story/{}", story_id))
        .form(&[
            ("story_title", "Rewritten".to_string()),
            ("story_content", "New body".to_string()),
            ("story_author", author_id.to_string()),
            ("responsibility", "y".to_string()),
        ])
        .await;
    assert_redirects_to_index(&response);

    let story = state.story_service.get_story(story_id).await.unwrap().unwrap();
    assert_eq!(story.title, "Rewritten");
    assert!(story.categories.is_empty());
    assert!(!story.is_private, "omitted scope keeps the story public");
}

#[tokio::test]
async fn edit_missing_story_never_mutates() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;
    let story_id = seed_story(&state, author_id, vec![]).await;

    let response = server
        .post("/edit-story/4242")
        .form(&[
            ("story_title", "Hijack".to_string()),
            ("story_content", "Should not land".to_string()),
            ("story_author", author_id.to_string()),
            ("responsibility", "y".to_string()),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().contains("Story with id 4242 does not exist."));

    let stories = state.story_service.list_stories().await.unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].story.id, story_id);
    assert_eq!(stories[0].story.title, "Seeded");
}

#[tokio::test]
async fn delete_story_then_it_is_gone() {
    let (server, state) = setup().await;
    let author_id = seed_author(&state, "martha").await;
    let story_id = seed_story(&state, author_id, vec![category_id(&state, "Culture").await]).await;

    let response = server.get(&format!("/delete-story/{}", story_id)).await;
    assert_redirects_to_index(&response);

    assert!(state.story_service.get_story(story_id).await.unwrap().is_none());

    let response = server.get(&format!("/edit-story/{}", story_id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get(&format!("/delete-story/{}", story_id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
