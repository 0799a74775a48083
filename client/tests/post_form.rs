//! Post form submission running inside a `Store`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use quill_client::error::FieldErrors;
use quill_client::mocks::{MockPostsApi, PostsCall, PostsOperation};
use quill_client::views::post_form::{fields, REQUIRED_MESSAGE};
use quill_client::views::{FormMode, PostFormAction, PostFormEnvironment, PostFormReducer, PostFormState};
use quill_client::{ApiError, PostDraft, PostId};
use quill_runtime::Store;
use std::sync::Arc;
use std::time::Duration;

type FormStore = Store<PostFormState, PostFormAction, PostFormEnvironment<MockPostsApi>, PostFormReducer<MockPostsApi>>;

fn form_store(api: &MockPostsApi, state: PostFormState) -> FormStore {
    Store::new(
        state,
        PostFormReducer::new(),
        PostFormEnvironment::new(Arc::new(api.clone())),
    )
}

async fn type_into(store: &FormStore, title: &str, content: &str) {
    store
        .send(PostFormAction::TitleChanged(title.to_string()))
        .await
        .unwrap();
    store
        .send(PostFormAction::ContentChanged(content.to_string()))
        .await
        .unwrap();
}

async fn submit(store: &FormStore) -> PostFormState {
    let mut handle = store.send(PostFormAction::Submit).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();
    store.state(|s| s.clone()).await
}

#[tokio::test]
async fn test_blank_input_never_reaches_the_server() {
    let api = MockPostsApi::new();
    let store = form_store(&api, PostFormState::create());

    type_into(&store, "   ", "body").await;
    let state = submit(&store).await;

    assert_eq!(state.error.as_deref(), Some(REQUIRED_MESSAGE));
    assert!(!state.is_submitting);
    assert_eq!(state.title, "   ");
    assert_eq!(api.call_count(PostsOperation::CreatePost), 0);
}

#[tokio::test]
async fn test_create_sends_trimmed_fields_and_clears_form() {
    let api = MockPostsApi::new();
    let store = form_store(&api, PostFormState::create());

    type_into(&store, "  Hello  ", "\n world \n").await;
    let state = submit(&store).await;

    assert!(state.saved);
    assert!(state.title.is_empty() && state.content.is_empty());
    assert_eq!(state.saved_post.as_ref().map(|p| p.title.as_str()), Some("Hello"));
    assert_eq!(
        api.calls(),
        vec![PostsCall::CreatePost(PostDraft::trimmed("Hello", "world"))]
    );
}

#[tokio::test]
async fn test_field_errors_kept_apart_and_input_preserved() {
    let api = MockPostsApi::new();
    let mut errors = FieldErrors::new();
    errors.insert(fields::TITLE.to_string(), "too short".to_string());
    api.fail_next(
        PostsOperation::CreatePost,
        ApiError::Validation {
            message: "too short".to_string(),
            fields: errors,
        },
    );
    let store = form_store(&api, PostFormState::create());

    type_into(&store, "Hi", "body").await;
    let state = submit(&store).await;

    assert_eq!(state.field_error(fields::TITLE), Some("too short"));
    assert_eq!(state.field_error(fields::CONTENT), None);
    assert_eq!(state.error, None);
    assert!(!state.saved);
    assert_eq!((state.title.as_str(), state.content.as_str()), ("Hi", "body"));

    store
        .send(PostFormAction::TitleChanged("Hi there".to_string()))
        .await
        .unwrap();
    let state = store.state(|s| s.clone()).await;
    assert_eq!(state.field_error(fields::TITLE), None);

    let state = submit(&store).await;
    assert!(state.saved);
    assert_eq!(api.call_count(PostsOperation::CreatePost), 2);
}

#[tokio::test]
async fn test_general_failure_keeps_input() {
    let api = MockPostsApi::new();
    api.fail_next(
        PostsOperation::CreatePost,
        ApiError::transport("Network error - unable to connect to server", false),
    );
    let store = form_store(&api, PostFormState::create());

    type_into(&store, "Title", "Body").await;
    let state = submit(&store).await;

    assert_eq!(
        state.error.as_deref(),
        Some("Network error - unable to connect to server")
    );
    assert!(state.field_errors.is_empty());
    assert_eq!((state.title.as_str(), state.content.as_str()), ("Title", "Body"));
}

#[tokio::test]
async fn test_edit_loads_then_updates_in_place() {
    let api = MockPostsApi::new();
    api.insert_mine(MockPostsApi::sample_posts(1, 2, "ada"));
    let store = form_store(&api, PostFormState::edit(PostId::from(2)));

    let mut load = store.send(PostFormAction::Load).await.unwrap();
    load.wait_with_timeout(Duration::from_secs(2)).await.unwrap();
    let loaded = store.state(|s| s.clone()).await;
    assert!(!loaded.is_loading);
    assert_eq!(loaded.title, MockPostsApi::sample_post(2, "ada").title);

    type_into(&store, "Renamed", "New body").await;
    let state = submit(&store).await;

    assert!(state.saved);
    assert_eq!(state.mode, FormMode::Edit(PostId::from(2)));
    assert_eq!(state.title, "Renamed");
    let stored = api.all_posts().into_iter().find(|p| p.id == PostId::from(2)).unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(api.call_count(PostsOperation::CreatePost), 0);
}

#[tokio::test]
async fn test_edit_of_missing_post_reports_error() {
    let api = MockPostsApi::new();
    let store = form_store(&api, PostFormState::edit(PostId::from(404)));

    let mut load = store.send(PostFormAction::Load).await.unwrap();
    load.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

    let state = store.state(|s| s.clone()).await;
    assert_eq!(state.error.as_deref(), Some("Post not found"));
    assert!(!state.is_loading);
}
