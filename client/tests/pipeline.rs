//! Request pipeline against a real HTTP server.
//!
//! Covers credential attachment, error normalization and the forced-logout
//! path on 401.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use quill_client::error::{ErrorKind, CONNECTION_ERROR_MESSAGE, SERVER_ERROR_MESSAGE};
use quill_client::mocks::RecordingNavigator;
use quill_client::storage::{keys, MemorySessionStorage};
use quill_client::{
    ApiClient, ApiError, AuthApi, ClientConfig, PageRequest, PostDraft, PostId, PostsApi, Route,
    SessionStore, UserIdentity,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    server: MockServer,
    client: ApiClient,
    session: SessionStore,
    storage: MemorySessionStorage,
    navigator: RecordingNavigator,
}

async fn harness() -> Harness {
    quill_testing::init_test_tracing();
    let server = MockServer::start().await;
    let storage = MemorySessionStorage::new();
    let session = SessionStore::init(Arc::new(storage.clone()));
    let navigator = RecordingNavigator::new();

    let config = ClientConfig::default()
        .with_base_url(format!("{}/api/", server.uri()))
        .with_login_timeout(Duration::from_millis(300));
    let client = ApiClient::new(config, session.clone(), Arc::new(navigator.clone())).unwrap();

    Harness {
        server,
        client,
        session,
        storage,
        navigator,
    }
}

fn post_json(id: u64) -> serde_json::Value {
    json!({"id": id, "title": format!("t{id}"), "content": "c", "author": {"username": "ada"}})
}

fn authorization_headers(requests: &[wiremock::Request]) -> Vec<Option<String>> {
    requests
        .iter()
        .map(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}

// ============================================================================
// Credential attachment
// ============================================================================

#[tokio::test]
async fn test_bearer_attached_when_signed_in() {
    let h = harness().await;
    h.session.set_session(UserIdentity::named("ada"), "tok-1").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/posts/my-posts/"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json(1)])))
        .expect(1)
        .mount(&h.server)
        .await;

    let page = h.client.my_posts(PageRequest::new(1, 10)).await.unwrap();
    assert_eq!(page.posts.len(), 1);
}

#[tokio::test]
async fn test_anonymous_request_has_no_credential_header() {
    let h = harness().await;

    Mock::given(method("GET"))
        .and(path("/api/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&h.server)
        .await;

    h.client.list_posts(PageRequest::new(1, 10)).await.unwrap();

    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(authorization_headers(&requests), vec![None]);
}

#[tokio::test]
async fn test_login_is_sent_anonymously() {
    let h = harness().await;
    h.session.set_session(UserIdentity::named("old"), "stale").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "fresh", "user": {"id": 2, "username": "ada"}})),
        )
        .mount(&h.server)
        .await;

    let credentials = h.client.login("ada".into(), "pw".into()).await.unwrap();
    assert_eq!(credentials.token, "fresh");

    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(authorization_headers(&requests), vec![None]);
}

// ============================================================================
// Forced logout
// ============================================================================

#[tokio::test]
async fn test_401_on_authenticated_request_logs_out_once() {
    let h = harness().await;
    h.session.set_session(UserIdentity::named("ada"), "expired").unwrap();
    let mut feed = h.session.changes();

    Mock::given(method("GET"))
        .and(path("/api/posts/my-posts/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .mount(&h.server)
        .await;

    let request = PageRequest::new(1, 10);
    let (first, second) = tokio::join!(h.client.my_posts(request), h.client.my_posts(request));

    for result in [first, second] {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Auth);
    }
    assert!(!h.session.is_authenticated());
    assert!(h.storage.get_token().is_none());
    assert_eq!(h.navigator.routes(), vec![Route::Login]);

    let change = feed.try_recv().unwrap();
    assert_eq!(change.reason, quill_client::ChangeReason::Expired);
    assert!(feed.try_recv().is_err());
}

#[tokio::test]
async fn test_401_on_login_never_logs_out() {
    let h = harness().await;
    h.session.set_session(UserIdentity::named("ada"), "keep").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let error = h.client.login("ada".into(), "bad".into()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Auth);
    assert_eq!(error.message(), "Invalid username or password");
    assert_eq!(h.session.token().as_deref(), Some("keep"));
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_401_for_superseded_token_keeps_new_session() {
    let h = harness().await;
    h.session.set_session(UserIdentity::named("ada"), "old").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/posts/my-posts/"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(100)))
        .mount(&h.server)
        .await;

    let pending = h.client.my_posts(PageRequest::new(1, 10));
    let relogin = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.session.set_session(UserIdentity::named("ada"), "new").unwrap();
    };
    let (result, ()) = tokio::join!(pending, relogin);

    assert!(result.is_err());
    assert_eq!(h.session.token().as_deref(), Some("new"));
    assert!(h.navigator.routes().is_empty());
}

// ============================================================================
// Error normalization
// ============================================================================

#[tokio::test]
async fn test_validation_errors_on_create() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/posts/create/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"type": "validation", "errors": {"title": "too short"}})),
        )
        .mount(&h.server)
        .await;

    let error = h
        .client
        .create_post(PostDraft::trimmed("Hi", "body"))
        .await
        .unwrap_err();
    let fields = error.field_errors().expect("validation carries fields");
    assert_eq!(fields.get("title").map(String::as_str), Some("too short"));
    assert!(!fields.contains_key("content"));
}

#[tokio::test]
async fn test_django_style_register_errors() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"username": ["A user with that username already exists."]})),
        )
        .mount(&h.server)
        .await;

    let error = h.client.register("ada".into(), "pw".into()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(error.message(), "A user with that username already exists.");
}

#[tokio::test]
async fn test_server_error_is_retryable_and_keeps_session() {
    let h = harness().await;
    h.session.set_session(UserIdentity::named("ada"), "tok").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/posts/my-posts/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&h.server)
        .await;

    let error = h.client.my_posts(PageRequest::new(1, 10)).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Server);
    assert!(error.is_retryable());
    assert_eq!(error.message(), "Bad Gateway");
    assert!(h.session.is_authenticated());

    Mock::given(method("GET"))
        .and(path("/api/posts/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    let error = h.client.list_posts(PageRequest::new(1, 10)).await.unwrap_err();
    assert_eq!(error.message(), SERVER_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_missing_post_is_not_found() {
    let h = harness().await;

    Mock::given(method("GET"))
        .and(path("/api/posts/42/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.server)
        .await;

    let error = h.client.get_post(PostId::from(42)).await.unwrap_err();
    assert_eq!(
        error,
        ApiError::NotFound {
            message: "Post not found".into()
        }
    );
}

#[tokio::test]
async fn test_login_times_out_distinctly() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&h.server)
        .await;

    let error = h.client.login("ada".into(), "pw".into()).await.unwrap_err();
    assert!(matches!(error, ApiError::Transport { timed_out: true, .. }));
    assert!(error.message().starts_with("Request timeout after"));
}

#[tokio::test]
async fn test_unreachable_server() {
    let session = SessionStore::init(Arc::new(MemorySessionStorage::new()));
    let config = ClientConfig::default().with_base_url("http://127.0.0.1:9/api");
    let client = ApiClient::new(config, session, Arc::new(RecordingNavigator::new())).unwrap();

    let error = client.list_posts(PageRequest::new(1, 10)).await.unwrap_err();
    assert_eq!(error, ApiError::transport(CONNECTION_ERROR_MESSAGE, false));
    assert!(!client.ping().await);
}

// ============================================================================
// Responses
// ============================================================================

#[tokio::test]
async fn test_list_envelope_and_query() {
    let h = harness().await;

    Mock::given(method("GET"))
        .and(path("/api/posts/"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [post_json(11), post_json(12), post_json(13)],
            "pagination": {"page": 2, "pages": 3, "total": 25, "has_next": true, "has_previous": true}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let page = h.client.list_posts(PageRequest::new(2, 10)).await.unwrap();
    assert_eq!(page.posts.len(), 3);
    assert!(page.pagination.has_next && page.pagination.has_previous);
    assert_eq!(page.pagination.total, 25);
}

#[tokio::test]
async fn test_delete_and_ping() {
    let h = harness().await;
    h.session.set_session(UserIdentity::named("ada"), "tok").unwrap();

    Mock::given(method("DELETE"))
        .and(path("/api/posts/7/delete/"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("OPTIONS"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&h.server)
        .await;

    h.client.delete_post(PostId::from(7)).await.unwrap();
    assert!(h.client.ping().await);
}

/// Reading the persisted token straight from storage.
trait PersistedToken {
    fn get_token(&self) -> Option<String>;
}

impl PersistedToken for MemorySessionStorage {
    fn get_token(&self) -> Option<String> {
        self.snapshot().get(keys::TOKEN).cloned()
    }
}
