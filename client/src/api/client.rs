//! HTTP implementation of the request pipeline.

use super::endpoints::Endpoint;
use super::{AuthApi, PostsApi};
use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError, Result, CONNECTION_ERROR_MESSAGE};
use crate::models::{Credentials, PageRequest, Post, PostDraft, PostId, PostPage, Registration};
use crate::navigation::{Navigator, Route};
use crate::normalize::{normalize_credentials, normalize_post, normalize_post_list, normalize_registration};
use crate::session::SessionStore;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

/// Message for a 2xx response that is missing required data.
const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from server";

/// The single request/response policy point.
///
/// Attaches the session token to every request except login and register,
/// converts every failure into an [`ApiError`], and turns a 401 on an
/// authenticated request into a forced logout plus a redirect to
/// [`Route::Login`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: Arc<ClientConfig>,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(
        config: ClientConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let http = Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            config: Arc::new(config),
            session,
            navigator,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session handle shared with the views.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Whether the server answers at all.
    ///
    /// Sends `OPTIONS` to the login endpoint; any HTTP response counts.
    pub async fn ping(&self) -> bool {
        let url = self.config.url(&Endpoint::Login.path());
        match self
            .http
            .request(Method::OPTIONS, url)
            .timeout(self.config.login_timeout)
            .send()
            .await
        {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Backend reachable");
                true
            },
            Err(e) => {
                tracing::warn!(error = %e, "Backend unreachable");
                false
            },
        }
    }

    #[tracing::instrument(
        name = "api_request",
        skip(self, endpoint, query, body),
        fields(endpoint = endpoint.name(), method = %endpoint.method())
    )]
    async fn execute(
        &self,
        endpoint: Endpoint,
        query: &[(&str, u32)],
        body: Option<Value>,
    ) -> Result<Value> {
        metrics::counter!("api.requests.total", "endpoint" => endpoint.name()).increment(1);

        let result = self.dispatch(&endpoint, query, body).await;
        if let Err(error) = &result {
            metrics::counter!("api.errors.total", "kind" => error.kind().as_str()).increment(1);
            tracing::debug!(kind = error.kind().as_str(), %error, "Request failed");
        }
        result
    }

    async fn dispatch(
        &self,
        endpoint: &Endpoint,
        query: &[(&str, u32)],
        body: Option<Value>,
    ) -> Result<Value> {
        let mut request = self
            .http
            .request(endpoint.method(), self.config.url(&endpoint.path()));

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }
        if matches!(endpoint, Endpoint::Login) {
            request = request.timeout(self.config.login_timeout);
        }

        let attached_token = if endpoint.is_anonymous() {
            None
        } else {
            self.session.token()
        };
        if let Some(token) = &attached_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let payload = parse_body(&text);

        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "Request succeeded");
            return Ok(payload);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = &attached_token {
                self.handle_expired_session(token);
            }
        }

        Err(ApiError::from_response(
            status.as_u16(),
            &payload,
            endpoint.fallback_message(status.as_u16()),
        ))
    }

    fn transport_error(&self, error: &reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::transport(
                format!(
                    "Request timeout after {} seconds",
                    self.config.login_timeout.as_secs_f64()
                ),
                true,
            )
        } else {
            ApiError::transport(CONNECTION_ERROR_MESSAGE, false)
        }
    }

    /// The token was rejected: end the session once and redirect.
    fn handle_expired_session(&self, token: &str) {
        match self.session.expire(token) {
            Ok(true) => {
                metrics::counter!("session.forced_logout.total").increment(1);
                tracing::warn!("Session expired, redirecting to login");
                self.navigator.navigate(Route::Login);
            },
            Ok(false) => tracing::debug!("Session already ended for rejected token"),
            Err(e) => tracing::error!(error = %e, "Failed to clear expired session"),
        }
    }

    async fn fetch_page(&self, endpoint: Endpoint, request: PageRequest) -> Result<PostPage> {
        let body = self
            .execute(
                endpoint,
                &[("page", request.page), ("per_page", request.per_page)],
                None,
            )
            .await?;
        Ok(normalize_post_list(&body, request.per_page).into_page(request.per_page))
    }

    async fn save_post(&self, endpoint: Endpoint, draft: PostDraft) -> Result<Option<Post>> {
        let body = self
            .execute(
                endpoint,
                &[],
                Some(json!({"title": draft.title, "content": draft.content})),
            )
            .await?;
        Ok(normalize_post(&body))
    }
}

/// JSON when it parses, the raw text otherwise, `Null` when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

impl AuthApi for ApiClient {
    fn login(
        &self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<Credentials>> + Send {
        let client = self.clone();
        async move {
            let body = client
                .execute(
                    Endpoint::Login,
                    &[],
                    Some(json!({"username": username, "password": password})),
                )
                .await?;
            normalize_credentials(&body).ok_or_else(|| ApiError::general(INVALID_RESPONSE_MESSAGE))
        }
    }

    fn register(
        &self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<Registration>> + Send {
        let client = self.clone();
        async move {
            let body = client
                .execute(
                    Endpoint::Register,
                    &[],
                    Some(json!({"username": username, "password": password})),
                )
                .await?;
            Ok(normalize_registration(&body))
        }
    }
}

impl PostsApi for ApiClient {
    fn list_posts(&self, request: PageRequest) -> impl Future<Output = Result<PostPage>> + Send {
        let client = self.clone();
        async move { client.fetch_page(Endpoint::ListPosts, request).await }
    }

    fn my_posts(&self, request: PageRequest) -> impl Future<Output = Result<PostPage>> + Send {
        let client = self.clone();
        async move { client.fetch_page(Endpoint::MyPosts, request).await }
    }

    fn get_post(&self, id: PostId) -> impl Future<Output = Result<Post>> + Send {
        let client = self.clone();
        async move {
            let body = client.execute(Endpoint::GetPost(id), &[], None).await?;
            normalize_post(&body).ok_or_else(|| ApiError::general(INVALID_RESPONSE_MESSAGE))
        }
    }

    fn create_post(&self, draft: PostDraft) -> impl Future<Output = Result<Option<Post>>> + Send {
        let client = self.clone();
        async move { client.save_post(Endpoint::CreatePost, draft).await }
    }

    fn update_post(
        &self,
        id: PostId,
        draft: PostDraft,
    ) -> impl Future<Output = Result<Option<Post>>> + Send {
        let client = self.clone();
        async move { client.save_post(Endpoint::UpdatePost(id), draft).await }
    }

    fn delete_post(&self, id: PostId) -> impl Future<Output = Result<()>> + Send {
        let client = self.clone();
        async move {
            client.execute(Endpoint::DeletePost(id), &[], None).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_fallbacks() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  "), Value::Null);
        assert_eq!(parse_body(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(parse_body("Bad Gateway"), Value::String("Bad Gateway".into()));
    }
}
