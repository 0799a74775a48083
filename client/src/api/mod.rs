//! Request pipeline and the provider traits the views depend on.
//!
//! Views talk to [`AuthApi`] and [`PostsApi`], never to HTTP directly.
//! [`ApiClient`] implements both against the real server; the `test-utils`
//! feature provides in-memory implementations.

pub mod client;
pub mod endpoints;

pub use client::ApiClient;
pub use endpoints::Endpoint;

use crate::error::Result;
use crate::models::{Credentials, PageRequest, Post, PostDraft, PostId, PostPage, Registration};
use std::future::Future;

/// Authentication operations.
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token and user.
    ///
    /// Bounded by the configured login timeout.
    ///
    /// # Errors
    ///
    /// [`crate::ApiError::Unauthorized`] for bad credentials, otherwise the
    /// normalized failure. A response without both user and token is a
    /// general error.
    fn login(
        &self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<Credentials>> + Send;

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Field-level rejections arrive as [`crate::ApiError::Validation`].
    fn register(
        &self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<Registration>> + Send;
}

/// Post operations.
pub trait PostsApi: Send + Sync {
    /// One page of all posts.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure.
    fn list_posts(&self, request: PageRequest) -> impl Future<Output = Result<PostPage>> + Send;

    /// One page of the signed-in user's posts.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure; an expired token also ends the session.
    fn my_posts(&self, request: PageRequest) -> impl Future<Output = Result<PostPage>> + Send;

    /// A single post.
    ///
    /// # Errors
    ///
    /// [`crate::ApiError::NotFound`] when the post does not exist.
    fn get_post(&self, id: PostId) -> impl Future<Output = Result<Post>> + Send;

    /// Create a post. Returns the created post when the server echoes it.
    ///
    /// # Errors
    ///
    /// Field-level rejections arrive as [`crate::ApiError::Validation`].
    fn create_post(&self, draft: PostDraft) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// Replace a post's title and content.
    ///
    /// # Errors
    ///
    /// As [`PostsApi::create_post`].
    fn update_post(
        &self,
        id: PostId,
        draft: PostDraft,
    ) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// Delete a post.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure.
    fn delete_post(&self, id: PostId) -> impl Future<Output = Result<()>> + Send;
}
