//! # Quill Client
//!
//! Client-side session and data-sync layer for the Quill blog.
//!
//! ## Architecture
//!
//! ```text
//! SessionStore ──token──▶ ApiClient ──▶ PostList / PostForm / PostDetail / AuthForm
//!      ▲                     │
//!      └──── expire(token) ◀─┘  (401 on an authenticated request)
//! ```
//!
//! - [`SessionStore`]: the single owner of "who is logged in", persisted
//!   through a [`storage::SessionStorage`] backend and observable by any
//!   number of views
//! - [`ApiClient`]: attaches the bearer token, normalizes every failure into
//!   an [`ApiError`], and turns session expiry into a logout plus redirect
//! - [`views`]: reducers for each screen, run inside a
//!   [`quill_runtime::Store`]
//!
//! ## Example
//!
//! ```ignore
//! use quill_client::{ApiClient, ClientConfig, SessionStore};
//! use quill_client::storage::FileSessionStorage;
//! use quill_client::views::{PostListEnvironment, PostListReducer, PostListState};
//! use quill_runtime::Store;
//! use std::sync::Arc;
//!
//! let config = ClientConfig::from_env()?;
//! let session = SessionStore::init(Arc::new(FileSessionStorage::new(&config.storage_path)));
//! let api = Arc::new(ApiClient::new(config.clone(), session.clone(), navigator)?);
//!
//! let store = Store::new(
//!     PostListState::new(config.per_page),
//!     PostListReducer::new(),
//!     PostListEnvironment::new(api, config.per_page),
//! );
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod normalize;
pub mod session;
pub mod storage;
pub mod views;

#[cfg(feature = "test-utils")]
pub mod mocks;

pub use api::{ApiClient, AuthApi, PostsApi};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, ErrorKind, Result, StorageError};
pub use models::{Credentials, PageRequest, Pagination, Post, PostDraft, PostId, PostPage, UserIdentity};
pub use navigation::{GuardedNavigator, Navigator, Route};
pub use session::{ChangeReason, Session, SessionChange, SessionStore, Subscription};
