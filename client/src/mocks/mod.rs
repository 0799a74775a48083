//! In-memory providers for tests and demos.
//!
//! Enabled by the `test-utils` feature.

mod auth;
mod navigator;
mod posts;

pub use auth::MockAuthApi;
pub use navigator::RecordingNavigator;
pub use posts::{MockPostsApi, PostsCall, PostsOperation};
