//! Session demo
//!
//! Restores the persisted session, checks the backend, and prints the first
//! page of the post list the way the home screen would show it.
//!
//! # Running
//!
//! ```bash
//! QUILL_API_BASE_URL=http://localhost:8000/api/ cargo run -p session-demo
//! ```
//!
//! Variables can also come from a `.env` file in the working directory.

#![allow(missing_docs)]

use quill_client::navigation::{GuardedNavigator, LoggingNavigator};
use quill_client::storage::FileSessionStorage;
use quill_client::views::{
    bind_session, PostListAction, PostListEnvironment, PostListReducer, PostListState,
};
use quill_client::{ApiClient, ChangeReason, ClientConfig, SessionStore};
use quill_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_demo=info,quill_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(base_url = %config.base_url, storage = %config.storage_path.display(), "Starting");

    let session = SessionStore::init(Arc::new(FileSessionStorage::new(&config.storage_path)));
    match session.user() {
        Some(user) => println!("Restored session for {}", user.username),
        None => println!("No saved session, browsing anonymously"),
    }

    let navigator = Arc::new(GuardedNavigator::new(Arc::new(LoggingNavigator), session.clone()));
    let api = Arc::new(ApiClient::new(config.clone(), session.clone(), navigator)?);
    if !api.ping().await {
        println!("Backend at {} is not reachable", config.base_url);
        return Ok(());
    }

    let store = Store::new(
        PostListState::new(config.per_page),
        PostListReducer::new(),
        PostListEnvironment::new(Arc::clone(&api), config.per_page),
    );
    let binding = bind_session(&session, store.clone(), |change| match change.reason {
        ChangeReason::LoadingChanged => None,
        _ => Some(PostListAction::AuthChanged {
            authenticated: change.session.is_authenticated(),
        }),
    });

    // The handle covers the fetch and the reduction of its result.
    store
        .send(PostListAction::Mount {
            authenticated: session.is_authenticated(),
        })
        .await?
        .wait_with_timeout(Duration::from_secs(15))
        .await?;

    let state = store.state(|s| s.clone()).await;
    if let Some(error) = state.error() {
        println!("Could not load posts: {error}");
    } else {
        println!(
            "\n{:?} posts, page {} of {} ({} total)\n",
            state.scope, state.pagination.page, state.pagination.pages, state.pagination.total
        );
        for post in &state.posts {
            println!("  [{}] {} by {}", post.id, post.title, post.author_name());
            println!("      {}", post.excerpt(80));
        }
    }

    store.shutdown(Duration::from_secs(2)).await?;
    binding.abort();
    Ok(())
}
