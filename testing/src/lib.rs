//! # Quill Testing
//!
//! Testing utilities for Quill's view reducers.
//!
//! This crate provides:
//! - A fluent Given-When-Then harness for reducers
//! - Effect assertions and a helper that resolves future effects
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use quill_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new(PostListReducer::new())
//!     .with_env(env)
//!     .given_state(PostListState::new(10))
//!     .when_action(PostListAction::Mount { authenticated: false })
//!     .then_state(|s| assert!(s.is_loading()))
//!     .then_effects(assertions::assert_has_future_effect)
//!     .run();
//! ```

mod reducer_test;

pub use reducer_test::{assertions, resolve_effects, ReducerTest};

/// Install a test-friendly tracing subscriber
///
/// Honors `RUST_LOG`; output goes through the test writer so it only shows
/// for failing tests. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
