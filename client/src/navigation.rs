//! Navigation seam between client logic and whatever renders it.

use crate::models::PostId;
use crate::session::SessionStore;
use std::fmt;
use std::sync::Arc;

/// A navigable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Post listing
    Home,
    /// Login form
    Login,
    /// Registration form
    Register,
    /// New post form
    CreatePost,
    /// Single post
    Post(PostId),
    /// Edit form for a post
    EditPost(PostId),
}

impl Route {
    /// Path for this route.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Register => "/register".to_string(),
            Self::CreatePost => "/create/post".to_string(),
            Self::Post(id) => format!("/posts/{id}"),
            Self::EditPost(id) => format!("/posts/edit/{id}"),
        }
    }

    /// Whether only a signed-in user may open this route.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(self, Self::CreatePost | Self::EditPost(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Receives navigation requests.
pub trait Navigator: Send + Sync {
    /// Move to `route`.
    fn navigate(&self, route: Route);
}

/// Navigator that only logs. Useful for headless tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = %route, "Navigate");
    }
}

/// Sends anonymous users to [`Route::Login`] instead of a protected route.
///
/// The check runs against the session at the moment of navigation.
pub struct GuardedNavigator {
    inner: Arc<dyn Navigator>,
    session: SessionStore,
}

impl GuardedNavigator {
    /// Guard `inner` with `session`.
    pub fn new(inner: Arc<dyn Navigator>, session: SessionStore) -> Self {
        Self { inner, session }
    }
}

impl fmt::Debug for GuardedNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedNavigator").finish_non_exhaustive()
    }
}

impl Navigator for GuardedNavigator {
    fn navigate(&self, route: Route) {
        if route.requires_auth() && !self.session.is_authenticated() {
            tracing::debug!(route = %route, "Protected route, redirecting to login");
            self.inner.navigate(Route::Login);
        } else {
            self.inner.navigate(route);
        }
    }
}
