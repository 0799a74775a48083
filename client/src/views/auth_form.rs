//! Login and registration forms.
//!
//! Login signs the user in through the [`SessionStore`] and navigates home.
//! Registration never signs in: it shows a confirmation and redirects to the
//! login form after [`REDIRECT_DELAY`].

use crate::api::AuthApi;
use crate::error::{ApiError, FieldErrors};
use crate::models::{Registration, UserIdentity};
use crate::navigation::{Navigator, Route};
use crate::session::SessionStore;
use quill_core::effect::Effect;
use quill_core::reducer::Reducer;
use quill_core::{async_effect, delay, smallvec, SmallVec};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Shown after a successful registration.
pub const REGISTERED_MESSAGE: &str = "Registration successful! Please login with your credentials.";

/// Local precondition failure.
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Username and password are required";

/// Pause between the registration confirmation and the redirect.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Which form is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Sign in
    #[default]
    Login,
    /// Create an account
    Register,
}

/// Form state.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AuthFormState {
    /// Login or register
    pub mode: AuthMode,
    /// Username input
    pub username: String,
    /// Password input
    pub password: String,
    /// General error
    pub error: Option<String>,
    /// Per-field server errors (registration)
    pub field_errors: FieldErrors,
    /// Confirmation message
    pub success: Option<String>,
    /// Request in flight
    pub is_submitting: bool,
}

impl AuthFormState {
    /// Empty form in `mode`.
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl fmt::Debug for AuthFormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFormState")
            .field("mode", &self.mode)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("error", &self.error)
            .field("field_errors", &self.field_errors)
            .field("success", &self.success)
            .field("is_submitting", &self.is_submitting)
            .finish()
    }
}

/// Form inputs.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthFormAction {
    /// Username edited
    UsernameChanged(String),
    /// Password edited
    PasswordChanged(String),
    /// Submit the form
    Submit,
    /// Login finished; on success the session is already set
    LoggedIn(Result<UserIdentity, ApiError>),
    /// Registration finished
    Registered(Result<Registration, ApiError>),
    /// Registration confirmation delay elapsed
    RedirectToLogin,
}

impl fmt::Debug for AuthFormAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernameChanged(name) => f.debug_tuple("UsernameChanged").field(name).finish(),
            Self::PasswordChanged(_) => f.write_str("PasswordChanged(<redacted>)"),
            Self::Submit => f.write_str("Submit"),
            Self::LoggedIn(result) => f.debug_tuple("LoggedIn").field(result).finish(),
            Self::Registered(result) => f.debug_tuple("Registered").field(result).finish(),
            Self::RedirectToLogin => f.write_str("RedirectToLogin"),
        }
    }
}

/// Form dependencies.
pub struct AuthFormEnvironment<A> {
    /// Auth operations
    pub auth: Arc<A>,
    /// Session to sign in to
    pub session: SessionStore,
    /// Where navigation requests go
    pub navigator: Arc<dyn Navigator>,
    /// Delay before the post-registration redirect
    pub redirect_delay: Duration,
}

impl<A> AuthFormEnvironment<A> {
    /// Bundle dependencies with the default redirect delay.
    pub fn new(auth: Arc<A>, session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            auth,
            session,
            navigator,
            redirect_delay: REDIRECT_DELAY,
        }
    }

    /// Override the redirect delay.
    #[must_use]
    pub const fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }
}

impl<A> Clone for AuthFormEnvironment<A> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            session: self.session.clone(),
            navigator: Arc::clone(&self.navigator),
            redirect_delay: self.redirect_delay,
        }
    }
}

/// Login/registration reducer.
#[derive(Debug)]
pub struct AuthFormReducer<A> {
    _phantom: PhantomData<fn() -> A>,
}

impl<A> AuthFormReducer<A> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<A> Default for AuthFormReducer<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for AuthFormReducer<A> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<A: AuthApi + 'static> AuthFormReducer<A> {
    fn login(env: &AuthFormEnvironment<A>, username: String, password: String) -> Effect<AuthFormAction> {
        let auth = Arc::clone(&env.auth);
        let session = env.session.clone();
        let navigator = Arc::clone(&env.navigator);

        async_effect! {
            session.set_loading(true);
            let outcome = auth.login(username, password).await;
            session.set_loading(false);

            let result = outcome.and_then(|credentials| {
                let user = credentials.user.clone();
                session.set_session(credentials.user, credentials.token)?;
                Ok(user)
            });
            if result.is_ok() {
                navigator.navigate(Route::Home);
            }
            Some(AuthFormAction::LoggedIn(result))
        }
    }

    fn register(env: &AuthFormEnvironment<A>, username: String, password: String) -> Effect<AuthFormAction> {
        let auth = Arc::clone(&env.auth);
        let session = env.session.clone();

        async_effect! {
            session.set_loading(true);
            let result = auth.register(username, password).await;
            session.set_loading(false);
            Some(AuthFormAction::Registered(result))
        }
    }
}

impl<A: AuthApi + 'static> Reducer for AuthFormReducer<A> {
    type State = AuthFormState;
    type Action = AuthFormAction;
    type Environment = AuthFormEnvironment<A>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AuthFormAction::UsernameChanged(username) => {
                state.username = username;
                state.field_errors.remove("username");
                SmallVec::new()
            },

            AuthFormAction::PasswordChanged(password) => {
                state.password = password;
                state.field_errors.remove("password");
                SmallVec::new()
            },

            AuthFormAction::Submit => {
                if state.is_submitting {
                    return SmallVec::new();
                }
                state.error = None;
                state.success = None;
                state.field_errors.clear();

                let username = state.username.trim().to_string();
                if username.is_empty() || state.password.is_empty() {
                    state.error = Some(MISSING_CREDENTIALS_MESSAGE.to_string());
                    return SmallVec::new();
                }
                state.is_submitting = true;

                let password = state.password.clone();
                match state.mode {
                    AuthMode::Login => smallvec![Self::login(env, username, password)],
                    AuthMode::Register => smallvec![Self::register(env, username, password)],
                }
            },

            AuthFormAction::LoggedIn(result) => {
                state.is_submitting = false;
                match result {
                    Ok(user) => {
                        tracing::info!(username = %user.username, "Logged in");
                        state.password.clear();
                    },
                    Err(error) => state.error = Some(error.message().to_string()),
                }
                SmallVec::new()
            },

            AuthFormAction::Registered(result) => {
                state.is_submitting = false;
                match result {
                    Ok(_) => {
                        state.success = Some(REGISTERED_MESSAGE.to_string());
                        state.username.clear();
                        state.password.clear();
                        smallvec![delay! {
                            duration: env.redirect_delay,
                            action: AuthFormAction::RedirectToLogin
                        }]
                    },
                    Err(error) => {
                        if let Some(fields) = error.field_errors() {
                            state.field_errors = fields.clone();
                        }
                        state.error = Some(error.message().to_string());
                        SmallVec::new()
                    },
                }
            },

            AuthFormAction::RedirectToLogin => {
                let navigator = Arc::clone(&env.navigator);
                smallvec![async_effect! {
                    navigator.navigate(Route::Login);
                    None
                }]
            },
        }
    }
}
