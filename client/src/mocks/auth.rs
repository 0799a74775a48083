//! Mock authentication provider.

use crate::api::AuthApi;
use crate::error::{ApiError, FieldErrors, Result};
use crate::models::{Credentials, Registration, UserIdentity};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    passwords: HashMap<String, String>,
    users: HashMap<String, UserIdentity>,
    failures: VecDeque<ApiError>,
    logins: usize,
    registrations: usize,
}

/// In-memory account server. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockAuthApi {
    inner: Arc<Mutex<Inner>>,
}

impl MockAuthApi {
    /// No accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account.
    #[must_use]
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.add_user(username, password);
        self
    }

    /// Fail the next login or registration with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.lock().failures.push_back(error);
    }

    /// Number of login attempts.
    #[must_use]
    pub fn login_count(&self) -> usize {
        self.lock().logins
    }

    /// Number of registration attempts.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.lock().registrations
    }

    /// Whether `username` has an account.
    #[must_use]
    pub fn has_user(&self, username: &str) -> bool {
        self.lock().users.contains_key(username)
    }

    fn add_user(&self, username: &str, password: &str) -> UserIdentity {
        let mut inner = self.lock();
        let id = u64::try_from(inner.users.len()).unwrap_or(u64::MAX) + 1;
        let user = UserIdentity::named(username).with_id(id);
        inner.passwords.insert(username.to_string(), password.to_string());
        inner.users.insert(username.to_string(), user.clone());
        user
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuthApi for MockAuthApi {
    fn login(
        &self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<Credentials>> + Send {
        let api = self.clone();
        async move {
            let mut inner = api.lock();
            inner.logins += 1;
            if let Some(error) = inner.failures.pop_front() {
                return Err(error);
            }

            match (inner.passwords.get(&username), inner.users.get(&username)) {
                (Some(expected), Some(user)) if *expected == password => Ok(Credentials::new(
                    user.clone(),
                    format!("token-{username}-{}", inner.logins),
                )),
                _ => Err(ApiError::Unauthorized {
                    message: "Invalid username or password".to_string(),
                }),
            }
        }
    }

    fn register(
        &self,
        username: String,
        password: String,
    ) -> impl Future<Output = Result<Registration>> + Send {
        let api = self.clone();
        async move {
            {
                let mut inner = api.lock();
                inner.registrations += 1;
                if let Some(error) = inner.failures.pop_front() {
                    return Err(error);
                }
                if inner.users.contains_key(&username) {
                    let message = "A user with that username already exists.".to_string();
                    let mut fields = FieldErrors::new();
                    fields.insert("username".to_string(), message.clone());
                    return Err(ApiError::Validation { message, fields });
                }
            }

            let user = api.add_user(&username, &password);
            Ok(Registration {
                user: Some(user),
                message: Some("User registered successfully".to_string()),
            })
        }
    }
}
