//! Process-wide authentication state.
//!
//! [`SessionStore`] is constructed once at startup and handed to every
//! consumer. It is the only writer of persisted session data.
//!
//! Every transition runs persist → update → notify while holding a
//! transition lock, so all observers see transitions in the same order and
//! persisted data is always consistent by the time anyone is told.
//! Observer callbacks run on the mutating thread and must not call back
//! into the store's mutating methods.

use crate::error::StorageResult;
use crate::models::{Credentials, UserIdentity};
use crate::storage::{keys, SessionStorage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

/// Capacity of the async change feed.
const CHANGE_FEED_CAPACITY: usize = 64;

/// Snapshot of the authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Token and user, present together or not at all
    pub credentials: Option<Credentials>,
    /// A login or registration is in flight
    pub is_loading: bool,
}

impl Session {
    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Signed-in user.
    #[must_use]
    pub fn user(&self) -> Option<&UserIdentity> {
        self.credentials.as_ref().map(|c| &c.user)
    }

    /// Bearer token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }
}

/// Why the session changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// Credentials were set
    SignedIn,
    /// Explicit logout
    SignedOut,
    /// The server rejected the token
    Expired,
    /// The loading flag flipped
    LoadingChanged,
}

/// A session transition as delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    /// State after the transition
    pub session: Session,
    /// Cause
    pub reason: ChangeReason,
}

type Observer = Arc<dyn Fn(&SessionChange) + Send + Sync>;

struct Inner {
    storage: Arc<dyn SessionStorage>,
    state: RwLock<Session>,
    transition: Mutex<()>,
    observers: Mutex<Vec<(u64, Observer)>>,
    next_observer: AtomicU64,
    changes: broadcast::Sender<SessionChange>,
}

/// Shared handle to the session. Clones refer to the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Build the store, restoring any persisted session.
    ///
    /// Token and user must both be present and the user record must parse;
    /// anything else starts signed out. Never fails.
    pub fn init(storage: Arc<dyn SessionStorage>) -> Self {
        let credentials = restore(storage.as_ref());
        if let Some(credentials) = &credentials {
            tracing::info!(username = %credentials.user.username, "Restored persisted session");
        }

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                storage,
                state: RwLock::new(Session {
                    credentials,
                    is_loading: false,
                }),
                transition: Mutex::new(()),
                observers: Mutex::new(Vec::new()),
                next_observer: AtomicU64::new(0),
                changes,
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    /// Current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read().token().map(str::to_string)
    }

    /// Current user.
    #[must_use]
    pub fn user(&self) -> Option<UserIdentity> {
        self.read().user().cloned()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// Persist and apply new credentials, then notify.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the in-memory state is then unchanged and
    /// nobody is notified.
    pub fn set_session(&self, user: UserIdentity, token: impl Into<String>) -> StorageResult<()> {
        let credentials = Credentials::new(user, token);
        let user_json = serde_json::to_string(&credentials.user)?;

        let _transition = self.lock_transition();
        self.inner
            .storage
            .write_batch(&[
                (keys::TOKEN, Some(credentials.token.as_str())),
                (keys::USER, Some(user_json.as_str())),
            ])
            .inspect_err(|e| tracing::error!(error = %e, "Failed to persist session"))?;

        tracing::info!(username = %credentials.user.username, "Session established");
        let session = {
            let mut state = self.write();
            state.credentials = Some(credentials);
            state.clone()
        };
        self.notify(SessionChange {
            session,
            reason: ChangeReason::SignedIn,
        });
        Ok(())
    }

    /// Remove persisted credentials and sign out.
    ///
    /// Persisted keys are removed even when already signed out; observers
    /// are only notified if a session actually ended.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the in-memory state is then unchanged.
    pub fn logout(&self) -> StorageResult<()> {
        let _transition = self.lock_transition();
        self.end_session(ChangeReason::SignedOut).map(|_| ())
    }

    /// End the session because the server rejected `token`.
    ///
    /// Only acts if `token` is still the current token, so a late 401 for
    /// an old token cannot end a newer session. Returns whether a session
    /// was ended.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the in-memory state is then unchanged.
    pub fn expire(&self, token: &str) -> StorageResult<bool> {
        let _transition = self.lock_transition();
        if self.read().token() != Some(token) {
            return Ok(false);
        }
        self.end_session(ChangeReason::Expired)
    }

    /// Toggle the transient loading flag. Not persisted.
    pub fn set_loading(&self, is_loading: bool) {
        let _transition = self.lock_transition();
        let session = {
            let mut state = self.write();
            if state.is_loading == is_loading {
                return;
            }
            state.is_loading = is_loading;
            state.clone()
        };
        self.notify(SessionChange {
            session,
            reason: ChangeReason::LoadingChanged,
        });
    }

    /// Register an observer for every transition.
    ///
    /// The observer stays registered until the returned [`Subscription`] is
    /// dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionChange) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Async feed of transitions, in the same order observers see them.
    #[must_use]
    pub fn changes(&self) -> broadcast::Receiver<SessionChange> {
        self.inner.changes.subscribe()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Caller holds the transition lock.
    fn end_session(&self, reason: ChangeReason) -> StorageResult<bool> {
        self.inner
            .storage
            .clear()
            .inspect_err(|e| tracing::error!(error = %e, "Failed to clear persisted session"))?;

        let session = {
            let mut state = self.write();
            if state.credentials.take().is_none() {
                return Ok(false);
            }
            state.clone()
        };

        match reason {
            ChangeReason::Expired => tracing::info!("Session expired"),
            _ => tracing::info!("Signed out"),
        }
        self.notify(SessionChange { session, reason });
        Ok(true)
    }

    fn notify(&self, change: SessionChange) {
        let observers: Vec<Observer> = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer(&change);
        }
        let _ = self.inner.changes.send(change);
    }

    fn lock_transition(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn restore(storage: &dyn SessionStorage) -> Option<Credentials> {
    let read = |key: &str| {
        storage
            .get(key)
            .inspect_err(|e| tracing::warn!(key, error = %e, "Unreadable persisted session"))
            .ok()
            .flatten()
    };

    let (token, user_json) = match (read(keys::TOKEN), read(keys::USER)) {
        (Some(token), Some(user)) if !token.trim().is_empty() => (token, user),
        (None, None) => return None,
        _ => {
            tracing::warn!("Ignoring incomplete persisted session");
            return None;
        },
    };

    match serde_json::from_str::<UserIdentity>(&user_json) {
        Ok(user) if !user.username.trim().is_empty() => Some(Credentials::new(user, token)),
        _ => {
            tracing::warn!("Ignoring malformed persisted user record");
            None
        },
    }
}

/// Observer registration; unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    store: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}
