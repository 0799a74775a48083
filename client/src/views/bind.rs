//! Feeding session transitions into a view store.

use crate::session::{SessionChange, SessionStore};
use quill_core::reducer::Reducer;
use quill_runtime::{Store, StoreError};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Forward session transitions into `store` as actions.
///
/// One task delivers every change in order; `map` decides which transitions
/// the view cares about. The feed is subscribed before this returns, so no
/// transition after the call is missed. The task ends when the session or
/// the store shuts down.
pub fn bind_session<S, A, E, R, F>(
    session: &SessionStore,
    store: Store<S, A, E, R>,
    map: F,
) -> JoinHandle<()>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(&SessionChange) -> Option<A> + Send + 'static,
{
    let mut changes = session.changes();

    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    let Some(action) = map(&change) else {
                        continue;
                    };
                    match store.send(action).await {
                        Ok(_) => {},
                        Err(StoreError::ShutdownInProgress) => {
                            tracing::debug!("View store shut down, unbinding session");
                            break;
                        },
                        Err(e) => tracing::warn!(error = %e, "Failed to forward session change"),
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session feed lagged");
                },
                Err(RecvError::Closed) => break,
            }
        }
    })
}
