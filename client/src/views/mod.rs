//! View state machines.
//!
//! Each view is a reducer run inside a [`quill_runtime::Store`]. Network
//! calls are returned as effects and their completions come back as actions,
//! tagged with a [`RequestId`] where a newer request may supersede them.

pub mod auth_form;
pub mod bind;
pub mod post_detail;
pub mod post_form;
pub mod post_list;

pub use auth_form::{AuthFormAction, AuthFormEnvironment, AuthFormReducer, AuthFormState, AuthMode};
pub use bind::bind_session;
pub use post_detail::{
    DetailStatus, PostDetailAction, PostDetailEnvironment, PostDetailReducer, PostDetailState,
};
pub use post_form::{FormMode, PostFormAction, PostFormEnvironment, PostFormReducer, PostFormState};
pub use post_list::{
    ListScope, LoadState, PostListAction, PostListEnvironment, PostListReducer, PostListState,
};

use std::fmt;

/// Identity of one in-flight fetch.
///
/// Issued from a per-view monotonic counter. A completion is applied only if
/// its id is still the view's latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RequestId(u64);

impl RequestId {
    /// The id after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issue the next request id and mark it as the latest.
pub(crate) fn issue(counter: &mut RequestId, latest: &mut Option<RequestId>) -> RequestId {
    *counter = counter.next();
    *latest = Some(*counter);
    *counter
}
