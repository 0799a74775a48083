//! Single post view.

use super::{issue, RequestId};
use crate::api::PostsApi;
use crate::error::{ApiError, ErrorKind};
use crate::models::{Post, PostId, UserIdentity};
use crate::navigation::{Navigator, Route};
use quill_core::effect::Effect;
use quill_core::reducer::Reducer;
use quill_core::{async_effect, smallvec, SmallVec};
use std::marker::PhantomData;
use std::sync::Arc;

/// Load status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailStatus {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Fetch in flight
    Loading,
    /// Post shown
    Loaded,
    /// The post does not exist; terminal, offers a way back to the list
    NotFound(String),
    /// Fetch failed; `Retry` refetches
    Failed(String),
}

/// Detail view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDetailState {
    /// Post being shown
    pub id: PostId,
    /// Loaded post
    pub post: Option<Post>,
    /// Load status
    pub status: DetailStatus,
    /// Signed-in user, if any
    pub viewer: Option<UserIdentity>,
    /// Viewer owns the post (edit and delete offered)
    pub is_owner: bool,
    /// Delete in flight
    pub deleting: bool,
    /// Last delete failure
    pub delete_error: Option<String>,
    /// The post was deleted
    pub deleted: bool,
    /// Id of the fetch whose completion will be applied
    pub latest_request: Option<RequestId>,
    request_counter: RequestId,
}

impl PostDetailState {
    /// State for post `id`, viewed by `viewer`.
    #[must_use]
    pub fn new(id: PostId, viewer: Option<UserIdentity>) -> Self {
        Self {
            id,
            post: None,
            status: DetailStatus::Idle,
            viewer,
            is_owner: false,
            deleting: false,
            delete_error: None,
            deleted: false,
            latest_request: None,
            request_counter: RequestId::default(),
        }
    }

    fn refresh_ownership(&mut self) {
        self.is_owner = match (&self.post, &self.viewer) {
            (Some(post), Some(viewer)) => post.is_owned_by(viewer),
            _ => false,
        };
    }
}

/// Detail view inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostDetailAction {
    /// Fetch the post
    Load,
    /// Fetch completed
    Loaded {
        /// Fetch identity
        request: RequestId,
        /// Outcome
        result: Result<Post, ApiError>,
    },
    /// The signed-in user changed
    ViewerChanged(Option<UserIdentity>),
    /// Refetch after a failure
    Retry,
    /// Open the edit form
    Edit,
    /// Delete the post (already confirmed by the user)
    Delete,
    /// Server deleted the post
    Deleted,
    /// Server refused the delete
    DeleteFailed(ApiError),
}

/// Detail view dependencies.
pub struct PostDetailEnvironment<P> {
    /// Post operations
    pub api: Arc<P>,
    /// Where navigation requests go
    pub navigator: Arc<dyn Navigator>,
}

impl<P> PostDetailEnvironment<P> {
    /// Bundle dependencies.
    pub fn new(api: Arc<P>, navigator: Arc<dyn Navigator>) -> Self {
        Self { api, navigator }
    }
}

impl<P> Clone for PostDetailEnvironment<P> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            navigator: Arc::clone(&self.navigator),
        }
    }
}

/// Detail view reducer.
#[derive(Debug)]
pub struct PostDetailReducer<P> {
    _phantom: PhantomData<fn() -> P>,
}

impl<P> PostDetailReducer<P> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<P> Default for PostDetailReducer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for PostDetailReducer<P> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

fn navigate<A: Send + 'static>(navigator: &Arc<dyn Navigator>, route: Route) -> Effect<A> {
    let navigator = Arc::clone(navigator);
    async_effect! {
        navigator.navigate(route);
        None
    }
}

impl<P: PostsApi + 'static> PostDetailReducer<P> {
    fn fetch(state: &mut PostDetailState, env: &PostDetailEnvironment<P>) -> Effect<PostDetailAction> {
        let request = issue(&mut state.request_counter, &mut state.latest_request);
        state.status = DetailStatus::Loading;

        let api = Arc::clone(&env.api);
        let id = state.id.clone();
        async_effect! {
            let result = api.get_post(id).await;
            Some(PostDetailAction::Loaded { request, result })
        }
    }
}

impl<P: PostsApi + 'static> Reducer for PostDetailReducer<P> {
    type State = PostDetailState;
    type Action = PostDetailAction;
    type Environment = PostDetailEnvironment<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PostDetailAction::Load => smallvec![Self::fetch(state, env)],

            PostDetailAction::Loaded { request, result } => {
                if state.latest_request != Some(request) {
                    tracing::warn!(%request, "Discarding stale post response");
                    return SmallVec::new();
                }
                state.latest_request = None;

                match result {
                    Ok(post) => {
                        state.post = Some(post);
                        state.status = DetailStatus::Loaded;
                    },
                    Err(error) if error.kind() == ErrorKind::NotFound => {
                        state.post = None;
                        state.status = DetailStatus::NotFound(error.message().to_string());
                    },
                    Err(error) => state.status = DetailStatus::Failed(error.message().to_string()),
                }
                state.refresh_ownership();
                SmallVec::new()
            },

            PostDetailAction::ViewerChanged(viewer) => {
                state.viewer = viewer;
                state.refresh_ownership();
                SmallVec::new()
            },

            PostDetailAction::Retry => {
                if !matches!(state.status, DetailStatus::Failed(_)) {
                    return SmallVec::new();
                }
                smallvec![Self::fetch(state, env)]
            },

            PostDetailAction::Edit => {
                if !state.is_owner {
                    return SmallVec::new();
                }
                smallvec![navigate(&env.navigator, Route::EditPost(state.id.clone()))]
            },

            PostDetailAction::Delete => {
                if state.deleting || !state.is_owner {
                    return SmallVec::new();
                }
                state.deleting = true;
                state.delete_error = None;

                let api = Arc::clone(&env.api);
                let id = state.id.clone();
                smallvec![async_effect! {
                    match api.delete_post(id).await {
                        Ok(()) => Some(PostDetailAction::Deleted),
                        Err(error) => Some(PostDetailAction::DeleteFailed(error)),
                    }
                }]
            },

            PostDetailAction::Deleted => {
                state.deleting = false;
                state.deleted = true;
                smallvec![navigate(&env.navigator, Route::Home)]
            },

            PostDetailAction::DeleteFailed(error) => {
                state.deleting = false;
                state.delete_error = Some(format!("Failed to delete post: {}", error.message()));
                SmallVec::new()
            },
        }
    }
}
