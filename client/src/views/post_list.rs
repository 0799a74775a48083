//! Paginated post listing with local reconciliation after deletes.
//!
//! Anonymous viewers see all posts, signed-in viewers see their own. Every
//! fetch is tagged with a [`RequestId`]; a completion that is not the latest
//! is dropped, so a slow response for an old page or an old auth state never
//! overwrites a newer one.

use super::{issue, RequestId};
use crate::api::PostsApi;
use crate::error::ApiError;
use crate::models::{PageRequest, Pagination, Post, PostId, PostPage};
use quill_core::effect::Effect;
use quill_core::reducer::Reducer;
use quill_core::{async_effect, smallvec, SmallVec};
use std::marker::PhantomData;
use std::sync::Arc;

/// Which set of posts is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    /// Every post (anonymous viewer)
    #[default]
    All,
    /// The signed-in user's posts
    Mine,
}

impl ListScope {
    /// Scope for an auth state.
    #[must_use]
    pub const fn for_auth(authenticated: bool) -> Self {
        if authenticated { Self::Mine } else { Self::All }
    }
}

/// Fetch cycle state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Not mounted yet
    #[default]
    Idle,
    /// A fetch is in flight
    Loading,
    /// The latest fetch succeeded
    Loaded,
    /// The latest fetch failed; `Retry` refetches the same page
    Failed(ApiError),
}

/// Post list view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListState {
    /// Set currently shown
    pub scope: ListScope,
    /// Posts on the current page, in server order
    pub posts: Vec<Post>,
    /// Metadata for the current page
    pub pagination: Pagination,
    /// Page of the latest fetch
    pub requested_page: u32,
    /// Fetch cycle
    pub load: LoadState,
    /// Post whose delete is in flight
    pub deleting: Option<PostId>,
    /// Last delete failure, shown alongside the list
    pub delete_error: Option<String>,
    /// Id of the fetch whose completion will be applied
    pub latest_request: Option<RequestId>,
    request_counter: RequestId,
}

impl PostListState {
    /// Fresh state for `per_page` sized pages.
    #[must_use]
    pub fn new(per_page: u32) -> Self {
        Self {
            scope: ListScope::All,
            posts: Vec::new(),
            pagination: Pagination::empty(per_page),
            requested_page: 1,
            load: LoadState::Idle,
            deleting: None,
            delete_error: None,
            latest_request: None,
            request_counter: RequestId::default(),
        }
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.load, LoadState::Loading)
    }

    /// The fetch error, if the latest fetch failed.
    #[must_use]
    pub const fn error(&self) -> Option<&ApiError> {
        match &self.load {
            LoadState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Post list inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostListAction {
    /// View appeared
    Mount {
        /// Current auth state
        authenticated: bool,
    },
    /// Sign-in or sign-out while mounted
    AuthChanged {
        /// New auth state
        authenticated: bool,
    },
    /// Jump to a page; ignored outside `[1, pages]`
    GoToPage(u32),
    /// Next page, if any
    NextPage,
    /// Previous page, if any
    PreviousPage,
    /// Refetch after a failure
    Retry,
    /// A fetch completed
    PageLoaded {
        /// Fetch identity
        request: RequestId,
        /// Outcome
        result: Result<PostPage, ApiError>,
    },
    /// Delete a post (already confirmed by the user)
    Delete(PostId),
    /// The server deleted the post
    PostDeleted(PostId),
    /// The server refused the delete
    DeleteFailed {
        /// Post that was not deleted
        id: PostId,
        /// Why
        error: ApiError,
    },
    /// Hide the delete error
    DismissDeleteError,
}

/// Post list dependencies.
pub struct PostListEnvironment<P> {
    /// Post operations
    pub api: Arc<P>,
    /// Page size
    pub per_page: u32,
}

impl<P> PostListEnvironment<P> {
    /// Bundle dependencies.
    pub const fn new(api: Arc<P>, per_page: u32) -> Self {
        Self { api, per_page }
    }
}

impl<P> Clone for PostListEnvironment<P> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            per_page: self.per_page,
        }
    }
}

/// Post list reducer.
#[derive(Debug)]
pub struct PostListReducer<P> {
    _phantom: PhantomData<fn() -> P>,
}

impl<P> PostListReducer<P> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<P> Default for PostListReducer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for PostListReducer<P> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<P: PostsApi + 'static> PostListReducer<P> {
    fn fetch(
        state: &mut PostListState,
        env: &PostListEnvironment<P>,
        page: u32,
    ) -> Effect<PostListAction> {
        let request = issue(&mut state.request_counter, &mut state.latest_request);
        state.requested_page = page;
        state.load = LoadState::Loading;

        let api = Arc::clone(&env.api);
        let scope = state.scope;
        let page_request = PageRequest::new(page, env.per_page);
        tracing::debug!(%request, ?scope, page, "Fetching posts");

        async_effect! {
            let result = match scope {
                ListScope::All => api.list_posts(page_request).await,
                ListScope::Mine => api.my_posts(page_request).await,
            };
            Some(PostListAction::PageLoaded { request, result })
        }
    }

    fn go_to(
        state: &mut PostListState,
        env: &PostListEnvironment<P>,
        page: u32,
    ) -> SmallVec<[Effect<PostListAction>; 4]> {
        if !state.pagination.contains(page) || page == state.requested_page {
            tracing::debug!(page, pages = state.pagination.pages, "Ignoring page change");
            return SmallVec::new();
        }
        smallvec![Self::fetch(state, env, page)]
    }
}

impl<P: PostsApi + 'static> Reducer for PostListReducer<P> {
    type State = PostListState;
    type Action = PostListAction;
    type Environment = PostListEnvironment<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PostListAction::Mount { authenticated } => {
                state.scope = ListScope::for_auth(authenticated);
                let page = state.requested_page;
                smallvec![Self::fetch(state, env, page)]
            },

            PostListAction::AuthChanged { authenticated } => {
                state.scope = ListScope::for_auth(authenticated);
                state.posts.clear();
                state.pagination = Pagination::empty(env.per_page);
                state.deleting = None;
                state.delete_error = None;
                smallvec![Self::fetch(state, env, 1)]
            },

            PostListAction::GoToPage(page) => Self::go_to(state, env, page),

            PostListAction::NextPage => {
                if !state.pagination.has_next {
                    return SmallVec::new();
                }
                let page = state.pagination.page + 1;
                Self::go_to(state, env, page)
            },

            PostListAction::PreviousPage => {
                if !state.pagination.has_previous {
                    return SmallVec::new();
                }
                let page = state.pagination.page - 1;
                Self::go_to(state, env, page)
            },

            PostListAction::Retry => {
                if !matches!(state.load, LoadState::Failed(_)) {
                    return SmallVec::new();
                }
                let page = state.requested_page;
                smallvec![Self::fetch(state, env, page)]
            },

            PostListAction::PageLoaded { request, result } => {
                if state.latest_request != Some(request) {
                    tracing::warn!(%request, "Discarding stale post list response");
                    return SmallVec::new();
                }
                state.latest_request = None;

                match result {
                    Ok(page) => {
                        state.posts = page.posts;
                        state.pagination = page.pagination;
                        state.requested_page = state.pagination.page;
                        state.load = LoadState::Loaded;
                    },
                    Err(error) => {
                        state.load = LoadState::Failed(error);
                    },
                }
                SmallVec::new()
            },

            PostListAction::Delete(id) => {
                if state.deleting.is_some() {
                    tracing::debug!(%id, "Delete already in flight");
                    return SmallVec::new();
                }
                state.deleting = Some(id.clone());
                state.delete_error = None;

                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.delete_post(id.clone()).await {
                        Ok(()) => Some(PostListAction::PostDeleted(id)),
                        Err(error) => Some(PostListAction::DeleteFailed { id, error }),
                    }
                }]
            },

            PostListAction::PostDeleted(id) => {
                state.deleting = None;
                let Some(index) = state.posts.iter().position(|post| post.id == id) else {
                    tracing::debug!(%id, "Deleted post is not on the current page");
                    return SmallVec::new();
                };
                state.posts.remove(index);

                let shown_page = state.pagination.page;
                state.pagination.record_removal();

                if state.posts.is_empty() && shown_page > 1 {
                    smallvec![Self::fetch(state, env, shown_page - 1)]
                } else {
                    SmallVec::new()
                }
            },

            PostListAction::DeleteFailed { id, error } => {
                tracing::warn!(%id, %error, "Delete failed");
                state.deleting = None;
                state.delete_error = Some(error.message().to_string());
                SmallVec::new()
            },

            PostListAction::DismissDeleteError => {
                state.delete_error = None;
                SmallVec::new()
            },
        }
    }
}
