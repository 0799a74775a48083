//! Create/edit form for a post.
//!
//! Field-level server errors are kept apart from the general error. Editing
//! a field clears only that field's error. Input is never discarded on
//! failure.

use super::{issue, RequestId};
use crate::api::PostsApi;
use crate::error::{ApiError, FieldErrors};
use crate::models::{Post, PostDraft, PostId};
use quill_core::effect::Effect;
use quill_core::reducer::Reducer;
use quill_core::{async_effect, smallvec, SmallVec};
use std::marker::PhantomData;
use std::sync::Arc;

/// Local precondition failure.
pub const REQUIRED_MESSAGE: &str = "Title and content are required";

/// Field names as reported by the server.
pub mod fields {
    /// Title field
    pub const TITLE: &str = "title";
    /// Content field
    pub const CONTENT: &str = "content";
}

/// What the form saves to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormMode {
    /// New post
    #[default]
    Create,
    /// Existing post
    Edit(PostId),
}

/// Form state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostFormState {
    /// Create or edit
    pub mode: FormMode,
    /// Title input, untrimmed
    pub title: String,
    /// Content input, untrimmed
    pub content: String,
    /// Per-field server errors
    pub field_errors: FieldErrors,
    /// General error
    pub error: Option<String>,
    /// Existing post is being fetched
    pub is_loading: bool,
    /// Submission in flight
    pub is_submitting: bool,
    /// Set after a successful submission
    pub saved: bool,
    /// Post returned by the last successful submission, when echoed
    pub saved_post: Option<Post>,
    /// Id of the load whose completion will be applied
    pub latest_request: Option<RequestId>,
    request_counter: RequestId,
}

impl PostFormState {
    /// Empty create form.
    #[must_use]
    pub fn create() -> Self {
        Self::default()
    }

    /// Edit form for `id`; send [`PostFormAction::Load`] to fill it.
    #[must_use]
    pub fn edit(id: PostId) -> Self {
        Self {
            mode: FormMode::Edit(id),
            ..Self::default()
        }
    }

    /// Error for one field.
    #[must_use]
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }
}

/// Form inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFormAction {
    /// Fetch the post being edited
    Load,
    /// The post being edited arrived
    Loaded {
        /// Fetch identity
        request: RequestId,
        /// Outcome
        result: Result<Post, ApiError>,
    },
    /// Title edited
    TitleChanged(String),
    /// Content edited
    ContentChanged(String),
    /// Submit the form
    Submit,
    /// The save completed
    Submitted(Result<Option<Post>, ApiError>),
}

/// Form dependencies.
pub struct PostFormEnvironment<P> {
    /// Post operations
    pub api: Arc<P>,
}

impl<P> PostFormEnvironment<P> {
    /// Bundle dependencies.
    pub const fn new(api: Arc<P>) -> Self {
        Self { api }
    }
}

impl<P> Clone for PostFormEnvironment<P> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

/// Form reducer.
#[derive(Debug)]
pub struct PostFormReducer<P> {
    _phantom: PhantomData<fn() -> P>,
}

impl<P> PostFormReducer<P> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<P> Default for PostFormReducer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for PostFormReducer<P> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<P: PostsApi + 'static> Reducer for PostFormReducer<P> {
    type State = PostFormState;
    type Action = PostFormAction;
    type Environment = PostFormEnvironment<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PostFormAction::Load => {
                let FormMode::Edit(id) = state.mode.clone() else {
                    return SmallVec::new();
                };
                let request = issue(&mut state.request_counter, &mut state.latest_request);
                state.is_loading = true;
                state.error = None;

                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    let result = api.get_post(id).await;
                    Some(PostFormAction::Loaded { request, result })
                }]
            },

            PostFormAction::Loaded { request, result } => {
                if state.latest_request != Some(request) {
                    tracing::warn!(%request, "Discarding stale post load");
                    return SmallVec::new();
                }
                state.latest_request = None;
                state.is_loading = false;

                match result {
                    Ok(post) => {
                        state.title = post.title;
                        state.content = post.content;
                    },
                    Err(error) => state.error = Some(error.message().to_string()),
                }
                SmallVec::new()
            },

            PostFormAction::TitleChanged(title) => {
                state.title = title;
                state.field_errors.remove(fields::TITLE);
                SmallVec::new()
            },

            PostFormAction::ContentChanged(content) => {
                state.content = content;
                state.field_errors.remove(fields::CONTENT);
                SmallVec::new()
            },

            PostFormAction::Submit => {
                if state.is_submitting {
                    return SmallVec::new();
                }
                state.field_errors.clear();
                state.error = None;
                state.saved = false;

                let draft = PostDraft::trimmed(&state.title, &state.content);
                if !draft.is_complete() {
                    state.error = Some(REQUIRED_MESSAGE.to_string());
                    return SmallVec::new();
                }
                state.is_submitting = true;

                let api = Arc::clone(&env.api);
                let mode = state.mode.clone();
                smallvec![async_effect! {
                    let result = match mode {
                        FormMode::Create => api.create_post(draft).await,
                        FormMode::Edit(id) => api.update_post(id, draft).await,
                    };
                    Some(PostFormAction::Submitted(result))
                }]
            },

            PostFormAction::Submitted(result) => {
                state.is_submitting = false;
                match result {
                    Ok(post) => {
                        if state.mode == FormMode::Create {
                            state.title.clear();
                            state.content.clear();
                        }
                        state.saved = true;
                        state.saved_post = post;
                    },
                    Err(ApiError::Validation { fields, message }) if !fields.is_empty() => {
                        tracing::debug!(%message, count = fields.len(), "Server rejected fields");
                        state.field_errors = fields;
                    },
                    Err(error) => state.error = Some(error.message().to_string()),
                }
                SmallVec::new()
            },
        }
    }
}
