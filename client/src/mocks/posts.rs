//! Mock post provider.

use crate::api::PostsApi;
use crate::error::{ApiError, Result};
use crate::models::{PageRequest, Pagination, Post, PostDraft, PostId, PostPage};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Operation selector for injected failures and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostsOperation {
    /// `list_posts`
    ListPosts,
    /// `my_posts`
    MyPosts,
    /// `get_post`
    GetPost,
    /// `create_post`
    CreatePost,
    /// `update_post`
    UpdatePost,
    /// `delete_post`
    DeletePost,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostsCall {
    /// `list_posts`
    ListPosts(PageRequest),
    /// `my_posts`
    MyPosts(PageRequest),
    /// `get_post`
    GetPost(PostId),
    /// `create_post`
    CreatePost(PostDraft),
    /// `update_post`
    UpdatePost(PostId, PostDraft),
    /// `delete_post`
    DeletePost(PostId),
}

impl PostsCall {
    const fn operation(&self) -> PostsOperation {
        match self {
            Self::ListPosts(_) => PostsOperation::ListPosts,
            Self::MyPosts(_) => PostsOperation::MyPosts,
            Self::GetPost(_) => PostsOperation::GetPost,
            Self::CreatePost(_) => PostsOperation::CreatePost,
            Self::UpdatePost(..) => PostsOperation::UpdatePost,
            Self::DeletePost(_) => PostsOperation::DeletePost,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    all: Vec<Post>,
    mine: Vec<Post>,
    failures: HashMap<PostsOperation, VecDeque<ApiError>>,
    delays: HashMap<(PostsOperation, u32), Duration>,
    calls: Vec<PostsCall>,
}

/// In-memory post server.
///
/// Holds two collections: every post, and the signed-in user's posts.
/// Listings are served as `{posts, pagination}` envelopes. Clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct MockPostsApi {
    inner: Arc<Mutex<Inner>>,
}

impl MockPostsApi {
    /// Empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A published post by `author` (a user object on the wire).
    #[must_use]
    pub fn sample_post(id: u64, author: &str) -> Post {
        let value = json!({
            "id": id,
            "title": format!("Post {id}"),
            "content": format!("Content of post {id}"),
            "author": {"username": author},
            "created_at": "2025-01-01T12:00:00Z",
        });
        serde_json::from_value(value).unwrap_or_else(|_| Post {
            id: PostId::from(id),
            title: format!("Post {id}"),
            content: String::new(),
            author: None,
            author_id: None,
            created_at: None,
            updated_at: None,
            is_published: true,
        })
    }

    /// `count` posts by `author` with ids starting at `first_id`.
    #[must_use]
    pub fn sample_posts(first_id: u64, count: u64, author: &str) -> Vec<Post> {
        (first_id..first_id + count)
            .map(|id| Self::sample_post(id, author))
            .collect()
    }

    /// Add posts visible to everyone.
    pub fn insert_all(&self, posts: impl IntoIterator<Item = Post>) {
        self.lock().all.extend(posts);
    }

    /// Add posts owned by the signed-in user. They are also visible to everyone.
    pub fn insert_mine(&self, posts: impl IntoIterator<Item = Post>) {
        let posts: Vec<Post> = posts.into_iter().collect();
        let mut inner = self.lock();
        inner.all.extend(posts.iter().cloned());
        inner.mine.extend(posts);
    }

    /// Every post.
    #[must_use]
    pub fn all_posts(&self) -> Vec<Post> {
        self.lock().all.clone()
    }

    /// The signed-in user's posts.
    #[must_use]
    pub fn mine_posts(&self) -> Vec<Post> {
        self.lock().mine.clone()
    }

    /// Fail the next call to `operation` with `error`. Calls queue up.
    pub fn fail_next(&self, operation: PostsOperation, error: ApiError) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Delay every listing of `page` through `operation`.
    pub fn delay_page(&self, operation: PostsOperation, page: u32, delay: Duration) {
        self.lock().delays.insert((operation, page), delay);
    }

    /// Every call so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<PostsCall> {
        self.lock().calls.clone()
    }

    /// Number of calls to `operation`.
    #[must_use]
    pub fn call_count(&self, operation: PostsOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and pop any injected failure.
    fn begin(&self, call: PostsCall) -> Result<()> {
        let operation = call.operation();
        let mut inner = self.lock();
        inner.calls.push(call);
        match inner.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn page_delay(&self, operation: PostsOperation, page: u32) -> Option<Duration> {
        self.lock().delays.get(&(operation, page)).copied()
    }

    fn page_of(posts: &[Post], request: PageRequest) -> PostPage {
        let pagination = Pagination::from_server(
            &json!({
                "page": request.page,
                "per_page": request.per_page,
                "total": posts.len(),
            }),
            request.per_page,
        );
        let start = (pagination.page.saturating_sub(1) as usize) * request.per_page as usize;
        let posts = posts
            .iter()
            .skip(start)
            .take(request.per_page as usize)
            .cloned()
            .collect();
        PostPage { posts, pagination }
    }

    fn list(&self, operation: PostsOperation, request: PageRequest) -> impl Future<Output = Result<PostPage>> + Send {
        let api = self.clone();
        async move {
            let call = match operation {
                PostsOperation::MyPosts => PostsCall::MyPosts(request),
                _ => PostsCall::ListPosts(request),
            };
            let started = api.begin(call);
            if let Some(delay) = api.page_delay(operation, request.page) {
                tokio::time::sleep(delay).await;
            }
            started?;

            let inner = api.lock();
            let posts = match operation {
                PostsOperation::MyPosts => &inner.mine,
                _ => &inner.all,
            };
            Ok(Self::page_of(posts, request))
        }
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound {
        message: "Post not found".to_string(),
    }
}

impl PostsApi for MockPostsApi {
    fn list_posts(&self, request: PageRequest) -> impl Future<Output = Result<PostPage>> + Send {
        self.list(PostsOperation::ListPosts, request)
    }

    fn my_posts(&self, request: PageRequest) -> impl Future<Output = Result<PostPage>> + Send {
        self.list(PostsOperation::MyPosts, request)
    }

    fn get_post(&self, id: PostId) -> impl Future<Output = Result<Post>> + Send {
        let api = self.clone();
        async move {
            api.begin(PostsCall::GetPost(id.clone()))?;
            api.lock()
                .all
                .iter()
                .find(|post| post.id == id)
                .cloned()
                .ok_or_else(not_found)
        }
    }

    fn create_post(&self, draft: PostDraft) -> impl Future<Output = Result<Option<Post>>> + Send {
        let api = self.clone();
        async move {
            api.begin(PostsCall::CreatePost(draft.clone()))?;
            let mut inner = api.lock();
            let next_id = inner
                .all
                .iter()
                .filter_map(|post| post.id.as_str().parse::<u64>().ok())
                .max()
                .unwrap_or(0)
                + 1;

            let mut post = Self::sample_post(next_id, "me");
            post.title = draft.title;
            post.content = draft.content;
            inner.all.push(post.clone());
            inner.mine.push(post.clone());
            Ok(Some(post))
        }
    }

    fn update_post(
        &self,
        id: PostId,
        draft: PostDraft,
    ) -> impl Future<Output = Result<Option<Post>>> + Send {
        let api = self.clone();
        async move {
            api.begin(PostsCall::UpdatePost(id.clone(), draft.clone()))?;
            let mut guard = api.lock();
            let inner = &mut *guard;
            let mut updated = None;
            for post in inner.all.iter_mut().chain(inner.mine.iter_mut()) {
                if post.id == id {
                    post.title.clone_from(&draft.title);
                    post.content.clone_from(&draft.content);
                    updated = Some(post.clone());
                }
            }
            updated.map(Some).ok_or_else(not_found)
        }
    }

    fn delete_post(&self, id: PostId) -> impl Future<Output = Result<()>> + Send {
        let api = self.clone();
        async move {
            api.begin(PostsCall::DeletePost(id.clone()))?;
            let mut inner = api.lock();
            let before = inner.all.len();
            inner.all.retain(|post| post.id != id);
            inner.mine.retain(|post| post.id != id);
            if inner.all.len() == before {
                return Err(not_found());
            }
            Ok(())
        }
    }
}
