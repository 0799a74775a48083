//! The server's endpoint table.

use crate::models::PostId;
use reqwest::Method;

/// One remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /auth/login/`
    Login,
    /// `POST /auth/register/`
    Register,
    /// `GET /posts/`
    ListPosts,
    /// `GET /posts/my-posts/`
    MyPosts,
    /// `GET /posts/{id}/`
    GetPost(PostId),
    /// `POST /posts/create/`
    CreatePost,
    /// `PUT /posts/{id}/update/`
    UpdatePost(PostId),
    /// `DELETE /posts/{id}/delete/`
    DeletePost(PostId),
}

impl Endpoint {
    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::Login | Self::Register | Self::CreatePost => Method::POST,
            Self::ListPosts | Self::MyPosts | Self::GetPost(_) => Method::GET,
            Self::UpdatePost(_) => Method::PUT,
            Self::DeletePost(_) => Method::DELETE,
        }
    }

    /// Path relative to the API base URL.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => "auth/login/".to_string(),
            Self::Register => "auth/register/".to_string(),
            Self::ListPosts => "posts/".to_string(),
            Self::MyPosts => "posts/my-posts/".to_string(),
            Self::GetPost(id) => format!("posts/{id}/"),
            Self::CreatePost => "posts/create/".to_string(),
            Self::UpdatePost(id) => format!("posts/{id}/update/"),
            Self::DeletePost(id) => format!("posts/{id}/delete/"),
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::ListPosts => "list_posts",
            Self::MyPosts => "my_posts",
            Self::GetPost(_) => "get_post",
            Self::CreatePost => "create_post",
            Self::UpdatePost(_) => "update_post",
            Self::DeletePost(_) => "delete_post",
        }
    }

    /// Login and register never carry a bearer token.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// Message used when a failed response carries none of its own.
    #[must_use]
    pub const fn fallback_message(&self, status: u16) -> &'static str {
        match (self, status) {
            (Self::Login, 401) => "Invalid username or password",
            (Self::Login, 400) => "Username and password are required",
            (Self::Login, _) => "Login failed",
            (Self::Register, _) => "Registration failed",
            (Self::ListPosts | Self::MyPosts, _) => "Failed to fetch posts",
            (Self::GetPost(_), 404) => "Post not found",
            (Self::GetPost(_), _) => "Failed to fetch post",
            (Self::CreatePost, _) => "Failed to create post",
            (Self::UpdatePost(_), _) => "Failed to update post",
            (Self::DeletePost(_), _) => "Failed to delete post",
        }
    }
}
