//! Response-shape normalization.
//!
//! All shape sniffing for server responses lives here. Callers get a tagged
//! result and never look at raw JSON themselves.

use crate::models::{Credentials, Pagination, Post, PostPage, Registration, UserIdentity};
use serde_json::Value;

/// Recognized shapes of a post listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostListing {
    /// A bare array of posts.
    ListOfPosts(Vec<Post>),
    /// `{posts: [...], pagination: {...}}`.
    EnvelopeWithPagination {
        /// Posts in server order
        posts: Vec<Post>,
        /// Server metadata
        pagination: Pagination,
    },
    /// Anything else.
    Unrecognized,
}

impl PostListing {
    /// Collapse into a page.
    ///
    /// A bare list is one page; an unrecognized shape is an empty page 1 of 1.
    #[must_use]
    pub fn into_page(self, per_page: u32) -> PostPage {
        match self {
            Self::ListOfPosts(posts) => PostPage {
                pagination: Pagination::single_page(posts.len(), per_page),
                posts,
            },
            Self::EnvelopeWithPagination { posts, pagination } => PostPage { posts, pagination },
            Self::Unrecognized => PostPage {
                posts: Vec::new(),
                pagination: Pagination::empty(per_page),
            },
        }
    }
}

/// Classify a post listing response.
///
/// An object with a `posts` array but no `pagination` object is treated as a
/// bare list. Items that fail to parse are skipped.
#[must_use]
pub fn normalize_post_list(body: &Value, per_page: u32) -> PostListing {
    match body {
        Value::Array(items) => PostListing::ListOfPosts(parse_posts(items)),
        Value::Object(map) => match (map.get("posts"), map.get("pagination")) {
            (Some(Value::Array(items)), Some(meta @ Value::Object(_))) => {
                PostListing::EnvelopeWithPagination {
                    posts: parse_posts(items),
                    pagination: Pagination::from_server(meta, per_page),
                }
            },
            (Some(Value::Array(items)), _) => PostListing::ListOfPosts(parse_posts(items)),
            _ => {
                tracing::debug!("Unrecognized post listing shape");
                PostListing::Unrecognized
            },
        },
        _ => {
            tracing::debug!("Unrecognized post listing shape");
            PostListing::Unrecognized
        },
    }
}

fn parse_posts(items: &[Value]) -> Vec<Post> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Post>(item.clone()) {
            Ok(post) => Some(post),
            Err(error) => {
                tracing::warn!(index, error = %error, "Skipping malformed post in listing");
                None
            },
        })
        .collect()
}

/// Extract a single post from `Post`, `{post: Post}` or `{data: Post}`.
#[must_use]
pub fn normalize_post(body: &Value) -> Option<Post> {
    let candidate = ["post", "data"]
        .iter()
        .find_map(|key| body.get(*key).filter(|inner| inner.is_object()))
        .unwrap_or(body);

    serde_json::from_value(candidate.clone())
        .map_err(|error| tracing::debug!(error = %error, "Response is not a post"))
        .ok()
}

/// Extract `{user, token}` from a login or register response.
#[must_use]
pub fn normalize_credentials(body: &Value) -> Option<Credentials> {
    let token = body.get("token")?.as_str()?.trim();
    if token.is_empty() {
        return None;
    }
    let user = parse_user(body.get("user")?)?;
    Some(Credentials::new(user, token))
}

/// Interpret a successful register response.
#[must_use]
pub fn normalize_registration(body: &Value) -> Registration {
    Registration {
        user: body.get("user").and_then(parse_user),
        message: body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn parse_user(value: &Value) -> Option<UserIdentity> {
    serde_json::from_value::<UserIdentity>(value.clone())
        .ok()
        .filter(|user| !user.username.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostId;
    use serde_json::json;

    fn post(id: u64) -> Value {
        json!({"id": id, "title": format!("t{id}"), "content": "c", "author": "a"})
    }

    #[test]
    fn test_bare_array_is_single_page() {
        let page = normalize_post_list(&json!([post(1), post(2)]), 10).into_page(10);
        assert_eq!(page.posts.len(), 2);
        assert_eq!((page.pagination.page, page.pagination.pages, page.pagination.total), (1, 1, 2));
    }

    #[test]
    fn test_envelope_with_pagination() {
        let body = json!({
            "posts": [post(1), post(2), post(3)],
            "pagination": {"page": 2, "pages": 3, "total": 25, "has_next": true, "has_previous": true}
        });
        let listing = normalize_post_list(&body, 10);
        assert!(matches!(listing, PostListing::EnvelopeWithPagination { .. }));

        let page = listing.into_page(10);
        assert_eq!(page.posts.len(), 3);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_previous);
    }

    #[test]
    fn test_unrecognized_shapes_become_empty_page() {
        for body in [json!({"items": []}), json!("nope"), json!(null), json!({"posts": "x"})] {
            let listing = normalize_post_list(&body, 10);
            assert_eq!(listing, PostListing::Unrecognized);
            let page = listing.into_page(10);
            assert!(page.posts.is_empty());
            assert_eq!((page.pagination.page, page.pagination.pages, page.pagination.total), (1, 1, 0));
        }
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let body = json!([post(1), {"title": "no id"}, 42, post(4)]);
        let PostListing::ListOfPosts(posts) = normalize_post_list(&body, 10) else {
            unreachable!("array must be a list");
        };
        let ids: Vec<_> = posts.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![PostId::from(1), PostId::from(4)]);
    }

    #[test]
    fn test_single_post_shapes() {
        for body in [post(5), json!({"post": post(5)}), json!({"data": post(5)})] {
            assert_eq!(normalize_post(&body).map(|p| p.id), Some(PostId::from(5)));
        }
        assert_eq!(normalize_post(&json!({"message": "gone"})), None);
    }

    #[test]
    fn test_credentials() {
        let creds = normalize_credentials(&json!({"token": "abc", "user": {"id": 1, "username": "ada"}}));
        assert_eq!(creds.map(|c| c.user.username), Some("ada".to_string()));

        assert!(normalize_credentials(&json!({"token": "abc"})).is_none());
        assert!(normalize_credentials(&json!({"token": "", "user": {"username": "ada"}})).is_none());
        assert!(normalize_credentials(&json!({"token": "abc", "user": {"id": 1}})).is_none());
    }

    #[test]
    fn test_registration() {
        let reg = normalize_registration(&json!({"message": "ok", "user": {"username": "ada"}}));
        assert_eq!(reg.message.as_deref(), Some("ok"));
        assert_eq!(reg.user.map(|u| u.username), Some("ada".into()));
        assert_eq!(normalize_registration(&json!({})), Registration::default());
    }
}
