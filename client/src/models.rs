//! Domain models shared by the pipeline, the session and the views.
//!
//! The server is loose about shapes: ids arrive as numbers or strings,
//! authors as objects or bare names, timestamps under several keys. The
//! types here absorb that variance at deserialization time so the rest of
//! the client sees one shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Fallback shown when a post has no usable author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

macro_rules! flexible_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw id.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The id as text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Int(i64),
                    Text(String),
                }

                match Raw::deserialize(deserializer)? {
                    Raw::Int(n) => Ok(Self(n.to_string())),
                    Raw::Text(s) if !s.trim().is_empty() => Ok(Self(s.trim().to_string())),
                    Raw::Text(_) => Err(serde::de::Error::custom("empty id")),
                }
            }
        }
    };
}

flexible_id!(
    /// Server-assigned post id (integer or string on the wire).
    PostId
);

flexible_id!(
    /// Server-assigned user id (integer or string on the wire).
    UserId
);

/// The authenticated user as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Server id, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Email, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    /// Identity with a username only.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: None,
        }
    }

    /// Attach a server id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<UserId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Author of a post: a nested user object or a bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    /// Nested user object
    User(UserIdentity),
    /// Bare display name
    Name(String),
}

impl Author {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::Name(name)),
            Value::Object(_) => serde_json::from_value(value).ok().map(Self::User),
            _ => None,
        }
    }
}

/// Wire shape of a post before field aliases are resolved.
#[derive(Deserialize)]
struct RawPost {
    id: PostId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    author: Value,
    #[serde(default, alias = "authorId")]
    author_id: Option<UserId>,
    #[serde(default, alias = "createdAt", alias = "created")]
    created_at: Option<String>,
    #[serde(default, alias = "updatedAt")]
    updated_at: Option<String>,
    #[serde(default, alias = "isPublished", alias = "published")]
    is_published: Option<bool>,
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawPost")]
pub struct Post {
    /// Server id
    pub id: PostId,
    /// Title
    pub title: String,
    /// Body text
    pub content: String,
    /// Author, when the server reported a usable one
    pub author: Option<Author>,
    /// Flat author id, when the server reported one
    pub author_id: Option<UserId>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    pub updated_at: Option<DateTime<Utc>>,
    /// Published flag; absent on the wire means published
    pub is_published: bool,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            content: raw.content,
            author: Author::from_value(raw.author),
            author_id: raw.author_id,
            created_at: raw.created_at.as_deref().and_then(parse_timestamp),
            updated_at: raw.updated_at.as_deref().and_then(parse_timestamp),
            is_published: raw.is_published.unwrap_or(true),
        }
    }
}

impl Post {
    /// Name to show for the author.
    #[must_use]
    pub fn author_name(&self) -> &str {
        let name = match &self.author {
            Some(Author::User(user)) => user.username.as_str(),
            Some(Author::Name(name)) => name.as_str(),
            None => "",
        };
        if name.trim().is_empty() {
            UNKNOWN_AUTHOR
        } else {
            name
        }
    }

    /// Whether `user` wrote this post.
    ///
    /// Matches on the nested author id, the nested author username, or the
    /// flat `author_id`.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserIdentity) -> bool {
        let ids_match = |id: &Option<UserId>| id.is_some() && *id == user.id;

        if let Some(Author::User(author)) = &self.author {
            if ids_match(&author.id) {
                return true;
            }
            if !author.username.is_empty() && author.username == user.username {
                return true;
            }
        }
        ids_match(&self.author_id)
    }

    /// Content cut to `max_chars` characters, with `...` when truncated.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.content.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.content[..cut]),
            None => self.content.clone(),
        }
    }
}

/// Parse RFC 3339, falling back to a zone-less timestamp read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Title and content submitted by the post form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    /// Title
    pub title: String,
    /// Body text
    pub content: String,
}

impl PostDraft {
    /// Build a draft with both fields trimmed.
    #[must_use]
    pub fn trimmed(title: &str, content: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }

    /// Both fields are non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.content.is_empty()
    }
}

/// A page request for a post listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub per_page: u32,
}

impl PageRequest {
    /// Build a request, clamping page to at least 1 and size to at least 1.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }
}

/// Pagination metadata for one page of posts.
///
/// `has_next` and `has_previous` are always derived from `page` and `pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page, 1-based
    pub page: u32,
    /// Number of pages
    pub pages: u32,
    /// Page size
    pub per_page: u32,
    /// Total number of posts across pages
    pub total: u32,
    /// A later page exists
    pub has_next: bool,
    /// An earlier page exists
    pub has_previous: bool,
}

impl Pagination {
    /// Page 1 of 1 with nothing in it.
    #[must_use]
    pub fn empty(per_page: u32) -> Self {
        Self::derive(1, 1, per_page, 0)
    }

    /// Everything on one page.
    #[must_use]
    pub fn single_page(count: usize, per_page: u32) -> Self {
        Self::derive(1, 1, per_page, u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Read a server pagination object.
    ///
    /// Accepts `pages`/`total_pages`/`num_pages`, `per_page`/`perPage`/
    /// `page_size` and `total`/`count`. Missing counts are inferred; the
    /// page is clamped into `[1, pages]`.
    #[must_use]
    pub fn from_server(value: &Value, fallback_per_page: u32) -> Self {
        let number = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| value.get(*key))
                .find_map(Value::as_u64)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        };

        let page = number(&["page", "current_page"]).unwrap_or(1).max(1);
        let per_page = number(&["per_page", "perPage", "page_size"])
            .filter(|n| *n > 0)
            .unwrap_or_else(|| fallback_per_page.max(1));
        let total = number(&["total", "count", "total_count"]).unwrap_or(0);
        let pages = number(&["pages", "total_pages", "num_pages"])
            .unwrap_or_else(|| page_count(total, per_page));

        let page = if pages == 0 { 1 } else { page.min(pages) };
        Self::derive(page, pages, per_page, total)
    }

    /// Account for one post removed locally.
    ///
    /// Decrements `total` and recomputes `pages` (never below 1). The page
    /// is clamped into the new range so `1 <= page <= pages` still holds.
    pub fn record_removal(&mut self) {
        let total = self.total.saturating_sub(1);
        let pages = page_count(total, self.per_page).max(1);
        *self = Self::derive(self.page.min(pages), pages, self.per_page, total);
    }

    /// Whether `page` is a valid target.
    #[must_use]
    pub const fn contains(&self, page: u32) -> bool {
        page >= 1 && page <= self.pages
    }

    const fn derive(page: u32, pages: u32, per_page: u32, total: u32) -> Self {
        Self {
            page,
            pages,
            per_page,
            total,
            has_next: page < pages,
            has_previous: page > 1,
        }
    }
}

fn page_count(total: u32, per_page: u32) -> u32 {
    total.div_ceil(per_page.max(1))
}

/// One page of posts with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPage {
    /// Posts in server order
    pub posts: Vec<Post>,
    /// Metadata
    pub pagination: Pagination,
}

/// Token plus user, held together so neither exists without the other.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Signed-in user
    pub user: UserIdentity,
    /// Bearer token
    pub token: String,
}

impl Credentials {
    /// Pair a user with a token.
    pub fn new(user: UserIdentity, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Registration {
    /// Created user, when the server echoes it
    pub user: Option<UserIdentity>,
    /// Server message, when present
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_aliases_and_defaults() {
        let post: Post = serde_json::from_value(json!({
            "id": 7,
            "title": "Hello",
            "content": "World",
            "author": {"id": 3, "username": "ada"},
            "createdAt": "2025-01-02T03:04:05Z",
        }))
        .unwrap();

        assert_eq!(post.id, PostId::from(7));
        assert!(post.is_published);
        assert_eq!(post.author_name(), "ada");
        assert_eq!(post.created_at.map(|t| t.to_rfc3339()).as_deref(), Some("2025-01-02T03:04:05+00:00"));
    }

    #[test]
    fn test_string_author_and_draft_flag() {
        let post: Post = serde_json::from_value(json!({
            "id": "abc",
            "title": "t",
            "content": "c",
            "author": "grace",
            "published": false,
            "created": "2025-01-02T03:04:05.123456",
        }))
        .unwrap();

        assert_eq!(post.author, Some(Author::Name("grace".into())));
        assert!(!post.is_published);
        assert!(post.created_at.is_some());
    }

    #[test]
    fn test_unknown_author() {
        let post: Post = serde_json::from_value(json!({"id": 1, "author": null})).unwrap();
        assert_eq!(post.author_name(), UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_ownership() {
        let me = UserIdentity::named("ada").with_id(3);

        let by_id: Post = serde_json::from_value(json!({"id": 1, "author": {"id": 3}})).unwrap();
        let by_name: Post =
            serde_json::from_value(json!({"id": 2, "author": {"username": "ada"}})).unwrap();
        let by_flat: Post =
            serde_json::from_value(json!({"id": 3, "author": "someone", "author_id": "3"})).unwrap();
        let other: Post =
            serde_json::from_value(json!({"id": 4, "author": {"id": 9, "username": "bob"}}))
                .unwrap();

        assert!(by_id.is_owned_by(&me));
        assert!(by_name.is_owned_by(&me));
        assert!(by_flat.is_owned_by(&me));
        assert!(!other.is_owned_by(&me));
        assert!(!other.is_owned_by(&UserIdentity::named("")));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let mut post: Post = serde_json::from_value(json!({"id": 1})).unwrap();
        post.content = "é".repeat(160);
        let excerpt = post.excerpt(150);
        assert_eq!(excerpt.chars().count(), 153);
        assert!(excerpt.ends_with("..."));

        post.content = "short".into();
        assert_eq!(post.excerpt(150), "short");
    }

    #[test]
    fn test_pagination_from_server() {
        let p = Pagination::from_server(
            &json!({"page": 2, "pages": 3, "total": 25, "has_next": true, "has_previous": true}),
            10,
        );
        assert_eq!((p.page, p.pages, p.total), (2, 3, 25));
        assert!(p.has_next && p.has_previous);

        let p = Pagination::from_server(&json!({"page": 9, "count": 12, "page_size": 5}), 10);
        assert_eq!((p.page, p.pages, p.per_page), (3, 3, 5));
        assert!(!p.has_next);
    }

    #[test]
    fn test_record_removal_recomputes_pages() {
        let mut p = Pagination::from_server(&json!({"page": 2, "pages": 2, "total": 11, "per_page": 10}), 10);
        p.record_removal();
        assert_eq!((p.page, p.pages, p.total), (1, 1, 10));
        assert!(!p.has_next && !p.has_previous);

        let mut p = Pagination::from_server(&json!({"page": 1, "pages": 3, "total": 25, "per_page": 10}), 10);
        p.record_removal();
        assert_eq!((p.page, p.pages, p.total), (1, 3, 24));

        let mut empty = Pagination::empty(10);
        empty.record_removal();
        assert_eq!((empty.pages, empty.total), (1, 0));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = Credentials::new(UserIdentity::named("ada"), "secret-token");
        assert!(!format!("{creds:?}").contains("secret-token"));
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, per_page: 1 });
    }
}
