//! Error types for the blog client.
//!
//! Every HTTP or transport failure is converted into exactly one [`ApiError`]
//! at the pipeline boundary. Views match on [`ApiError::kind`], never on raw
//! status codes or response shapes.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Result type alias for session persistence.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Field name to error message, as returned by server-side validation.
pub type FieldErrors = BTreeMap<String, String>;

/// Message shown for 5xx responses that carry no message of their own.
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

/// Message shown when the server cannot be reached.
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Unable to connect to server. Please check if the server is running.";

/// Discriminant of [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network unreachable or timed out
    Transport,
    /// 401 from the server
    Auth,
    /// 400-class response with a field map
    Validation,
    /// 5xx response
    Server,
    /// Entity absent
    NotFound,
    /// Anything else, including plain-message failures
    General,
}

impl ErrorKind {
    /// Stable label used for metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::NotFound => "not_found",
            Self::General => "general",
        }
    }
}

/// The closed error taxonomy of the request pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("{message}")]
    Transport {
        /// Human-readable message
        message: String,
        /// Whether the failure was a timeout
        timed_out: bool,
    },

    /// The server rejected the credentials (HTTP 401).
    #[error("{message}")]
    Unauthorized {
        /// Human-readable message
        message: String,
    },

    /// The server rejected one or more fields.
    #[error("{message}")]
    Validation {
        /// Summary message
        message: String,
        /// Per-field messages
        fields: FieldErrors,
    },

    /// The server failed (HTTP 5xx).
    #[error("{message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Human-readable message
        message: String,
    },

    /// The requested entity does not exist (HTTP 404).
    #[error("{message}")]
    NotFound {
        /// Human-readable message
        message: String,
    },

    /// Any other failure.
    #[error("{message}")]
    General {
        /// Human-readable message
        message: String,
    },
}

impl ApiError {
    /// Build a general error.
    pub fn general(message: impl Into<String>) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Build a transport error.
    pub fn transport(message: impl Into<String>, timed_out: bool) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out,
        }
    }

    /// Convert a non-success HTTP response into the taxonomy.
    ///
    /// `fallback` is used when neither the body nor the status yields a
    /// better message.
    #[must_use]
    pub fn from_response(status: u16, body: &Value, fallback: &str) -> Self {
        let fields = field_errors(body);
        let message = extract_message(body)
            .or_else(|| fields.values().next().cloned())
            .unwrap_or_else(|| {
                if status >= 500 {
                    SERVER_ERROR_MESSAGE.to_string()
                } else {
                    fallback.to_string()
                }
            });

        match status {
            401 => Self::Unauthorized { message },
            404 => Self::NotFound { message },
            400 | 422 if !fields.is_empty() => Self::Validation { message, fields },
            500..=599 => Self::Server { status, message },
            _ => Self::General { message },
        }
    }

    /// The discriminant tag.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Unauthorized { .. } => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::General { .. } => ErrorKind::General,
        }
    }

    /// Transport and server failures can be retried as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Server { .. })
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message, .. }
            | Self::Unauthorized { message }
            | Self::Validation { message, .. }
            | Self::Server { message, .. }
            | Self::NotFound { message }
            | Self::General { message } => message,
        }
    }

    /// Per-field messages, for validation failures.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Keys that carry a top-level message rather than a field error.
const MESSAGE_KEYS: [&str; 3] = ["error", "message", "detail"];

/// Keys that never name a field.
const RESERVED_KEYS: [&str; 5] = ["error", "message", "detail", "type", "errors"];

/// Pull a message out of `error`, `message` or `detail`, in that order.
///
/// A plain-text body counts as a message.
#[must_use]
pub fn extract_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Object(map) => MESSAGE_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(first_text),
        _ => None,
    }
}

/// Collect per-field messages.
///
/// Accepts `{errors: {field: msg | [msg, ...]}}` and Django-style top-level
/// `{field: [msg, ...]}`. Arrays collapse to their first entry.
#[must_use]
pub fn field_errors(body: &Value) -> FieldErrors {
    let Value::Object(map) = body else {
        return FieldErrors::new();
    };

    if let Some(Value::Object(nested)) = map.get("errors") {
        return nested
            .iter()
            .filter_map(|(field, value)| first_text(value).map(|msg| (field.clone(), msg)))
            .collect();
    }

    map.iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .filter_map(|(field, value)| match value {
            Value::Array(_) => first_text(value).map(|msg| (field.clone(), msg)),
            _ => None,
        })
        .collect()
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

/// Errors from session persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Session storage I/O failed at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The stored document could not be parsed.
    #[error("Session storage is corrupted: {0}")]
    Corrupted(String),

    /// A value could not be serialized.
    #[error("Failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backend refuses writes.
    #[error("Session storage is read-only")]
    ReadOnly,
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        Self::general(format!("Unable to save session: {error}"))
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The base URL does not parse.
    #[error("Invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// Offending value
        url: String,
        /// Parser message
        reason: String,
    },

    /// The base URL is not http or https.
    #[error("Unsupported URL scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    /// A numeric variable did not parse.
    #[error("Invalid value {value:?} for {var}")]
    InvalidNumber {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// Page size must be positive.
    #[error("per_page must be greater than zero")]
    ZeroPerPage,

    /// Login must have a bounded, non-zero wait.
    #[error("login_timeout must be greater than zero")]
    ZeroLoginTimeout,

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_priority() {
        let body = json!({"detail": "d", "message": "m", "error": "e"});
        assert_eq!(extract_message(&body).as_deref(), Some("e"));

        let body = json!({"detail": "d", "message": "m"});
        assert_eq!(extract_message(&body).as_deref(), Some("m"));

        let body = json!({"detail": "d"});
        assert_eq!(extract_message(&body).as_deref(), Some("d"));

        assert_eq!(extract_message(&json!("plain text")).as_deref(), Some("plain text"));
        assert_eq!(extract_message(&json!(null)), None);
    }

    #[test]
    fn test_nested_field_errors() {
        let body = json!({"type": "validation", "errors": {"title": "too short", "content": ["required", "x"]}});
        let fields = field_errors(&body);
        assert_eq!(fields.get("title").map(String::as_str), Some("too short"));
        assert_eq!(fields.get("content").map(String::as_str), Some("required"));
    }

    #[test]
    fn test_django_field_errors() {
        let body = json!({"username": ["A user with that username already exists."], "status": "error"});
        let fields = field_errors(&body);
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("username"));
    }

    #[test]
    fn test_validation_from_400() {
        let err = ApiError::from_response(
            400,
            &json!({"errors": {"title": "too short"}}),
            "Failed to create post",
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "too short");
        assert_eq!(err.field_errors().map(FieldErrors::len), Some(1));
    }

    #[test]
    fn test_400_without_fields_is_general() {
        let err = ApiError::from_response(400, &json!({"message": "Bad"}), "Failed to create post");
        assert_eq!(err, ApiError::general("Bad"));
    }

    #[test]
    fn test_server_error_uses_generic_message() {
        let err = ApiError::from_response(503, &Value::Null, "Failed to fetch posts");
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.message(), SERVER_ERROR_MESSAGE);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_fallback_and_kinds() {
        let err = ApiError::from_response(404, &json!({}), "Failed to fetch post");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Failed to fetch post");
        assert!(!err.is_retryable());

        let err = ApiError::from_response(401, &json!({"detail": "Token expired"}), "x");
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.to_string(), "Token expired");

        let err = ApiError::from_response(403, &json!({}), "Failed to delete post");
        assert_eq!(err.kind(), ErrorKind::General);
    }

    #[test]
    fn test_transport_is_retryable() {
        let err = ApiError::transport(CONNECTION_ERROR_MESSAGE, false);
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
        assert_eq!(err.kind().as_str(), "transport");
    }
}
