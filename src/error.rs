use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single problem found while validating configuration or a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Unified error type for qbit-janitor.
#[derive(Error, Debug, Clone)]
pub enum JanitorError {
    /// Entity not found (file, folder, torrent)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Permission denied, including rejected API credentials
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    TimedOut(String),

    /// Network error - connection refused, reset, DNS failure
    #[error("Network error: {0}")]
    NetworkError(String),

    /// API returned error with HTTP status code
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Validation error with one entry per failed check
    #[error("Validation error: {}", .0.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; "))]
    ValidationError(Vec<ValidationIssue>),

    /// Parse/serialization error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A snapshot file exists but cannot be decoded
    #[error("Cache file {} is corrupted: {message}", .path.display())]
    CacheCorrupted { path: PathBuf, message: String },

    /// Is a directory
    #[error("Is a directory")]
    IsDirectory,

    /// Not a directory
    #[error("Not a directory")]
    NotDirectory,
}

impl JanitorError {
    /// Shorthand for a validation failure on a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        JanitorError::ValidationError(vec![ValidationIssue::new(field, message)])
    }

    /// Check if this error is transient and retryable
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            JanitorError::TimedOut(_)
                | JanitorError::NetworkError(_)
                | JanitorError::ApiError {
                    status: 408 | 429 | 502 | 503 | 504,
                    ..
                }
        )
    }

    /// Check if this error indicates the download client is unavailable
    pub fn is_server_unavailable(&self) -> bool {
        matches!(
            self,
            JanitorError::TimedOut(_) | JanitorError::NetworkError(_)
        )
    }
}

// === Conversion Implementations ===

macro_rules! impl_from_error {
    ($err_type:ty, $arm:pat => $body:expr) => {
        impl From<$err_type> for JanitorError {
            fn from(err: $err_type) -> Self {
                match err {
                    $arm => $body,
                }
            }
        }
    };
}

impl_from_error!(std::io::Error, e => match e.kind() {
    std::io::ErrorKind::NotFound => JanitorError::NotFound(e.to_string()),
    std::io::ErrorKind::PermissionDenied => JanitorError::PermissionDenied(e.to_string()),
    std::io::ErrorKind::TimedOut => JanitorError::TimedOut(e.to_string()),
    std::io::ErrorKind::InvalidInput => JanitorError::InvalidArgument(e.to_string()),
    _ => JanitorError::IoError(e.to_string()),
});

impl_from_error!(reqwest::Error, e => if e.is_timeout() {
    JanitorError::TimedOut(e.to_string())
} else if e.is_connect() {
    JanitorError::NetworkError(format!("Server disconnected: {}", e))
} else if e.is_request() {
    JanitorError::NetworkError(e.to_string())
} else if e.is_decode() {
    JanitorError::ParseError(e.to_string())
} else {
    JanitorError::IoError(format!("HTTP error: {}", e))
});

impl_from_error!(serde_json::Error, e => JanitorError::ParseError(e.to_string()));
impl_from_error!(toml::de::Error, e => JanitorError::ParseError(e.to_string()));

/// Result type alias for operations that can fail with JanitorError.
pub type JanitorResult<T> = Result<T, JanitorError>;
