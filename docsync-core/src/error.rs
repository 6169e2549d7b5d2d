//! Error types for docsync-core.
//!
//! Only genuine failures live here. A mapping miss, a cache miss or a
//! rejected conversion are ordinary outcomes and are reported through
//! [`crate::report::FileOutcome`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using docsync-core's error type.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while synchronising documentation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or HTTP failure talking to an external service.
    #[error("{service} transport error{}: {body}", status_suffix(.status))]
    Transport {
        service: String,
        status: Option<u16>,
        body: String,
    },

    /// A response did not contain the expected structured payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing credentials or unusable run configuration.
    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),

    /// The mapping table is malformed.
    #[error("Mapping table error: {0}")]
    Mapping(String),

    /// Local filesystem failure.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl SyncError {
    /// Create a transport error.
    pub fn transport(service: impl Into<String>, status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    /// Create an I/O error bound to the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a generation request failing with this error may be retried.
    ///
    /// Connection failures (no status), rate limiting (429), overload (529)
    /// and server errors (5xx) are retryable. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { status: None, .. } => true,
            SyncError::Transport {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }

    /// HTTP status carried by a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(SyncError::transport("llm", None, "connection reset").is_retryable());
        assert!(SyncError::transport("llm", Some(429), "slow down").is_retryable());
        assert!(SyncError::transport("llm", Some(529), "overloaded").is_retryable());
        assert!(SyncError::transport("llm", Some(503), "unavailable").is_retryable());
        assert!(!SyncError::transport("llm", Some(400), "bad request").is_retryable());
        assert!(!SyncError::transport("llm", Some(401), "unauthorized").is_retryable());
        assert!(!SyncError::Parse("no json".into()).is_retryable());
    }

    #[test]
    fn transport_display_includes_status() {
        let err = SyncError::transport("anthropic", Some(500), "boom");
        assert_eq!(err.to_string(), "anthropic transport error (HTTP 500): boom");
        let err = SyncError::transport("anthropic", None, "timeout");
        assert_eq!(err.to_string(), "anthropic transport error: timeout");
    }
}
