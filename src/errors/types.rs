//! Error type definitions for the IPTV viewer
//!
//! This module defines all error types used throughout the viewer,
//! providing a hierarchical error system so that each layer can recover
//! locally where the unit of failure is small and surface status text
//! where it is not.

use thiserror::Error;

use crate::playback::FaultKind;

/// Top-level application error type
///
/// This enum represents every failure that can reach the application layer.
/// None of them are fatal to the process: the application turns them into
/// status text and returns to a recoverable state.
#[derive(Error, Debug)]
pub enum AppError {
    /// Playlist source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Durable storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Playback errors
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// A playlist parsed successfully but produced no channels
    #[error("No valid channels found in the playlist file: {url}")]
    EmptyPlaylist { url: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Operation already in progress errors
    #[error("Operation already in progress: {operation_type} on {resource}")]
    OperationInProgress {
        operation_type: String,
        resource: String,
    },
}

/// Playlist source specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network request timed out
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Non-success HTTP status from the playlist host
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (DNS, refused connection, TLS, ...)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Body could not be decoded into playlist text
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// The playlist location itself is not a usable URL
    #[error("Invalid playlist URL: {url}")]
    InvalidUrl { url: String },
}

/// Durable key/value storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would exceed the storage capacity ceiling
    #[error("Storage quota exceeded: {requested} bytes requested, {available} bytes available")]
    QuotaExceeded { requested: usize, available: usize },

    /// Underlying filesystem failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted document could not be (de)serialized
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Playback specific errors
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Fault reported by the playback engine or player surface
    #[error("Playback fault ({kind}): {details}")]
    Fault { kind: FaultKind, details: String },

    /// Retry budget exhausted for a channel
    #[error("Failed to play {channel}. Max retries reached ({attempts})")]
    RetryExhausted { channel: String, attempts: u32 },

    /// The adaptive engine could not be created
    #[error("Playback engine unavailable: {message}")]
    EngineUnavailable { message: String },

    /// The player surface refused an operation
    #[error("Player surface error: {message}")]
    Surface { message: String },

    /// Autoplay was refused; the user must start playback
    #[error("Autoplay prevented: {message}")]
    AutoplayBlocked { message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an operation in progress error
    pub fn operation_in_progress<O: Into<String>, R: Into<String>>(
        operation_type: O,
        resource: R,
    ) -> Self {
        Self::OperationInProgress {
            operation_type: operation_type.into(),
            resource: resource.into(),
        }
    }

    /// Create an empty playlist error
    pub fn empty_playlist<S: Into<String>>(url: S) -> Self {
        Self::EmptyPlaylist { url: url.into() }
    }

    /// Message suitable for the status line, without the category prefix
    pub fn status_message(&self) -> String {
        match self {
            Self::Source(e) => e.to_string(),
            Self::Storage(e) => e.to_string(),
            Self::Playback(e) => e.to_string(),
            Self::EmptyPlaylist { .. } => "No valid channels found in the playlist file.".to_string(),
            other => other.to_string(),
        }
    }
}

impl SourceError {
    /// Create an HTTP status error
    pub fn http<M: Into<String>>(status: u16, message: M) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Decode { .. } | Self::InvalidUrl { .. } => false,
        }
    }
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl PlaybackError {
    /// Create a surface error
    pub fn surface<M: Into<String>>(message: M) -> Self {
        Self::Surface {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_retryable() {
        assert!(SourceError::Timeout { url: "http://a".into() }.is_retryable());
        assert!(SourceError::network("connection refused").is_retryable());
        assert!(SourceError::http(503, "Service Unavailable").is_retryable());
        assert!(SourceError::http(429, "Too Many Requests").is_retryable());
        assert!(!SourceError::http(404, "Not Found").is_retryable());
        assert!(!SourceError::InvalidUrl { url: "x".into() }.is_retryable());
    }

    #[test]
    fn test_status_message_strips_category() {
        let err = AppError::from(SourceError::http(404, "Not Found"));
        assert_eq!(err.status_message(), "HTTP error: 404 - Not Found");

        let empty = AppError::empty_playlist("http://example.com/a.m3u");
        assert_eq!(
            empty.status_message(),
            "No valid channels found in the playlist file."
        );
    }

    #[test]
    fn test_quota_detection() {
        let quota = StorageError::QuotaExceeded {
            requested: 10,
            available: 2,
        };
        assert!(quota.is_quota_exceeded());
        let io = StorageError::Io(std::io::Error::other("disk"));
        assert!(!io.is_quota_exceeded());
    }
}
