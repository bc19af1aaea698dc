//! Centralized error handling for the IPTV viewer
//!
//! This module provides the error types shared by every layer of the viewer,
//! from playlist fetching through to stream playback.
//!
//! # Error Categories
//!
//! - **Source Errors**: playlist fetching (HTTP status, timeouts, transport faults)
//! - **Storage Errors**: durable key/value storage, including quota faults
//! - **Playback Errors**: engine and player surface failures, exhausted retries
//! - **Application Errors**: empty playlists, invalid input, busy loads
//!
//! Parse-level problems are not errors: they are collected as
//! [`ParseWarning`](crate::sources::ParseWarning)s and parsing continues.
//!
//! # Usage
//!
//! ```rust
//! use iptv_viewer::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::validation("playlist URL must not be empty"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for Storage Results
pub type StorageResult<T> = Result<T, StorageError>;

/// Convenience type alias for Playback Results
pub type PlaybackResult<T> = Result<T, PlaybackError>;
