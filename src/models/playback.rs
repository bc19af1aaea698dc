use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the active playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    #[default]
    Idle,
    Loading,
    Playing,
    Error,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Idle => write!(f, "idle"),
            StreamState::Loading => write!(f, "loading"),
            StreamState::Playing => write!(f, "playing"),
            StreamState::Error => write!(f, "error"),
        }
    }
}

/// State plus the message shown next to the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub state: StreamState,
    pub message: String,
}

impl StreamStatus {
    pub fn new<S: Into<String>>(state: StreamState, message: S) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

impl Default for StreamStatus {
    fn default() -> Self {
        Self::new(StreamState::Idle, "Ready")
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.state, self.message)
    }
}
