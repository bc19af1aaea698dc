//! Stream playback
//!
//! The [`PlaybackController`] owns the single active session. Collaborators
//! (an [`AdaptiveEngine`] for HLS streams and a [`MediaSurface`] that renders
//! everything) report back through an [`EventSink`]: every event is tagged
//! with the session generation it was issued for and delivered over one
//! channel, so events from a torn-down session are recognised and dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

pub mod controller;
pub mod engine;
pub mod external;
pub mod surface;

pub use controller::{ControllerConfig, PlaybackController, backoff_delay};
pub use engine::{AdaptiveEngine, EngineConfig, EngineFactory, UnsupportedEngineFactory};
pub use external::ExternalPlayer;
pub use surface::MediaSurface;

/// Category of a fault reported by the adaptive engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// Manifest or fragment could not be fetched
    Network,
    /// Decoding or buffer append failed
    Media,
    Other,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Network => write!(f, "network"),
            FaultKind::Media => write!(f, "media"),
            FaultKind::Other => write!(f, "other"),
        }
    }
}

/// Events raised by the adaptive engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ManifestParsed,
    Fault {
        fatal: bool,
        kind: FaultKind,
        details: String,
    },
    /// Buffer starvation
    BufferStalled,
}

/// Events raised by the player surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    MetadataLoaded,
    Error { details: String },
    /// The surface finished playing on its own
    Ended,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Engine(EngineEvent),
    Surface(SurfaceEvent),
    /// A scheduled retry has become due
    RetryDue,
}

/// Event tagged with the session generation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub generation: u64,
    pub event: PlayerEvent,
}

/// Session-scoped subscription handed to engines and surfaces
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::UnboundedSender<SessionEvent>,
    generation: u64,
}

impl EventSink {
    pub fn new(sender: mpsc::UnboundedSender<SessionEvent>, generation: u64) -> Self {
        Self { sender, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn emit(&self, event: PlayerEvent) {
        let tagged = SessionEvent {
            generation: self.generation,
            event,
        };
        if self.sender.send(tagged).is_err() {
            debug!("Dropping event for session {}: controller is gone", self.generation);
        }
    }

    pub fn engine(&self, event: EngineEvent) {
        self.emit(PlayerEvent::Engine(event));
    }

    pub fn surface(&self, event: SurfaceEvent) {
        self.emit(PlayerEvent::Surface(event));
    }
}
