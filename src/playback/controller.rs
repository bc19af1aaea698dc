//! Playback session state machine
//!
//! ```text
//! idle ──select──▶ loading ──ready──▶ playing
//!                    │  ▲                │
//!              fault │  │ retry due      │ fault
//!                    ▼  │                ▼
//!                  (retry path) ◀────────┘
//!                    │
//!          budget    ▼
//!          spent   error ──retry_current──▶ loading
//! ```
//!
//! All transitions happen on the caller's task: engine and surface callbacks
//! arrive as [`SessionEvent`]s and are applied with
//! [`PlaybackController::handle_event`]. Retry timers are detached tasks that
//! post `RetryDue` back onto the same channel.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::engine::{AdaptiveEngine, EngineConfig, EngineFactory};
use super::surface::MediaSurface;
use super::{EngineEvent, EventSink, FaultKind, PlayerEvent, SessionEvent, SurfaceEvent};
use crate::config::PlayerConfig;
use crate::errors::{PlaybackError, PlaybackResult};
use crate::models::{Channel, StreamState, StreamStatus, is_adaptive_url};
use crate::status::StatusBoard;
use crate::utils::retry::{RetryConfig, calculate_delay};

/// Rewind applied when the engine reports buffer starvation, in seconds
pub const STALL_REWIND_SECS: f64 = 0.1;

/// Controller-level playback settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub autoplay: bool,
    pub max_retries: u32,
    /// Base of the exponential retry backoff
    pub retry_delay: Duration,
    pub engine: EngineConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_player(&PlayerConfig::default())
    }
}

impl ControllerConfig {
    pub fn from_player(config: &PlayerConfig) -> Self {
        Self {
            autoplay: config.autoplay,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            engine: config.engine_config(),
        }
    }
}

/// Delay before retry number `attempt`: `base × 2^(attempt-1)`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    calculate_delay(&RetryConfig::exponential(base), attempt)
}

/// Owns the single active playback session
pub struct PlaybackController {
    config: ControllerConfig,
    engines: Arc<dyn EngineFactory>,
    surface: Box<dyn MediaSurface>,
    engine: Option<Box<dyn AdaptiveEngine>>,
    current_channel: Option<Channel>,
    retry_attempts: u32,
    generation: u64,
    stream_status: StreamStatus,
    last_scheduled_retry: Option<Duration>,
    status: StatusBoard,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl PlaybackController {
    /// Create a controller and the receiver its session events arrive on
    pub fn new(
        config: ControllerConfig,
        engines: Arc<dyn EngineFactory>,
        surface: Box<dyn MediaSurface>,
        status: StatusBoard,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller = Self {
            config,
            engines,
            surface,
            engine: None,
            current_channel: None,
            retry_attempts: 0,
            generation: 0,
            stream_status: StreamStatus::default(),
            last_scheduled_retry: None,
            status,
            events_tx,
        };
        (controller, events_rx)
    }

    pub fn stream_status(&self) -> &StreamStatus {
        &self.stream_status
    }

    pub fn current_channel(&self) -> Option<&Channel> {
        self.current_channel.as_ref()
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Generation of the current session; events tagged otherwise are stale
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Backoff of the retry scheduled by the current attempt, if any
    pub fn last_scheduled_retry(&self) -> Option<Duration> {
        self.last_scheduled_retry
    }

    /// Make `channel` the active session and start playing it
    pub fn select_channel(&mut self, channel: Channel) {
        info!("Selecting channel: {}", channel.name);
        let url = channel.url.clone();
        self.current_channel = Some(channel);
        self.retry_attempts = 0;
        self.set_stream_status(StreamState::Loading, "Loading stream...");
        self.start_playback(&url);
    }

    /// Start a fresh attempt on `url`, replacing whatever was playing
    ///
    /// Must be called from within a tokio runtime: failures may schedule a
    /// retry timer.
    pub fn start_playback(&mut self, url: &str) {
        self.generation += 1;
        self.last_scheduled_retry = None;
        self.release_session();

        let events = EventSink::new(self.events_tx.clone(), self.generation);
        if let Err(e) = self.dispatch(url, events) {
            error!("Video playback error: {}", e);
            self.handle_failure(format!("Playback initialization error: {e}"));
        }
    }

    /// Retry from the terminal error state with a fresh retry budget
    pub fn retry_current(&mut self) -> bool {
        if self.stream_status.state != StreamState::Error {
            return false;
        }
        match self.current_channel.clone() {
            Some(channel) => {
                self.select_channel(channel);
                true
            }
            None => false,
        }
    }

    /// Stop the active session, releasing the engine and resetting the surface
    pub fn teardown(&mut self) {
        if self.engine.is_none()
            && self.current_channel.is_none()
            && self.stream_status.state == StreamState::Idle
        {
            debug!("Teardown requested with no active session");
            return;
        }

        info!("Tearing down playback session {}", self.generation);
        self.generation += 1;
        self.release_session();
        self.current_channel = None;
        self.retry_attempts = 0;
        self.last_scheduled_retry = None;
        self.set_stream_status(StreamState::Idle, "Ready");
    }

    /// Apply events until the session ends, fails for good, or `shutdown` resolves
    ///
    /// Returns the state the session settled in: `Idle` after the stream
    /// ended or `shutdown` tore it down, `Error` once retries are spent.
    /// Returns immediately when no session is loading or playing.
    pub async fn run_until_settled<F>(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
        shutdown: F,
    ) -> StreamState
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);
        loop {
            match self.stream_status.state {
                StreamState::Idle | StreamState::Error => return self.stream_status.state,
                StreamState::Loading | StreamState::Playing => {}
            }

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => return self.stream_status.state,
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping playback");
                    self.teardown();
                }
            }
        }
    }

    /// Apply one engine, surface or timer event
    pub fn handle_event(&mut self, event: SessionEvent) {
        if event.generation != self.generation {
            debug!(
                "Ignoring event from stale session {} (current {}): {:?}",
                event.generation, self.generation, event.event
            );
            return;
        }

        match event.event {
            PlayerEvent::Engine(event) => self.on_engine_event(event),
            PlayerEvent::Surface(event) => self.on_surface_event(event),
            PlayerEvent::RetryDue => self.on_retry_due(),
        }
    }

    fn dispatch(&mut self, url: &str, events: EventSink) -> PlaybackResult<()> {
        if is_adaptive_url(url) && self.engines.is_supported() {
            debug!("Playing {} through the adaptive engine", url);
            let engine = self
                .engine
                .insert(self.engines.create(&self.config.engine, events)?);
            engine.load_source(url)?;
            engine.attach_media(self.surface.as_mut())?;
        } else if self.surface.supports_native_hls() {
            debug!("Handing {} to the player surface", url);
            self.surface.set_source(url, events)?;
        } else {
            debug!("Playing {} directly", url);
            self.surface.set_source(url, events)?;
            self.request_autoplay("Auto-play failed. Click play to start video.");
            self.mark_playing();
        }
        Ok(())
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ManifestParsed => {
                self.mark_playing();
                self.request_autoplay("Autoplay blocked. Click play to start.");
            }
            EngineEvent::Fault {
                fatal: true,
                kind,
                details,
            } => {
                error!(
                    "{}",
                    PlaybackError::Fault {
                        kind,
                        details: details.clone()
                    }
                );
                let recovery = match (kind, self.engine.as_mut()) {
                    (FaultKind::Network, Some(engine)) => {
                        engine.start_load();
                        Some("Network error. Retrying load...")
                    }
                    (FaultKind::Media, Some(engine)) => {
                        engine.recover_media_error();
                        Some("Media error. Attempting to recover...")
                    }
                    _ => None,
                };
                match recovery {
                    Some(message) => self.status.update(message),
                    None => self.handle_failure(format!("Fatal engine error: {details}")),
                }
            }
            EngineEvent::Fault {
                fatal: false,
                kind,
                details,
            } => {
                warn!("Non-fatal {} engine warning: {}", kind, details);
            }
            EngineEvent::BufferStalled => self.nudge_stalled_playback(),
        }
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::MetadataLoaded => {
                // Engine sessions and direct playback are marked elsewhere
                if self.engine.is_none() && self.stream_status.state == StreamState::Loading {
                    self.mark_playing();
                    self.request_autoplay("Autoplay blocked. Click play to start.");
                }
            }
            SurfaceEvent::Error { details } => {
                self.handle_failure(format!("Player error: {details}"));
            }
            SurfaceEvent::Ended => {
                info!("Playback ended");
                self.release_session();
                self.set_stream_status(StreamState::Idle, "Playback ended");
            }
        }
    }

    fn on_retry_due(&mut self) {
        let Some(channel) = self.current_channel.as_ref() else {
            debug!("Retry fired with no current channel");
            return;
        };
        debug!("Retrying channel: {}", channel.name);
        let url = channel.url.clone();
        self.start_playback(&url);
    }

    /// Count a failure and either schedule a retry or give up
    fn handle_failure(&mut self, details: String) {
        error!("Video error: {}", details);
        self.retry_attempts += 1;
        self.status.record_failed_stream();

        let attempt = self.retry_attempts;
        let max_retries = self.config.max_retries;

        if attempt <= max_retries {
            self.status
                .update(format!("Stream error. Retrying ({attempt}/{max_retries})..."));
            self.set_stream_status(
                StreamState::Loading,
                format!("Retrying... ({attempt}/{max_retries})"),
            );
            self.schedule_retry(backoff_delay(self.config.retry_delay, attempt));
        } else {
            let exhausted = PlaybackError::RetryExhausted {
                channel: self
                    .current_channel
                    .as_ref()
                    .map_or_else(|| "stream".to_string(), |c| c.name.clone()),
                attempts: max_retries,
            };
            self.status.update(exhausted.to_string());
            self.set_stream_status(StreamState::Error, "Playback failed");
            // Timers scheduled by earlier faults must not revive the session
            self.generation += 1;
            if let Some(mut engine) = self.engine.take() {
                engine.destroy();
            }
        }
    }

    fn schedule_retry(&mut self, delay: Duration) {
        info!("Retrying session {} in {:?}", self.generation, delay);
        self.last_scheduled_retry = Some(delay);

        let events = EventSink::new(self.events_tx.clone(), self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            events.emit(PlayerEvent::RetryDue);
        });
    }

    /// Small rewind and replay on buffer starvation, no state change
    fn nudge_stalled_playback(&mut self) {
        warn!("Buffer stalled. Attempting to kickstart playback.");
        self.status.update("Stream stalled, attempting recovery...");

        let position = self.surface.position();
        if position > STALL_REWIND_SECS {
            self.surface.seek(position - STALL_REWIND_SECS);
        }
        if let Err(e) = self.surface.play() {
            warn!("Failed to replay after stall: {}", e);
        }
    }

    fn request_autoplay(&mut self, refused_message: &str) {
        if !self.config.autoplay {
            return;
        }
        if let Err(e) = self.surface.play() {
            warn!("Autoplay prevented: {}", e);
            self.status.update(refused_message);
        }
    }

    fn mark_playing(&mut self) {
        self.set_stream_status(StreamState::Playing, "Playing");
        self.status.record_successful_stream();
    }

    fn release_session(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        self.surface.reset();
    }

    fn set_stream_status<S: Into<String>>(&mut self, state: StreamState, message: S) {
        self.stream_status = StreamStatus::new(state, message);
        debug!("Stream status: {}", self.stream_status);
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
    }
}
