use std::time::Duration;

use super::EventSink;
use super::surface::MediaSurface;
use crate::config::defaults::*;
use crate::errors::{PlaybackError, PlaybackResult};

/// Tunables handed to the adaptive engine when a session starts
///
/// Bitrate selection itself belongs to the engine; these only seed and bound
/// its buffering, loading and bandwidth estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub enable_worker: bool,
    pub low_latency_mode: bool,
    pub back_buffer_length: Duration,
    pub max_buffer_length: Duration,
    pub max_max_buffer_length: Duration,
    pub manifest_loading_timeout: Duration,
    pub manifest_loading_max_retry: u32,
    pub manifest_loading_retry_delay: Duration,
    pub frag_loading_timeout: Duration,
    pub frag_loading_max_retry: u32,
    pub frag_loading_retry_delay: Duration,
    /// How long the buffer may stay empty before a stall is reported
    pub max_starvation_delay: Duration,
    /// Target distance from the live edge, in segment durations
    pub live_sync_duration_count: u32,
    pub live_max_latency_duration_count: u32,
    /// Start VOD playback before the whole fragment is loaded
    pub progressive: bool,
    /// Initial bandwidth estimate in bits per second
    pub abr_ewma_default_estimate: u64,
    pub abr_bandwidth_factor: f64,
    pub abr_bandwidth_up_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: DEFAULT_LOW_LATENCY_MODE,
            back_buffer_length: Duration::from_secs(DEFAULT_BACK_BUFFER_LENGTH_SECS),
            max_buffer_length: Duration::from_secs(DEFAULT_MAX_BUFFER_LENGTH_SECS),
            max_max_buffer_length: Duration::from_secs(DEFAULT_MAX_MAX_BUFFER_LENGTH_SECS),
            manifest_loading_timeout: Duration::from_millis(DEFAULT_MANIFEST_LOADING_TIMEOUT_MS),
            manifest_loading_max_retry: DEFAULT_MANIFEST_LOADING_MAX_RETRY,
            manifest_loading_retry_delay: Duration::from_millis(DEFAULT_LOADING_RETRY_DELAY_MS),
            frag_loading_timeout: Duration::from_millis(DEFAULT_FRAG_LOADING_TIMEOUT_MS),
            frag_loading_max_retry: DEFAULT_FRAG_LOADING_MAX_RETRY,
            frag_loading_retry_delay: Duration::from_millis(DEFAULT_LOADING_RETRY_DELAY_MS),
            max_starvation_delay: Duration::from_secs(DEFAULT_MAX_STARVATION_DELAY_SECS),
            live_sync_duration_count: DEFAULT_LIVE_SYNC_DURATION_COUNT,
            live_max_latency_duration_count: DEFAULT_LIVE_MAX_LATENCY_DURATION_COUNT,
            progressive: true,
            abr_ewma_default_estimate: DEFAULT_ABR_EWMA_DEFAULT_ESTIMATE,
            abr_bandwidth_factor: DEFAULT_ABR_BANDWIDTH_FACTOR,
            abr_bandwidth_up_factor: DEFAULT_ABR_BANDWIDTH_UP_FACTOR,
        }
    }
}

/// Handle to one adaptive-bitrate engine instance
///
/// Engines report progress asynchronously through the [`EventSink`] they
/// were created with.
pub trait AdaptiveEngine: Send {
    fn load_source(&mut self, url: &str) -> PlaybackResult<()>;

    /// Bind the engine's output to the player surface
    fn attach_media(&mut self, surface: &mut dyn MediaSurface) -> PlaybackResult<()>;

    /// Restart loading after a fatal network fault
    fn start_load(&mut self);

    fn recover_media_error(&mut self);

    /// Release every resource; the handle is unusable afterwards
    fn destroy(&mut self);
}

/// Creates engines for new sessions
pub trait EngineFactory: Send + Sync {
    /// Whether adaptive engines can run in this environment at all
    fn is_supported(&self) -> bool;

    fn create(
        &self,
        config: &EngineConfig,
        events: EventSink,
    ) -> PlaybackResult<Box<dyn AdaptiveEngine>>;
}

/// Factory for environments without an embedded engine
///
/// HLS streams then go to the surface directly when it can play them.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedEngineFactory;

impl EngineFactory for UnsupportedEngineFactory {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(
        &self,
        _config: &EngineConfig,
        _events: EventSink,
    ) -> PlaybackResult<Box<dyn AdaptiveEngine>> {
        Err(PlaybackError::EngineUnavailable {
            message: "no adaptive engine in this build".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_unsupported_factory_refuses_to_create() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let factory = UnsupportedEngineFactory;
        assert!(!factory.is_supported());
        let result = factory.create(&EngineConfig::default(), EventSink::new(tx, 1));
        assert!(matches!(result, Err(PlaybackError::EngineUnavailable { .. })));
    }
}
