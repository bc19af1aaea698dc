use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::playback::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Playlists loaded concurrently at startup
    #[serde(default = "default_playlists")]
    pub default_playlists: Vec<String>,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// Player and playback engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Request playback as soon as the stream is ready
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
    /// Controller-level retries before a stream is declared failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay of the exponential retry backoff
    #[serde(default = "default_retry_delay", with = "duration_serde::duration")]
    pub retry_delay: Duration,
    /// Trade stability for latency on live streams
    #[serde(default = "default_low_latency_mode")]
    pub low_latency_mode: bool,
    #[serde(default = "default_back_buffer_length", with = "duration_serde::duration")]
    pub back_buffer_length: Duration,
    /// A larger forward buffer reduces stalling
    #[serde(default = "default_max_buffer_length", with = "duration_serde::duration")]
    pub max_buffer_length: Duration,
    /// Absolute ceiling for the forward buffer
    #[serde(default = "default_max_max_buffer_length", with = "duration_serde::duration")]
    pub max_max_buffer_length: Duration,
    #[serde(default = "default_manifest_loading_timeout", with = "duration_serde::duration")]
    pub manifest_loading_timeout: Duration,
    #[serde(default = "default_manifest_loading_max_retry")]
    pub manifest_loading_max_retry: u32,
    #[serde(default = "default_frag_loading_timeout", with = "duration_serde::duration")]
    pub frag_loading_timeout: Duration,
    #[serde(default = "default_frag_loading_max_retry")]
    pub frag_loading_max_retry: u32,
    /// Initial bandwidth estimate in bits per second
    #[serde(default = "default_abr_ewma_default_estimate")]
    pub abr_ewma_default_estimate: u64,
    /// How long the engine waits for the buffer to fill before reporting a stall
    #[serde(default = "default_max_starvation_delay", with = "duration_serde::duration")]
    pub max_starvation_delay: Duration,
    /// External player used by the command line front end
    #[serde(default = "default_player_command")]
    pub command: String,
    /// Extra arguments passed to the player before the stream URL
    #[serde(default)]
    pub args: Vec<String>,
    /// Whether the external player handles HLS playlists itself
    #[serde(default = "default_native_hls")]
    pub native_hls: bool,
}

/// Playlist cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_expiry_hours")]
    pub expiry_hours: u64,
    /// Maximum number of channels kept from one playlist
    #[serde(default = "default_max_playlist_size")]
    pub max_playlist_size: usize,
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,
    /// Storage ceiling; writes beyond it raise a quota fault
    #[serde(default = "default_cache_capacity_bytes")]
    pub capacity_bytes: usize,
    /// Size of the in-memory mirror, 0 disables it
    #[serde(default = "default_cache_memory_entries")]
    pub memory_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Treat "Action;Adventure" as "Action" when grouping and filtering
    #[serde(default = "default_use_main_category_only")]
    pub use_main_category_only: bool,
}

/// Connection settings for fetching playlists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_connection_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
    #[serde(default = "default_connection_retries")]
    pub retries: u32,
}

// Player defaults
fn default_autoplay() -> bool {
    DEFAULT_AUTOPLAY
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(DEFAULT_RETRY_DELAY_MS)
}

fn default_low_latency_mode() -> bool {
    DEFAULT_LOW_LATENCY_MODE
}

fn default_back_buffer_length() -> Duration {
    Duration::from_secs(DEFAULT_BACK_BUFFER_LENGTH_SECS)
}

fn default_max_buffer_length() -> Duration {
    Duration::from_secs(DEFAULT_MAX_BUFFER_LENGTH_SECS)
}

fn default_max_max_buffer_length() -> Duration {
    Duration::from_secs(DEFAULT_MAX_MAX_BUFFER_LENGTH_SECS)
}

fn default_manifest_loading_timeout() -> Duration {
    Duration::from_millis(DEFAULT_MANIFEST_LOADING_TIMEOUT_MS)
}

fn default_manifest_loading_max_retry() -> u32 {
    DEFAULT_MANIFEST_LOADING_MAX_RETRY
}

fn default_frag_loading_timeout() -> Duration {
    Duration::from_millis(DEFAULT_FRAG_LOADING_TIMEOUT_MS)
}

fn default_frag_loading_max_retry() -> u32 {
    DEFAULT_FRAG_LOADING_MAX_RETRY
}

fn default_abr_ewma_default_estimate() -> u64 {
    DEFAULT_ABR_EWMA_DEFAULT_ESTIMATE
}

fn default_max_starvation_delay() -> Duration {
    Duration::from_secs(DEFAULT_MAX_STARVATION_DELAY_SECS)
}

fn default_player_command() -> String {
    DEFAULT_PLAYER_COMMAND.to_string()
}

fn default_native_hls() -> bool {
    DEFAULT_NATIVE_HLS
}

// Cache defaults
fn default_cache_enabled() -> bool {
    DEFAULT_CACHE_ENABLED
}

fn default_cache_expiry_hours() -> u64 {
    DEFAULT_CACHE_EXPIRY_HOURS
}

fn default_max_playlist_size() -> usize {
    DEFAULT_MAX_PLAYLIST_SIZE
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIRECTORY)
}

fn default_cache_capacity_bytes() -> usize {
    DEFAULT_CACHE_CAPACITY_BYTES
}

fn default_cache_memory_entries() -> usize {
    DEFAULT_CACHE_MEMORY_ENTRIES
}

// UI defaults
fn default_use_main_category_only() -> bool {
    DEFAULT_USE_MAIN_CATEGORY_ONLY
}

// Connection defaults
fn default_connection_timeout() -> Duration {
    Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS)
}

fn default_connection_retries() -> u32 {
    DEFAULT_CONNECTION_RETRIES
}

fn default_playlists() -> Vec<String> {
    DEFAULT_PLAYLISTS.iter().map(|s| s.to_string()).collect()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autoplay: default_autoplay(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            low_latency_mode: default_low_latency_mode(),
            back_buffer_length: default_back_buffer_length(),
            max_buffer_length: default_max_buffer_length(),
            max_max_buffer_length: default_max_max_buffer_length(),
            manifest_loading_timeout: default_manifest_loading_timeout(),
            manifest_loading_max_retry: default_manifest_loading_max_retry(),
            frag_loading_timeout: default_frag_loading_timeout(),
            frag_loading_max_retry: default_frag_loading_max_retry(),
            abr_ewma_default_estimate: default_abr_ewma_default_estimate(),
            max_starvation_delay: default_max_starvation_delay(),
            command: default_player_command(),
            args: Vec::new(),
            native_hls: default_native_hls(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            expiry_hours: default_cache_expiry_hours(),
            max_playlist_size: default_max_playlist_size(),
            directory: default_cache_directory(),
            capacity_bytes: default_cache_capacity_bytes(),
            memory_entries: default_cache_memory_entries(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            use_main_category_only: default_use_main_category_only(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: default_connection_timeout(),
            retries: default_connection_retries(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_playlists: default_playlists(),
            player: PlayerConfig::default(),
            cache: CacheConfig::default(),
            ui: UiConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Time-to-live applied when the caller does not supply one
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.expiry_hours * 60 * 60)
    }
}

impl PlayerConfig {
    /// Tunables handed to the adaptive engine for each session
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            low_latency_mode: self.low_latency_mode,
            back_buffer_length: self.back_buffer_length,
            max_buffer_length: self.max_buffer_length,
            max_max_buffer_length: self.max_max_buffer_length,
            manifest_loading_timeout: self.manifest_loading_timeout,
            manifest_loading_max_retry: self.manifest_loading_max_retry,
            manifest_loading_retry_delay: Duration::from_millis(DEFAULT_LOADING_RETRY_DELAY_MS),
            frag_loading_timeout: self.frag_loading_timeout,
            frag_loading_max_retry: self.frag_loading_max_retry,
            frag_loading_retry_delay: Duration::from_millis(DEFAULT_LOADING_RETRY_DELAY_MS),
            max_starvation_delay: self.max_starvation_delay,
            abr_ewma_default_estimate: self.abr_ewma_default_estimate,
            ..EngineConfig::default()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}
