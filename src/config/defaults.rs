/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Player defaults
pub const DEFAULT_AUTOPLAY: bool = true;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
pub const DEFAULT_LOW_LATENCY_MODE: bool = false;
pub const DEFAULT_BACK_BUFFER_LENGTH_SECS: u64 = 90;
pub const DEFAULT_MAX_BUFFER_LENGTH_SECS: u64 = 60;
pub const DEFAULT_MAX_MAX_BUFFER_LENGTH_SECS: u64 = 120;
pub const DEFAULT_MANIFEST_LOADING_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MANIFEST_LOADING_MAX_RETRY: u32 = 4;
pub const DEFAULT_FRAG_LOADING_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_FRAG_LOADING_MAX_RETRY: u32 = 6;
pub const DEFAULT_LOADING_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_ABR_EWMA_DEFAULT_ESTIMATE: u64 = 1_000_000;
pub const DEFAULT_MAX_STARVATION_DELAY_SECS: u64 = 8;
pub const DEFAULT_LIVE_SYNC_DURATION_COUNT: u32 = 3;
pub const DEFAULT_LIVE_MAX_LATENCY_DURATION_COUNT: u32 = 10;
pub const DEFAULT_ABR_BANDWIDTH_FACTOR: f64 = 0.9;
pub const DEFAULT_ABR_BANDWIDTH_UP_FACTOR: f64 = 0.7;
pub const DEFAULT_PLAYER_COMMAND: &str = "mpv";
pub const DEFAULT_NATIVE_HLS: bool = true;

// Cache defaults
pub const DEFAULT_CACHE_ENABLED: bool = true;
pub const DEFAULT_CACHE_EXPIRY_HOURS: u64 = 24;
pub const DEFAULT_MAX_PLAYLIST_SIZE: usize = 1000;
pub const DEFAULT_CACHE_DIRECTORY: &str = "./data/cache";
pub const DEFAULT_CACHE_CAPACITY_BYTES: usize = 5 * 1024 * 1024; // 5MB, a typical per-origin ceiling
pub const DEFAULT_CACHE_MEMORY_ENTRIES: usize = 32;

// UI defaults
pub const DEFAULT_USE_MAIN_CATEGORY_ONLY: bool = true;

// Connection defaults
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CONNECTION_RETRIES: u32 = 3;

// Playlists loaded at startup
pub const DEFAULT_PLAYLISTS: &[&str] = &[
    "https://iptv-org.github.io/iptv/countries/za.m3u",
    "https://iptv-org.github.io/iptv/languages/eng.m3u",
];
