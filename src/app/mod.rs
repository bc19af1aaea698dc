//! Application state
//!
//! [`IptvApp`] ties the loader, the catalog and the status board together:
//! it loads playlists (one user-initiated load at a time), merges their
//! channels into the catalog and reports progress as status text. Failures
//! never escape as panics; they end up on the status line and, for callers
//! that care, as an [`AppError`].

use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::cache::ChannelCache;
use crate::catalog::ChannelCatalog;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::Channel;
use crate::playback::{ControllerConfig, EngineFactory, MediaSurface, PlaybackController, SessionEvent};
use crate::sources::PlaylistLoader;
use crate::status::StatusBoard;
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::utils::http_client::{HttpFetcher, StandardHttpClient};
use crate::utils::url::UrlUtils;

/// Clears the load flag however the load ends
struct LoadGuard<'a>(&'a AtomicBool);

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct IptvApp {
    config: Config,
    fetcher: Arc<dyn HttpFetcher>,
    loader: PlaylistLoader,
    catalog: Arc<RwLock<ChannelCatalog>>,
    loading: AtomicBool,
    status: StatusBoard,
}

impl IptvApp {
    /// Assemble the application around explicit collaborators
    pub fn new(config: Config, fetcher: Arc<dyn HttpFetcher>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let cache = Arc::new(ChannelCache::new(storage, &config.cache));
        let loader = PlaylistLoader::new(fetcher.clone(), cache);
        let catalog = ChannelCatalog::new(config.ui.use_main_category_only);

        Self {
            config,
            fetcher,
            loader,
            catalog: Arc::new(RwLock::new(catalog)),
            loading: AtomicBool::new(false),
            status: StatusBoard::new(),
        }
    }

    /// Build the application with the HTTP client and file-backed cache
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let fetcher: Arc<dyn HttpFetcher> = Arc::new(StandardHttpClient::new(&config.connection)?);

        let storage: Arc<dyn KeyValueStorage> = if config.cache.enabled {
            let storage = FileStorage::open(&config.cache.directory, config.cache.capacity_bytes).await?;
            info!("Playlist cache stored at {}", storage.path().display());
            Arc::new(storage)
        } else {
            Arc::new(MemoryStorage::new(config.cache.capacity_bytes))
        };

        Ok(Self::new(config, fetcher, storage))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn catalog(&self) -> &Arc<RwLock<ChannelCatalog>> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ChannelCache> {
        self.loader.cache()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Filtered, name-ordered snapshot using the catalog's category filters
    pub async fn visible_channels(&self, query: &str) -> Vec<Channel> {
        self.catalog
            .read()
            .await
            .visible_channels(query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Load the configured default playlists concurrently, then sweep the cache
    ///
    /// Defaults bypass the single-load gate; each merges into the catalog as
    /// soon as it completes. Individual failures only affect the status line.
    pub async fn init(&self) {
        self.status.update("Loading default playlists...");

        let loads = self
            .config
            .default_playlists
            .iter()
            .map(|url| self.load_into_catalog(url));
        let results = join_all(loads).await;

        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed > 0 {
            warn!("{} of {} default playlists failed to load", failed, results.len());
        }

        self.status.update("Ready to play channels");
        self.cache().cleanup().await;
    }

    /// Trim user input and load it as a playlist
    pub async fn add_playlist(&self, input: &str) -> AppResult<usize> {
        let url = input.trim();
        if url.is_empty() {
            self.status.update("Please enter a valid URL");
            return Err(AppError::validation("Please enter a valid URL"));
        }
        self.load_playlist(url).await
    }

    /// Load one playlist, rejecting the request if another load is in flight
    pub async fn load_playlist(&self, url: &str) -> AppResult<usize> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.status.update("Already loading a playlist, please wait...");
            return Err(AppError::operation_in_progress(
                "playlist load",
                UrlUtils::obfuscate_credentials(url),
            ));
        }
        let _guard = LoadGuard(&self.loading);

        self.load_into_catalog(url).await
    }

    /// HEAD the stream URL; any transport failure counts as unreachable
    pub async fn check_stream(&self, url: &str) -> bool {
        match self.fetcher.head(url).await {
            Ok(status) if (200..300).contains(&status) => true,
            Ok(status) => {
                warn!(
                    "Channel URL validation failed for {}: HTTP {}",
                    UrlUtils::obfuscate_credentials(url),
                    status
                );
                false
            }
            Err(e) => {
                warn!(
                    "Channel URL validation failed for {}: {}",
                    UrlUtils::obfuscate_credentials(url),
                    e
                );
                false
            }
        }
    }

    /// Create a playback controller reporting to this application's status board
    pub fn playback_controller(
        &self,
        engines: Arc<dyn EngineFactory>,
        surface: Box<dyn MediaSurface>,
    ) -> (PlaybackController, UnboundedReceiver<SessionEvent>) {
        PlaybackController::new(
            ControllerConfig::from_player(&self.config.player),
            engines,
            surface,
            self.status.clone(),
        )
    }

    async fn load_into_catalog(&self, url: &str) -> AppResult<usize> {
        let display_url = UrlUtils::obfuscate_credentials(url);
        self.status
            .update(format!("Loading playlist from {display_url}..."));

        match self.fetch_channels(url).await {
            Ok(mut channels) => {
                let limit = self.config.cache.max_playlist_size;
                if limit > 0 && channels.len() > limit {
                    self.status
                        .update(format!("Warning: Playlist truncated to {limit} channels"));
                    channels.truncate(limit);
                }

                let count = channels.len();
                let total = {
                    let mut catalog = self.catalog.write().await;
                    catalog.add_channels(channels);
                    catalog.len()
                };
                self.status.set_total_channels(total);
                self.status.record_loaded_playlist();
                self.status
                    .update(format!("Loaded {count} channels from {display_url}"));
                info!("Catalog now holds {} channels", total);
                Ok(count)
            }
            Err(e) => {
                error!("Playlist loading error for {}: {}", display_url, e);
                self.status.update(format!("Error: {}", e.status_message()));
                Err(e)
            }
        }
    }

    async fn fetch_channels(&self, url: &str) -> AppResult<Vec<Channel>> {
        let channels = self.loader.load(url).await?;
        if channels.is_empty() {
            return Err(AppError::empty_playlist(UrlUtils::obfuscate_credentials(url)));
        }
        Ok(channels)
    }
}
