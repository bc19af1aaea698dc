use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::m3u::M3uParser;
use crate::cache::ChannelCache;
use crate::errors::{AppResult, SourceError};
use crate::models::Channel;
use crate::utils::http_client::HttpFetcher;
use crate::utils::url::UrlUtils;

/// Fetch + parse pipeline with a cache in front of the network
///
/// Remote playlists are looked up in the cache first and cached after a
/// successful parse. Local files are always read fresh.
pub struct PlaylistLoader {
    fetcher: Arc<dyn HttpFetcher>,
    cache: Arc<ChannelCache>,
}

impl PlaylistLoader {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, cache: Arc<ChannelCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &Arc<ChannelCache> {
        &self.cache
    }

    /// Load every channel from a playlist URL or local file path
    pub async fn load(&self, source: &str) -> AppResult<Vec<Channel>> {
        let display_source = UrlUtils::obfuscate_credentials(source);

        if UrlUtils::is_valid(source) {
            if let Some(cached) = self.cache.get_channels(source).await {
                debug!("Using cached playlist for {}", display_source);
                return Ok(cached);
            }

            let content = self.fetcher.fetch_text(source).await?;
            let channels = self.parse(&display_source, &content);

            // An empty result is not cached so a later attempt refetches
            if !channels.is_empty() {
                self.cache.set_channels(source, &channels).await;
            }
            return Ok(channels);
        }

        let path = Path::new(source);
        if path.is_file() {
            info!("Reading playlist from file: {}", path.display());
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| SourceError::Decode {
                    message: format!("Failed to read {}: {e}", path.display()),
                })?;
            let content = String::from_utf8_lossy(&bytes);
            return Ok(self.parse(&display_source, &content));
        }

        Err(SourceError::InvalidUrl { url: display_source }.into())
    }

    fn parse(&self, source: &str, content: &str) -> Vec<Channel> {
        M3uParser::new(source).parse(content).channels
    }
}
