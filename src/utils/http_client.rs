use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::errors::{SourceError, SourceResult};
use crate::utils::retry::{RetryConfig, with_retry};
use crate::utils::url::UrlUtils;
use crate::utils::{CompressionFormat, DecompressionService};

/// Network collaborator used to download playlists and probe streams
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET the URL and return its (decompressed) body as text
    async fn fetch_text(&self, url: &str) -> SourceResult<String>;

    /// HEAD the URL and return the response status code
    async fn head(&self, url: &str) -> SourceResult<u16>;
}

/// Default implementation of [`HttpFetcher`] using reqwest
pub struct StandardHttpClient {
    client: Client,
    retry: RetryConfig,
}

impl StandardHttpClient {
    /// Create a client with a whole-request timeout and bounded retries
    pub fn new(config: &ConnectionConfig) -> SourceResult<Self> {
        Self::with_retry_config(config.timeout, RetryConfig::for_fetches(config.retries))
    }

    pub fn with_retry_config(timeout: Duration, retry: RetryConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, retry })
    }

    fn map_request_error(error: reqwest::Error, url: &str) -> SourceError {
        if error.is_timeout() {
            SourceError::Timeout {
                url: UrlUtils::obfuscate_credentials(url),
            }
        } else {
            SourceError::network(UrlUtils::obfuscate_credentials(&error.to_string()))
        }
    }

    fn check_status(response: &Response, url: &str) -> SourceResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        debug!(
            "HTTP {} for {}",
            status.as_u16(),
            UrlUtils::obfuscate_credentials(url)
        );
        Err(SourceError::http(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
        ))
    }

    /// Process response with automatic decompression
    async fn process_response_to_bytes(response: Response, url: &str) -> SourceResult<Vec<u8>> {
        Self::check_status(&response, url)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_request_error(e, url))?;

        debug!("Fetched {} bytes of raw content", bytes.len());

        let compression_format = DecompressionService::detect_compression_format(&bytes);
        let decompressed = match compression_format {
            CompressionFormat::Uncompressed => bytes.to_vec(),
            _ => DecompressionService::decompress(bytes).map_err(|e| SourceError::Decode {
                message: format!("Failed to decompress content: {e}"),
            })?,
        };

        debug!(
            "Processed {} bytes of content (compression: {:?})",
            decompressed.len(),
            compression_format
        );
        Ok(decompressed)
    }

    async fn fetch_text_once(&self, url: &str) -> SourceResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, url))?;

        let body = Self::process_response_to_bytes(response, url).await?;
        Ok(Self::decode_text(body, url))
    }

    /// Decode a body as UTF-8, replacing invalid sequences
    fn decode_text(body: Vec<u8>, url: &str) -> String {
        match String::from_utf8(body) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Content from {} is not valid UTF-8 ({}), decoding lossily",
                    UrlUtils::obfuscate_credentials(url),
                    e.utf8_error()
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        }
    }
}

#[async_trait]
impl HttpFetcher for StandardHttpClient {
    async fn fetch_text(&self, url: &str) -> SourceResult<String> {
        let parsed = UrlUtils::parse_playlist_url(url).map_err(|_| SourceError::InvalidUrl {
            url: UrlUtils::obfuscate_credentials(url),
        })?;
        let display_url = UrlUtils::obfuscate_credentials(url);
        debug!("Fetching text content from: {}", display_url);

        let content = with_retry(
            &self.retry,
            || self.fetch_text_once(parsed.as_str()),
            &format!("fetch {display_url}"),
        )
        .await?;

        debug!("Fetched {} characters of text content", content.len());
        Ok(content)
    }

    async fn head(&self, url: &str) -> SourceResult<u16> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, url))?;

        Ok(response.status().as_u16())
    }
}
