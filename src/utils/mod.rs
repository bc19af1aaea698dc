pub mod decompression;
pub mod http_client;
pub mod jitter;
pub mod retry;
pub mod url;

pub use decompression::{CompressionFormat, DecompressionService};
pub use http_client::{HttpFetcher, StandardHttpClient};
pub use retry::{RetryConfig, calculate_delay, with_retry};
pub use url::UrlUtils;
