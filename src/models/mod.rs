use serde::{Deserialize, Serialize};

pub mod playback;

pub use playback::{StreamState, StreamStatus};

/// Placeholder name for directive lines without a usable title
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown Channel";

/// Category assigned to channels without a `group-title`
pub const GENERAL_CATEGORY: &str = "general";

/// A playable channel parsed from a playlist
///
/// Channels are only built once both the name and a valid stream URL are
/// known, and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Lower-cased `group-title`, possibly several labels joined by `;`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// `tvg-id` from the directive line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Channel {
    /// Category used for grouping, with absent categories mapped to `general`
    pub fn category_or_general(&self) -> &str {
        self.category.as_deref().unwrap_or(GENERAL_CATEGORY)
    }
}

/// Adaptive-segment streams are recognised by their `.m3u8` playlist
pub fn is_adaptive_url(url: &str) -> bool {
    url.to_lowercase().contains(".m3u8")
}

/// Running counters shown in the status summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_channels: usize,
    pub loaded_playlists: usize,
    pub successful_streams: usize,
    pub failed_streams: usize,
}

impl PerformanceMetrics {
    pub fn summary(&self) -> String {
        format!(
            "Channels: {} | Playlists: {} | Success: {} | Failed: {}",
            self.total_channels, self.loaded_playlists, self.successful_streams, self.failed_streams
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(url: &str, category: Option<&str>) -> Channel {
        Channel {
            name: "Test".to_string(),
            url: url.to_string(),
            logo: None,
            category: category.map(str::to_string),
            country: None,
            language: None,
            id: None,
        }
    }

    #[test]
    fn test_category_or_general() {
        assert_eq!(channel("http://a/s", None).category_or_general(), "general");
        assert_eq!(channel("http://a/s", Some("news")).category_or_general(), "news");
    }

    #[test]
    fn test_adaptive_detection_is_case_insensitive() {
        assert!(is_adaptive_url("http://a/live/INDEX.M3U8?token=1"));
        assert!(!is_adaptive_url("http://a/live/stream.ts"));
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let json = serde_json::to_string(&channel("http://a/s", None)).unwrap();
        assert_eq!(json, r#"{"name":"Test","url":"http://a/s"}"#);
        let back: Channel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, channel("http://a/s", None));
    }

    #[test]
    fn test_metrics_summary() {
        let metrics = PerformanceMetrics {
            total_channels: 12,
            loaded_playlists: 2,
            successful_streams: 3,
            failed_streams: 1,
        };
        assert_eq!(
            metrics.summary(),
            "Channels: 12 | Playlists: 2 | Success: 3 | Failed: 1"
        );
    }
}
