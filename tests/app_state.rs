use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use iptv_viewer::app::IptvApp;
use iptv_viewer::config::Config;
use iptv_viewer::errors::{AppError, SourceError, SourceResult};
use iptv_viewer::storage::MemoryStorage;
use iptv_viewer::utils::http_client::HttpFetcher;

const NEWS_PLAYLIST: &str = "#EXTM3U
#EXTINF:-1 tvg-country=\"UK\" group-title=\"News\",Beta News
http://streams.example.com/beta.m3u8
#EXTINF:-1 group-title=\"News;Weather\",alpha weather
http://streams.example.com/alpha.m3u8
#EXTINF:-1 group-title=\"Sports\",Gamma Sport
http://streams.example.com/gamma.ts
";

const MUSIC_PLAYLIST: &str = "#EXTM3U
#EXTINF:-1 group-title=\"Music\",Delta FM
http://streams.example.com/delta.mp3
";

/// Serves canned playlists; unknown URLs answer 404
#[derive(Default)]
struct MockFetcher {
    bodies: HashMap<String, String>,
    fetches: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockFetcher {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn fetch_text(&self, url: &str) -> SourceResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::http(404, "Not Found"))
    }

    async fn head(&self, url: &str) -> SourceResult<u16> {
        if url.contains("unreachable") {
            return Err(SourceError::network("connection refused"));
        }
        Ok(if self.bodies.contains_key(url) { 200 } else { 404 })
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.default_playlists.clear();
    config.cache.max_playlist_size = 0;
    config
}

fn app_with(config: Config, fetcher: Arc<MockFetcher>) -> IptvApp {
    IptvApp::new(config, fetcher, Arc::new(MemoryStorage::new(5 * 1024 * 1024)))
}

#[tokio::test]
async fn test_load_playlist_fills_catalog() {
    let fetcher = Arc::new(MockFetcher::default().with("http://lists.example.com/news.m3u", NEWS_PLAYLIST));
    let app = app_with(config(), fetcher);

    let count = app
        .load_playlist("http://lists.example.com/news.m3u")
        .await
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        app.status().message(),
        "Loaded 3 channels from http://lists.example.com/news.m3u"
    );
    let names: Vec<String> = app
        .visible_channels("")
        .await
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["alpha weather", "Beta News", "Gamma Sport"]);

    let metrics = app.status().metrics();
    assert_eq!(metrics.total_channels, 3);
    assert_eq!(metrics.loaded_playlists, 1);
    assert!(!app.is_loading());
}

#[tokio::test]
async fn test_second_load_is_served_from_cache() {
    let fetcher = Arc::new(MockFetcher::default().with("http://lists.example.com/news.m3u", NEWS_PLAYLIST));
    let app = app_with(config(), fetcher.clone());

    app.load_playlist("http://lists.example.com/news.m3u").await.unwrap();
    app.load_playlist("http://lists.example.com/news.m3u").await.unwrap();

    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_load_is_rejected() {
    let gate = Arc::new(Notify::new());
    let fetcher = Arc::new(
        MockFetcher::default()
            .with("http://lists.example.com/news.m3u", NEWS_PLAYLIST)
            .with("http://lists.example.com/music.m3u", MUSIC_PLAYLIST)
            .gated(gate.clone()),
    );
    let app = app_with(config(), fetcher.clone());

    let (first, second) = tokio::join!(
        app.load_playlist("http://lists.example.com/news.m3u"),
        async {
            while !app.is_loading() {
                tokio::task::yield_now().await;
            }
            let rejected = app.load_playlist("http://lists.example.com/music.m3u").await;
            assert_eq!(
                app.status().message(),
                "Already loading a playlist, please wait..."
            );
            gate.notify_one();
            rejected
        }
    );

    assert_eq!(first.unwrap(), 3);
    assert!(matches!(
        second,
        Err(AppError::OperationInProgress { .. })
    ));
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    assert!(!app.is_loading());

    // The gate reopens once the first load finishes
    gate.notify_one();
    assert_eq!(
        app.load_playlist("http://lists.example.com/music.m3u")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_failed_load_releases_gate() {
    let app = app_with(config(), Arc::new(MockFetcher::default()));

    let result = app.load_playlist("http://lists.example.com/missing.m3u").await;

    assert!(matches!(
        result,
        Err(AppError::Source(SourceError::Http { status: 404, .. }))
    ));
    assert_eq!(app.status().message(), "Error: HTTP error: 404 - Not Found");
    assert!(!app.is_loading());
}

#[tokio::test]
async fn test_empty_playlist_is_an_error() {
    let fetcher = Arc::new(MockFetcher::default().with("http://lists.example.com/empty.m3u", "#EXTM3U\n"));
    let app = app_with(config(), fetcher.clone());

    let result = app.load_playlist("http://lists.example.com/empty.m3u").await;

    assert!(matches!(result, Err(AppError::EmptyPlaylist { .. })));
    assert_eq!(
        app.status().message(),
        "Error: No valid channels found in the playlist file."
    );
    assert!(app.catalog().read().await.is_empty());

    // Empty results are not cached
    let _ = app.load_playlist("http://lists.example.com/empty.m3u").await;
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_oversized_playlist_is_truncated() {
    let mut config = config();
    config.cache.max_playlist_size = 2;
    let fetcher = Arc::new(MockFetcher::default().with("http://lists.example.com/news.m3u", NEWS_PLAYLIST));
    let app = app_with(config, fetcher);

    let count = app
        .load_playlist("http://lists.example.com/news.m3u")
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(app.catalog().read().await.len(), 2);
    assert_eq!(app.status().metrics().total_channels, 2);
}

#[tokio::test]
async fn test_add_playlist_rejects_blank_input() {
    let fetcher = Arc::new(MockFetcher::default());
    let app = app_with(config(), fetcher.clone());

    let result = app.add_playlist("   ").await;

    assert!(matches!(result, Err(AppError::Validation { .. })));
    assert_eq!(app.status().message(), "Please enter a valid URL");
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_add_playlist_trims_input() {
    let fetcher = Arc::new(MockFetcher::default().with("http://lists.example.com/music.m3u", MUSIC_PLAYLIST));
    let app = app_with(config(), fetcher);

    let count = app
        .add_playlist("  http://lists.example.com/music.m3u \n")
        .await
        .unwrap();

    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_init_merges_defaults_and_survives_failures() {
    let mut config = config();
    config.default_playlists = vec![
        "http://lists.example.com/news.m3u".to_string(),
        "http://lists.example.com/missing.m3u".to_string(),
        "http://lists.example.com/music.m3u".to_string(),
    ];
    let fetcher = Arc::new(
        MockFetcher::default()
            .with("http://lists.example.com/news.m3u", NEWS_PLAYLIST)
            .with("http://lists.example.com/music.m3u", MUSIC_PLAYLIST),
    );
    let app = app_with(config, fetcher);

    app.init().await;

    assert_eq!(app.status().message(), "Ready to play channels");
    let catalog = app.catalog().read().await;
    assert_eq!(catalog.len(), 4);
    assert_eq!(catalog.categories(), vec!["music", "news", "sports"]);
    assert_eq!(app.status().metrics().loaded_playlists, 2);
}

#[tokio::test]
async fn test_category_filters_apply_to_visible_channels() {
    let fetcher = Arc::new(MockFetcher::default().with("http://lists.example.com/news.m3u", NEWS_PLAYLIST));
    let app = app_with(config(), fetcher);
    app.load_playlist("http://lists.example.com/news.m3u").await.unwrap();

    {
        let mut catalog = app.catalog().write().await;
        catalog.set_all_categories(false);
        catalog.toggle_category("sports");
    }

    let names: Vec<String> = app
        .visible_channels("")
        .await
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Gamma Sport"]);

    let by_country: Vec<String> = {
        let mut catalog = app.catalog().write().await;
        catalog.set_all_categories(true);
        drop(catalog);
        app.visible_channels(" uk ")
            .await
            .into_iter()
            .map(|c| c.name)
            .collect()
    };
    assert_eq!(by_country, vec!["Beta News"]);
}

#[tokio::test]
async fn test_check_stream() {
    let fetcher = Arc::new(MockFetcher::default().with("http://streams.example.com/ok.ts", ""));
    let app = app_with(config(), fetcher);

    assert!(app.check_stream("http://streams.example.com/ok.ts").await);
    assert!(!app.check_stream("http://streams.example.com/gone.ts").await);
    assert!(!app.check_stream("http://unreachable.example.com/x.ts").await);
}
