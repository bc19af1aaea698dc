use std::sync::{Arc, Mutex};
use std::time::Duration;

use iptv_viewer::errors::{PlaybackError, PlaybackResult};
use iptv_viewer::models::{Channel, StreamState};
use iptv_viewer::playback::{
    AdaptiveEngine, ControllerConfig, EngineConfig, EngineEvent, EngineFactory, EventSink,
    FaultKind, MediaSurface, PlaybackController, PlayerEvent, SessionEvent, SurfaceEvent,
    UnsupportedEngineFactory,
};
use iptv_viewer::status::StatusBoard;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

type CallLog = Arc<Mutex<Vec<String>>>;

fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

struct MockEngine {
    log: CallLog,
}

impl AdaptiveEngine for MockEngine {
    fn load_source(&mut self, url: &str) -> PlaybackResult<()> {
        self.log.lock().unwrap().push(format!("engine.load_source {url}"));
        Ok(())
    }

    fn attach_media(&mut self, _surface: &mut dyn MediaSurface) -> PlaybackResult<()> {
        self.log.lock().unwrap().push("engine.attach_media".to_string());
        Ok(())
    }

    fn start_load(&mut self) {
        self.log.lock().unwrap().push("engine.start_load".to_string());
    }

    fn recover_media_error(&mut self) {
        self.log.lock().unwrap().push("engine.recover_media_error".to_string());
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().push("engine.destroy".to_string());
    }
}

struct MockEngineFactory {
    log: CallLog,
}

impl EngineFactory for MockEngineFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(
        &self,
        _config: &EngineConfig,
        _events: EventSink,
    ) -> PlaybackResult<Box<dyn AdaptiveEngine>> {
        self.log.lock().unwrap().push("factory.create".to_string());
        Ok(Box::new(MockEngine {
            log: self.log.clone(),
        }))
    }
}

#[derive(Default)]
struct SurfaceBehaviour {
    native_hls: bool,
    refuse_play: bool,
    refuse_source: bool,
    position: f64,
}

struct MockSurface {
    log: CallLog,
    behaviour: SurfaceBehaviour,
}

impl MediaSurface for MockSurface {
    fn supports_native_hls(&self) -> bool {
        self.behaviour.native_hls
    }

    fn reset(&mut self) {
        self.log.lock().unwrap().push("surface.reset".to_string());
    }

    fn set_source(&mut self, url: &str, _events: EventSink) -> PlaybackResult<()> {
        self.log.lock().unwrap().push(format!("surface.set_source {url}"));
        if self.behaviour.refuse_source {
            return Err(PlaybackError::surface("source rejected"));
        }
        Ok(())
    }

    fn play(&mut self) -> PlaybackResult<()> {
        self.log.lock().unwrap().push("surface.play".to_string());
        if self.behaviour.refuse_play {
            return Err(PlaybackError::AutoplayBlocked {
                message: "user gesture required".to_string(),
            });
        }
        Ok(())
    }

    fn position(&self) -> f64 {
        self.behaviour.position
    }

    fn seek(&mut self, position: f64) {
        self.log.lock().unwrap().push(format!("surface.seek {position:.2}"));
    }
}

struct Harness {
    controller: PlaybackController,
    events: UnboundedReceiver<SessionEvent>,
    status: StatusBoard,
    log: CallLog,
}

impl Harness {
    fn new(engine_supported: bool, behaviour: SurfaceBehaviour) -> Self {
        Self::with_max_retries(engine_supported, behaviour, 3)
    }

    fn with_max_retries(engine_supported: bool, behaviour: SurfaceBehaviour, max_retries: u32) -> Self {
        let log = CallLog::default();
        let engines: Arc<dyn EngineFactory> = if engine_supported {
            Arc::new(MockEngineFactory { log: log.clone() })
        } else {
            Arc::new(UnsupportedEngineFactory)
        };
        let surface = MockSurface {
            log: log.clone(),
            behaviour,
        };
        let status = StatusBoard::new();
        let config = ControllerConfig {
            autoplay: true,
            max_retries,
            retry_delay: Duration::from_millis(2000),
            engine: EngineConfig::default(),
        };
        let (controller, events) =
            PlaybackController::new(config, engines, Box::new(surface), status.clone());
        Self {
            controller,
            events,
            status,
            log,
        }
    }

    fn inject(&mut self, event: PlayerEvent) {
        let generation = self.controller.generation();
        self.controller.handle_event(SessionEvent { generation, event });
    }

    fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }
}

fn channel(name: &str, url: &str) -> Channel {
    Channel {
        name: name.to_string(),
        url: url.to_string(),
        logo: None,
        category: None,
        country: None,
        language: None,
        id: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_retries_back_off_exponentially_then_give_up() {
    let mut h = Harness::new(
        false,
        SurfaceBehaviour {
            refuse_source: true,
            ..Default::default()
        },
    );
    let started = Instant::now();

    h.controller
        .select_channel(channel("Broken", "http://example.com/broken.ts"));
    assert_eq!(
        h.controller.last_scheduled_retry(),
        Some(Duration::from_millis(2000))
    );
    assert_eq!(h.controller.stream_status().state, StreamState::Loading);
    assert_eq!(h.controller.stream_status().message, "Retrying... (1/3)");
    assert_eq!(h.status.message(), "Stream error. Retrying (1/3)...");

    for expected in [4000, 8000] {
        let event = h.events.recv().await.unwrap();
        assert_eq!(event.event, PlayerEvent::RetryDue);
        h.controller.handle_event(event);
        assert_eq!(
            h.controller.last_scheduled_retry(),
            Some(Duration::from_millis(expected))
        );
    }

    let event = h.events.recv().await.unwrap();
    h.controller.handle_event(event);

    assert!(started.elapsed() >= Duration::from_millis(14_000));
    assert_eq!(h.controller.retry_attempts(), 4);
    assert_eq!(h.controller.last_scheduled_retry(), None);
    assert_eq!(h.controller.stream_status().state, StreamState::Error);
    assert_eq!(h.controller.stream_status().message, "Playback failed");
    assert_eq!(
        h.status.message(),
        "Failed to play Broken. Max retries reached (3)"
    );
    assert_eq!(h.status.metrics().failed_streams, 4);

    // Nothing else is scheduled once the budget is spent
    let next = tokio::time::timeout(Duration::from_secs(60), h.events.recv()).await;
    assert!(next.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_manual_retry_from_error_resets_budget() {
    let mut h = Harness::new(false, SurfaceBehaviour::default());
    assert!(!h.controller.retry_current());

    h.controller.select_channel(channel("Flaky", "http://example.com/flaky.ts"));
    for _ in 0..4 {
        h.inject(PlayerEvent::Surface(SurfaceEvent::Error {
            details: "decode failed".to_string(),
        }));
    }
    assert_eq!(h.controller.stream_status().state, StreamState::Error);

    assert!(h.controller.retry_current());
    assert_eq!(h.controller.retry_attempts(), 0);
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
}

#[tokio::test]
async fn test_adaptive_stream_uses_engine() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());

    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));

    assert!(h.controller.has_engine());
    assert_eq!(
        calls(&h.log),
        vec![
            "surface.reset",
            "factory.create",
            "engine.load_source http://example.com/live/index.m3u8",
            "engine.attach_media",
        ]
    );
    assert_eq!(h.controller.stream_status().state, StreamState::Loading);

    h.inject(PlayerEvent::Engine(EngineEvent::ManifestParsed));
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
    assert!(calls(&h.log).contains(&"surface.play".to_string()));
    assert_eq!(h.status.metrics().successful_streams, 1);
}

#[tokio::test]
async fn test_native_surface_waits_for_metadata() {
    let mut h = Harness::new(
        false,
        SurfaceBehaviour {
            native_hls: true,
            ..Default::default()
        },
    );

    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    assert!(!h.controller.has_engine());
    assert_eq!(h.controller.stream_status().state, StreamState::Loading);
    assert_eq!(
        calls(&h.log),
        vec![
            "surface.reset",
            "surface.set_source http://example.com/live/index.m3u8"
        ]
    );

    h.inject(PlayerEvent::Surface(SurfaceEvent::MetadataLoaded));
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
}

#[tokio::test]
async fn test_direct_stream_plays_immediately() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());

    h.controller.select_channel(channel("Radio", "http://example.com/radio.mp3"));

    assert!(!h.controller.has_engine());
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
    assert_eq!(
        calls(&h.log),
        vec![
            "surface.reset",
            "surface.set_source http://example.com/radio.mp3",
            "surface.play",
        ]
    );
}

#[tokio::test]
async fn test_refused_autoplay_still_counts_as_playing() {
    let mut h = Harness::new(
        true,
        SurfaceBehaviour {
            refuse_play: true,
            ..Default::default()
        },
    );

    h.controller.select_channel(channel("Radio", "http://example.com/radio.mp3"));
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
    assert_eq!(
        h.status.message(),
        "Auto-play failed. Click play to start video."
    );

    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    h.inject(PlayerEvent::Engine(EngineEvent::ManifestParsed));
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
    assert_eq!(h.status.message(), "Autoplay blocked. Click play to start.");
}

#[tokio::test]
async fn test_fatal_faults_are_routed_by_kind() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());
    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    h.inject(PlayerEvent::Engine(EngineEvent::ManifestParsed));
    h.clear_log();

    h.inject(PlayerEvent::Engine(EngineEvent::Fault {
        fatal: true,
        kind: FaultKind::Network,
        details: "manifestLoadError".to_string(),
    }));
    assert_eq!(calls(&h.log), vec!["engine.start_load"]);
    assert_eq!(h.status.message(), "Network error. Retrying load...");

    h.clear_log();
    h.inject(PlayerEvent::Engine(EngineEvent::Fault {
        fatal: true,
        kind: FaultKind::Media,
        details: "bufferAppendError".to_string(),
    }));
    assert_eq!(calls(&h.log), vec!["engine.recover_media_error"]);
    assert_eq!(h.status.message(), "Media error. Attempting to recover...");

    // Recovery paths leave the retry budget alone
    assert_eq!(h.controller.retry_attempts(), 0);
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);

    h.inject(PlayerEvent::Engine(EngineEvent::Fault {
        fatal: true,
        kind: FaultKind::Other,
        details: "internalException".to_string(),
    }));
    assert_eq!(h.controller.retry_attempts(), 1);
    assert_eq!(h.controller.stream_status().message, "Retrying... (1/3)");
}

#[tokio::test]
async fn test_non_fatal_faults_change_nothing() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());
    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    h.inject(PlayerEvent::Engine(EngineEvent::ManifestParsed));
    h.clear_log();

    h.inject(PlayerEvent::Engine(EngineEvent::Fault {
        fatal: false,
        kind: FaultKind::Network,
        details: "fragLoadError".to_string(),
    }));

    assert!(calls(&h.log).is_empty());
    assert_eq!(h.controller.retry_attempts(), 0);
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
}

#[tokio::test]
async fn test_stall_rewinds_and_replays() {
    let mut h = Harness::new(
        true,
        SurfaceBehaviour {
            position: 5.0,
            ..Default::default()
        },
    );
    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    h.inject(PlayerEvent::Engine(EngineEvent::ManifestParsed));
    h.clear_log();

    h.inject(PlayerEvent::Engine(EngineEvent::BufferStalled));

    assert_eq!(calls(&h.log), vec!["surface.seek 4.90", "surface.play"]);
    assert_eq!(h.status.message(), "Stream stalled, attempting recovery...");
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
}

#[tokio::test]
async fn test_stall_near_start_only_replays() {
    let mut h = Harness::new(
        true,
        SurfaceBehaviour {
            position: 0.05,
            ..Default::default()
        },
    );
    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    h.clear_log();

    h.inject(PlayerEvent::Engine(EngineEvent::BufferStalled));

    assert_eq!(calls(&h.log), vec!["surface.play"]);
}

#[tokio::test]
async fn test_events_from_replaced_session_are_ignored() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());
    h.controller.select_channel(channel("One", "http://example.com/one.ts"));
    let stale = h.controller.generation();

    h.controller.select_channel(channel("Two", "http://example.com/two.ts"));
    assert!(h.controller.generation() > stale);

    h.controller.handle_event(SessionEvent {
        generation: stale,
        event: PlayerEvent::Surface(SurfaceEvent::Error {
            details: "late error".to_string(),
        }),
    });

    assert_eq!(h.controller.retry_attempts(), 0);
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
    assert_eq!(h.controller.current_channel().unwrap().name, "Two");
}

#[tokio::test]
async fn test_switching_channels_destroys_previous_engine() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());
    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    h.clear_log();

    h.controller.select_channel(channel("Radio", "http://example.com/radio.mp3"));

    let log = calls(&h.log);
    assert_eq!(log[0], "engine.destroy");
    assert_eq!(log[1], "surface.reset");
    assert!(!h.controller.has_engine());
}

#[tokio::test]
async fn test_teardown_without_session_is_a_no_op() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());

    h.controller.teardown();

    assert_eq!(h.controller.generation(), 0);
    assert!(calls(&h.log).is_empty());
    assert_eq!(h.controller.stream_status().state, StreamState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_pending_retry() {
    let mut h = Harness::new(true, SurfaceBehaviour::default());
    h.controller
        .select_channel(channel("Live", "http://example.com/live/index.m3u8"));
    h.inject(PlayerEvent::Engine(EngineEvent::Fault {
        fatal: true,
        kind: FaultKind::Other,
        details: "internalException".to_string(),
    }));
    assert!(h.controller.last_scheduled_retry().is_some());
    h.clear_log();

    h.controller.teardown();
    assert_eq!(calls(&h.log), vec!["engine.destroy", "surface.reset"]);
    assert_eq!(h.controller.stream_status().state, StreamState::Idle);
    assert_eq!(h.controller.stream_status().message, "Ready");
    assert!(h.controller.current_channel().is_none());

    // The timer still fires, but for a session that no longer exists
    let event = h.events.recv().await.unwrap();
    assert_eq!(event.event, PlayerEvent::RetryDue);
    h.controller.handle_event(event);
    assert_eq!(calls(&h.log).len(), 2);
    assert_eq!(h.controller.stream_status().state, StreamState::Idle);
}

#[tokio::test]
async fn test_ended_playback_returns_to_idle() {
    let mut h = Harness::new(false, SurfaceBehaviour::default());
    h.controller.select_channel(channel("Clip", "http://example.com/clip.mp4"));

    h.inject(PlayerEvent::Surface(SurfaceEvent::Ended));

    assert_eq!(h.controller.stream_status().state, StreamState::Idle);
    assert_eq!(h.controller.stream_status().message, "Playback ended");
}

#[tokio::test(start_paused = true)]
async fn test_pending_retry_does_not_revive_exhausted_session() {
    let mut h = Harness::with_max_retries(false, SurfaceBehaviour::default(), 1);
    h.controller.select_channel(channel("Flaky", "http://example.com/flaky.ts"));

    // Both faults land on the same session: the first schedules a retry,
    // the second spends the budget before that retry fires
    for _ in 0..2 {
        h.inject(PlayerEvent::Surface(SurfaceEvent::Error {
            details: "decode failed".to_string(),
        }));
    }
    assert_eq!(h.controller.stream_status().state, StreamState::Error);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let mut delivered = 0;
    while let Ok(event) = h.events.try_recv() {
        delivered += 1;
        h.controller.handle_event(event);
    }

    assert_eq!(delivered, 1);
    assert_eq!(h.controller.stream_status().state, StreamState::Error);
    assert_eq!(h.controller.retry_attempts(), 2);
    assert_eq!(
        calls(&h.log)
            .iter()
            .filter(|call| call.starts_with("surface.set_source"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_teardown_after_bare_start_playback_resets_surface() {
    let mut h = Harness::new(false, SurfaceBehaviour::default());
    h.controller.start_playback("http://example.com/direct.ts");
    assert_eq!(h.controller.stream_status().state, StreamState::Playing);
    let generation = h.controller.generation();
    h.clear_log();

    h.controller.teardown();

    assert_eq!(calls(&h.log), vec!["surface.reset"]);
    assert_eq!(h.controller.stream_status().state, StreamState::Idle);
    assert!(h.controller.generation() > generation);
}

#[tokio::test]
async fn test_run_returns_when_first_attempt_fails_without_budget() {
    let mut h = Harness::with_max_retries(
        false,
        SurfaceBehaviour {
            refuse_source: true,
            ..Default::default()
        },
        0,
    );
    h.controller.select_channel(channel("Missing", "http://example.com/missing.ts"));

    let settled = h
        .controller
        .run_until_settled(&mut h.events, std::future::pending())
        .await;

    assert_eq!(settled, StreamState::Error);
    assert_eq!(
        h.status.message(),
        "Failed to play Missing. Max retries reached (0)"
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_follows_retries_until_exhausted() {
    let mut h = Harness::with_max_retries(
        false,
        SurfaceBehaviour {
            refuse_source: true,
            ..Default::default()
        },
        2,
    );
    h.controller.select_channel(channel("Broken", "http://example.com/broken.ts"));

    let settled = h
        .controller
        .run_until_settled(&mut h.events, std::future::pending())
        .await;

    assert_eq!(settled, StreamState::Error);
    assert_eq!(h.controller.retry_attempts(), 3);
}

#[tokio::test]
async fn test_run_stops_on_end_of_stream() {
    let mut h = Harness::new(false, SurfaceBehaviour::default());
    h.controller.select_channel(channel("Clip", "http://example.com/clip.mp4"));

    let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
    EventSink::new(tx, h.controller.generation()).surface(SurfaceEvent::Ended);

    let settled = h
        .controller
        .run_until_settled(&mut events, std::future::pending())
        .await;

    assert_eq!(settled, StreamState::Idle);
    assert_eq!(h.controller.stream_status().message, "Playback ended");
}

#[tokio::test]
async fn test_run_tears_down_on_shutdown() {
    let mut h = Harness::new(false, SurfaceBehaviour::default());
    h.controller.select_channel(channel("Radio", "http://example.com/radio.mp3"));
    h.clear_log();

    let settled = h
        .controller
        .run_until_settled(&mut h.events, async {})
        .await;

    assert_eq!(settled, StreamState::Idle);
    assert_eq!(calls(&h.log), vec!["surface.reset"]);
    assert!(h.controller.current_channel().is_none());
}
