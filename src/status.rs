//! Shared status line and performance counters
//!
//! Every layer reports user-facing progress through a [`StatusBoard`]. The
//! latest message is published on a `watch` channel so a front end can follow
//! it, and each update is logged at info level.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::info;

use crate::models::PerformanceMetrics;

pub const INITIAL_STATUS: &str = "Ready";

#[derive(Debug, Default)]
struct Counters {
    total_channels: AtomicUsize,
    loaded_playlists: AtomicUsize,
    successful_streams: AtomicUsize,
    failed_streams: AtomicUsize,
}

/// Cheaply cloneable handle to the status line and metrics
#[derive(Debug, Clone)]
pub struct StatusBoard {
    message: Arc<watch::Sender<String>>,
    counters: Arc<Counters>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (message, _) = watch::channel(INITIAL_STATUS.to_string());
        Self {
            message: Arc::new(message),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Replace the status line
    pub fn update<S: Into<String>>(&self, message: S) {
        let message = message.into();
        info!("Status: {}", message);
        self.message.send_replace(message);
    }

    pub fn message(&self) -> String {
        self.message.borrow().clone()
    }

    /// Follow status updates as they happen
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.message.subscribe()
    }

    pub fn set_total_channels(&self, total: usize) {
        self.counters.total_channels.store(total, Ordering::Relaxed);
    }

    pub fn record_loaded_playlist(&self) {
        self.counters.loaded_playlists.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_successful_stream(&self) {
        self.counters.successful_streams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_stream(&self) {
        self.counters.failed_streams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            total_channels: self.counters.total_channels.load(Ordering::Relaxed),
            loaded_playlists: self.counters.loaded_playlists.load(Ordering::Relaxed),
            successful_streams: self.counters.successful_streams.load(Ordering::Relaxed),
            failed_streams: self.counters.failed_streams.load(Ordering::Relaxed),
        }
    }
}
