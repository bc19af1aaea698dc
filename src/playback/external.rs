use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::surface::MediaSurface;
use super::{EventSink, SurfaceEvent};
use crate::config::PlayerConfig;
use crate::errors::{PlaybackError, PlaybackResult};
use crate::utils::url::UrlUtils;

/// Player surface backed by an external media player process
///
/// Setting a source spawns `command [args...] <url>`; the process is killed
/// when the surface is reset. A successful spawn is reported as
/// `MetadataLoaded`. A non-zero exit becomes a surface `Error`, carrying the
/// last line the player wrote to stderr, and a clean exit becomes `Ended`.
pub struct ExternalPlayer {
    command: String,
    args: Vec<String>,
    native_hls: bool,
    running: Option<RunningPlayer>,
}

struct RunningPlayer {
    url: String,
    // Dropping the sender stops the monitor, which kills the process
    _stop: oneshot::Sender<()>,
}

impl ExternalPlayer {
    pub fn new<S: Into<String>>(command: S, args: Vec<String>, native_hls: bool) -> Self {
        Self {
            command: command.into(),
            args,
            native_hls,
            running: None,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone(), config.native_hls)
    }

    /// URL of the stream the player process was started with
    pub fn current_url(&self) -> Option<&str> {
        self.running.as_ref().map(|running| running.url.as_str())
    }
}

impl MediaSurface for ExternalPlayer {
    fn supports_native_hls(&self) -> bool {
        self.native_hls
    }

    fn reset(&mut self) {
        if let Some(running) = self.running.take() {
            debug!(
                "Stopping player for {}",
                UrlUtils::obfuscate_credentials(&running.url)
            );
        }
    }

    fn set_source(&mut self, url: &str, events: EventSink) -> PlaybackResult<()> {
        self.reset();

        debug!("Starting {} with args: {:?}", self.command, self.args);
        let mut cmd = TokioCommand::new(&self.command);
        cmd.args(&self.args);
        cmd.arg(url);
        cmd.kill_on_drop(true);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| PlaybackError::surface(format!("Failed to start {}: {e}", self.command)))?;

        info!(
            "Started {} (pid {:?}) for {}",
            self.command,
            child.id(),
            UrlUtils::obfuscate_credentials(url)
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        events.surface(SurfaceEvent::MetadataLoaded);
        tokio::spawn(monitor_player(child, stop_rx, events));

        self.running = Some(RunningPlayer {
            url: url.to_string(),
            _stop: stop_tx,
        });
        Ok(())
    }

    fn play(&mut self) -> PlaybackResult<()> {
        if self.running.is_some() {
            Ok(())
        } else {
            Err(PlaybackError::AutoplayBlocked {
                message: "no player process is running".to_string(),
            })
        }
    }

    fn position(&self) -> f64 {
        0.0
    }

    fn seek(&mut self, position: f64) {
        debug!("External player does not support seeking (requested {:.1}s)", position);
    }
}

/// Wait for the player to exit or be stopped, reporting the outcome
async fn monitor_player(mut child: Child, stop: oneshot::Receiver<()>, events: EventSink) {
    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut last_line = None;
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("player: {}", line);
                if !line.trim().is_empty() {
                    last_line = Some(line);
                }
            }
            last_line
        })
    });

    tokio::select! {
        status = child.wait() => {
            let last_line = match stderr_task {
                Some(task) => task.await.ok().flatten(),
                None => None,
            };
            match status {
                Ok(status) if status.success() => {
                    info!("Player exited normally");
                    events.surface(SurfaceEvent::Ended);
                }
                Ok(status) => {
                    let details = match last_line {
                        Some(line) => format!("player exited with {status}: {line}"),
                        None => format!("player exited with {status}"),
                    };
                    events.surface(SurfaceEvent::Error { details });
                }
                Err(e) => {
                    events.surface(SurfaceEvent::Error {
                        details: format!("failed to wait for player: {e}"),
                    });
                }
            }
        }
        _ = stop => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill player process: {}", e);
            }
        }
    }
}
