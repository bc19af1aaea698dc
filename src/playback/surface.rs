use super::EventSink;
use crate::errors::PlaybackResult;

/// Where the stream is rendered
///
/// A surface reports `MetadataLoaded`, `Error` and `Ended` through the sink
/// passed to [`MediaSurface::set_source`].
pub trait MediaSurface: Send {
    /// Whether HLS playlists can be handed to the surface without an engine
    fn supports_native_hls(&self) -> bool;

    /// Drop the current source and return to an empty state
    fn reset(&mut self);

    fn set_source(&mut self, url: &str, events: EventSink) -> PlaybackResult<()>;

    /// Request playback; refusal is reported as `AutoplayBlocked`
    fn play(&mut self) -> PlaybackResult<()>;

    /// Current playback position in seconds
    fn position(&self) -> f64;

    fn seek(&mut self, position: f64);
}
