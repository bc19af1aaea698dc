//! Playlist sources: the M3U parser and the cache-aware loader

pub mod attributes;
pub mod loader;
pub mod m3u;

pub use loader::PlaylistLoader;
pub use m3u::{M3uParser, ParseOutcome, ParseWarning, parse, parse_with_limit};
