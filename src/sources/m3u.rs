//! M3U playlist parser
//!
//! A single-pass, line-oriented scanner for extended M3U playlists. Each
//! `#EXTINF:` directive opens a pending record; the next non-comment line is
//! its stream URL. Malformed input never aborts the parse: problems are
//! collected as [`ParseWarning`]s and the scanner moves on to the next line.

use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

use super::attributes::{parse_attributes, title_separator};
use crate::models::{Channel, UNKNOWN_CHANNEL_NAME};

/// Playlist header expected on the first line
pub const HEADER_MARKER: &str = "#EXTM3U";

/// Directive introducing channel metadata
pub const DIRECTIVE_MARKER: &str = "#EXTINF:";

const COMMENT_MARKER: char = '#';
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Non-fatal problems found while scanning a playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// The first line is not the `#EXTM3U` header
    MissingHeader,
    /// A directive was followed by a URL line that is not a valid URL
    InvalidChannelUrl {
        line: usize,
        name: String,
        url: String,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MissingHeader => write!(f, "may not be a valid M3U file"),
            ParseWarning::InvalidChannelUrl { line, name, url } => {
                write!(f, "invalid URL for channel {name} at line {line}: {url}")
            }
        }
    }
}

/// Channels in source order plus everything the scanner complained about
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub channels: Vec<Channel>,
    pub warnings: Vec<ParseWarning>,
}

/// Metadata accumulated since the last directive line
#[derive(Debug, Default)]
struct PendingChannel {
    name: String,
    logo: Option<String>,
    category: Option<String>,
    country: Option<String>,
    language: Option<String>,
    id: Option<String>,
}

impl PendingChannel {
    fn into_channel(self, url: String) -> Channel {
        Channel {
            name: self.name,
            url,
            logo: self.logo,
            category: self.category,
            country: self.country,
            language: self.language,
            id: self.id,
        }
    }
}

/// M3U parser
///
/// The parser never deduplicates and never fails. An optional limit stops
/// the scan once that many channels were emitted; the output is identical
/// to truncating a full parse.
#[derive(Debug, Clone, Default)]
pub struct M3uParser {
    source: String,
    limit: Option<usize>,
}

impl M3uParser {
    /// Create a parser; `source` only labels log lines
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self {
            source: source.into(),
            limit: None,
        }
    }

    /// Stop after `limit` channels
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parse playlist text into channels and warnings
    pub fn parse(&self, content: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let mut pending: Option<PendingChannel> = None;
        let content = content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content);

        debug!("Starting M3U parsing for source: {}", self.source);

        let has_header = content
            .lines()
            .next()
            .is_some_and(|first| first.trim().starts_with(HEADER_MARKER));
        if !has_header {
            warn!("Warning: File from {} may not be a valid M3U file", self.source);
            outcome.warnings.push(ParseWarning::MissingHeader);
        }

        for (line_num, line) in content.lines().enumerate() {
            if self.limit.is_some_and(|limit| outcome.channels.len() >= limit) {
                debug!(
                    "Channel limit reached at line {}, stopping parse of {}",
                    line_num + 1,
                    self.source
                );
                break;
            }

            let line = line.trim();

            if line.starts_with(DIRECTIVE_MARKER) {
                if let Some(previous) = pending.take() {
                    debug!(
                        "Discarding channel '{}' without stream URL before line {}",
                        previous.name,
                        line_num + 1
                    );
                }
                pending = Some(Self::parse_directive(line));
            } else if !line.is_empty() && !line.starts_with(COMMENT_MARKER) {
                let Some(channel) = pending.take() else {
                    debug!("Ignoring stream URL without directive at line {}: {}", line_num + 1, line);
                    continue;
                };

                if is_valid_stream_url(line) {
                    outcome.channels.push(channel.into_channel(line.to_string()));
                } else {
                    warn!("Invalid URL for channel {}: {}", channel.name, line);
                    outcome.warnings.push(ParseWarning::InvalidChannelUrl {
                        line: line_num + 1,
                        name: channel.name,
                        url: line.to_string(),
                    });
                }
            }
        }

        info!(
            "Parsed {} channels from M3U source: {}",
            outcome.channels.len(),
            self.source
        );
        outcome
    }

    /// Extract name and attributes from an `#EXTINF:` line
    fn parse_directive(line: &str) -> PendingChannel {
        let content = line.strip_prefix(DIRECTIVE_MARKER).unwrap_or(line);

        // Title follows the last unquoted comma; attributes sit before it
        let (attrs_part, title) = match title_separator(content) {
            Some(pos) => (&content[..pos], content[pos + 1..].trim()),
            None => (content, ""),
        };

        let name = if title.is_empty() {
            UNKNOWN_CHANNEL_NAME.to_string()
        } else {
            title.to_string()
        };

        let mut attributes = parse_attributes(attrs_part);

        PendingChannel {
            name,
            logo: attributes.remove("tvg-logo"),
            category: attributes
                .remove("group-title")
                .map(|group| group.to_lowercase().trim().to_string())
                .filter(|group| !group.is_empty()),
            country: attributes.remove("tvg-country"),
            language: attributes.remove("tvg-language"),
            id: attributes.remove("tvg-id"),
        }
    }
}

/// Parse playlist text into channels, in source order
pub fn parse(content: &str) -> Vec<Channel> {
    M3uParser::new("inline").parse(content).channels
}

/// Parse at most `limit` channels
pub fn parse_with_limit(content: &str, limit: usize) -> Vec<Channel> {
    M3uParser::new("inline").with_limit(limit).parse(content).channels
}

/// A stream URL must be absolute; hierarchical URLs also need a host
pub fn is_valid_stream_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok_and(|url| url.cannot_be_a_base() || url.has_host())
}
