use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

/// Fully-defaulted configuration document: an optional `defaults`
/// section (consumed during loading) and the output feeds to build.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDocument {
    #[serde(default)]
    pub outputs: Vec<OutputFeedConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputFeedConfig {
    pub title: String,
    pub link: String,
    pub summary: String,
    /// Item cap for the merged output; truncation keeps the most recent.
    pub size: usize,
    /// Destination path for this feed. Absent = CLI `-o` or stdout.
    #[serde(default)]
    pub output: Option<PathBuf>,
    pub feeds: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub source: String,
    /// Item cap for this source alone, applied before merging.
    pub size: usize,
    pub prefix: String,
    pub regex: RegexConfig,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    Normal,
    Youtube,
    YoutubePlaylist,
}

impl SourceType {
    pub fn is_youtube(self) -> bool {
        matches!(self, SourceType::Youtube | SourceType::YoutubePlaylist)
    }
}

/// Title rewrite rule; only active when both fields are set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegexConfig {
    pub pattern: Option<String>,
    pub replace: Option<String>,
}

/// One entry as returned by the fetch+parse step, before normalization.
/// Everything is optional; upstream feeds omit fields freely.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub media_description: Option<String>,
    pub published: Option<String>,
    pub published_parsed: Option<DateTime<Utc>>,
}

/// Parsed source document. `malformed` is the bozo flag: the document
/// needed a lenient reparse, but whatever entries survived are usable.
#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    pub entries: Vec<RawEntry>,
    pub malformed: bool,
}

/// Fully-populated item ready for merging and serialization. The one
/// timestamp is both the sort key and the rendered pubDate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            // Some feed hosts reject non-browser agents.
            user_agent: "Mozilla/5.0".to_string(),
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, MergeError>;
