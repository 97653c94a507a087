use crate::types::{FetchConfig, FetchedFeed, RawEntry, Result, SourceConfig, SourceType};
use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Seam between the Aggregator and the network, so tests can stub
/// sources without spinning up HTTP servers.
#[async_trait]
pub trait FetchSource: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Result<FetchedFeed>;
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Resolve a source configuration to the URL to fetch. YouTube
    /// types carry a channel or playlist id, not a URL.
    pub fn resolve_url(source: &SourceConfig) -> String {
        match source.kind {
            SourceType::Normal => source.source.clone(),
            SourceType::Youtube => format!(
                "https://www.youtube.com/feeds/videos.xml?channel_id={}",
                source.source
            ),
            SourceType::YoutubePlaylist => format!(
                "https://www.youtube.com/feeds/videos.xml?playlist_id={}",
                source.source
            ),
        }
    }
}

#[async_trait]
impl FetchSource for Fetcher {
    async fn fetch(&self, source: &SourceConfig) -> Result<FetchedFeed> {
        let url = Self::resolve_url(source);
        info!("Fetching feed \"{}\": {}", source.name, url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let content = response.text().await?;
        debug!("Fetched {} bytes from {}", content.len(), url);

        Ok(parse_feed(&content, &url))
    }
}

/// Parse a fetched document, tolerating malformed input. A failed parse
/// is retried once on sanitized content; if that succeeds the result
/// carries the bozo flag but its entries are still used. Nothing here
/// errors: an unrecoverable document degrades to zero entries.
pub(crate) fn parse_feed(content: &str, url: &str) -> FetchedFeed {
    let fetched = match parser::parse(content.as_bytes()) {
        Ok(feed) => FetchedFeed {
            entries: feed.entries.into_iter().map(convert_entry).collect(),
            malformed: false,
        },
        Err(parse_error) => {
            debug!("Parse failed for {}, retrying on sanitized content: {}", url, parse_error);
            match parser::parse(sanitize(content).as_bytes()) {
                Ok(feed) => FetchedFeed {
                    entries: feed.entries.into_iter().map(convert_entry).collect(),
                    malformed: true,
                },
                Err(_) => FetchedFeed {
                    entries: Vec::new(),
                    malformed: true,
                },
            }
        }
    };

    if fetched.malformed {
        if fetched.entries.is_empty() {
            error!("Error with an RSS feed, no elements found: \"{}\"", url);
        } else {
            warn!(
                "There is an error with the feed \"{}\": recovered {} entries",
                url,
                fetched.entries.len()
            );
        }
    } else if fetched.entries.is_empty() {
        warn!("Feed is empty: \"{}\"", url);
    }

    fetched
}

fn convert_entry(entry: feed_rs::model::Entry) -> RawEntry {
    let media_description = entry
        .media
        .iter()
        .find_map(|media| media.description.as_ref().map(|d| d.content.clone()));
    RawEntry {
        title: entry.title.map(|t| t.content),
        link: entry.links.first().map(|l| l.href.clone()),
        summary: entry.summary.map(|s| s.content),
        media_description,
        // feed-rs surfaces publish dates already parsed; the textual
        // `published` field is for entries whose producer only has a
        // date string, and stays empty here.
        published: None,
        published_parsed: entry.published.map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Best-effort cleanup for documents feed-rs rejects outright: strip
/// control characters and anything before the first tag.
fn sanitize(content: &str) -> String {
    let cleaned: String = content
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();

    match cleaned.find('<') {
        Some(start) => cleaned[start..].to_string(),
        None => cleaned,
    }
}
