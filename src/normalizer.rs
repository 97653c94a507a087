use crate::types::{NormalizedItem, RawEntry, Result, SourceConfig};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tracing::warn;

const DEFAULT_TITLE: &str = "TITLE";
const DEFAULT_LINK: &str = "LINK";
const DEFAULT_SUMMARY: &str = "SUMMARY";

/// Capture pattern for the video id in a YouTube watch link.
const VIDEO_ID_PATTERN: &str = r".*youtube\.com/watch.*v=([^&]+)";

pub struct Normalizer {
    video_id: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            video_id: Regex::new(VIDEO_ID_PATTERN).expect("video id pattern"),
        }
    }

    /// Turn one source's raw entries into a normalized, per-source
    /// truncated, most-recent-first item list. Deterministic: entries
    /// without usable time data get phony dates derived from their
    /// position, not from the clock.
    pub fn normalize(
        &self,
        source: &SourceConfig,
        entries: Vec<RawEntry>,
    ) -> Result<Vec<NormalizedItem>> {
        let rewrite = match (&source.regex.pattern, &source.regex.replace) {
            (Some(pattern), Some(replace)) => Some((Regex::new(pattern)?, replace.as_str())),
            _ => None,
        };
        let filter = match &source.filter {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };

        let total = entries.len();
        let mut items = Vec::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let title = entry.title.unwrap_or_else(|| DEFAULT_TITLE.to_string());
            let link = entry.link.unwrap_or_else(|| DEFAULT_LINK.to_string());
            let mut summary = entry.summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string());

            if source.kind.is_youtube() {
                summary = self.youtube_summary(&title, &link, entry.media_description.as_deref());
            }

            let title = match &rewrite {
                Some((pattern, replace)) => pattern.replace_all(&title, *replace).into_owned(),
                None => title,
            };

            // Prefix-anchored match on the rewritten title, before the
            // prefix is applied.
            if let Some(filter) = &filter {
                if !matches_at_start(filter, &title) {
                    continue;
                }
            }

            let title = format!("{}{}", source.prefix, title);

            let published = entry
                .published_parsed
                .or_else(|| entry.published.as_deref().and_then(parse_time));
            let published = match published {
                Some(time) => time,
                None => {
                    let phony = phony_date(total, index);
                    warn!(
                        "Incorrect entry in \"{}\": \"{}\" - no time data. Adding a phony date: {}",
                        source.name, title, phony
                    );
                    phony
                }
            };

            items.push(NormalizedItem {
                title,
                link,
                summary,
                published,
            });
        }

        // Stable sort: equal timestamps keep their input order.
        items.sort_by(|a, b| b.published.cmp(&a.published));
        items.truncate(source.size);
        Ok(items)
    }

    fn youtube_summary(&self, title: &str, link: &str, media_description: Option<&str>) -> String {
        let video_id = self
            .video_id
            .captures(link)
            .and_then(|captures| captures.get(1))
            .map_or(link, |m| m.as_str());

        let mut summary = format!(
            "<h1>{}</h1>\
             <iframe id=\"ytplayer\" type=\"text/html\" width=\"640\" height=\"390\" \
             src=\"https://www.youtube.com/embed/{}\"/>",
            title, video_id
        );
        if let Some(description) = media_description {
            summary.push_str(&format!("<p>{}</p>", description));
        }
        summary
    }
}

fn matches_at_start(pattern: &Regex, text: &str) -> bool {
    pattern.find(text).is_some_and(|m| m.start() == 0)
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Phony timestamps count down in whole days from a fixed anchor just
/// above the Unix epoch: the first entry of the source gets the most
/// recent date, so relative within-source ordering survives the sort.
fn phony_date(total: usize, index: usize) -> DateTime<Utc> {
    let anchor = DateTime::<Utc>::from_timestamp(1, 0).expect("epoch anchor");
    anchor + Duration::days((total - index) as i64)
}
