use crate::types::{MergeError, NormalizedItem, OutputFeedConfig, Result};
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};
use std::io::Write;
use tracing::info;

/// Serialize a merged item list as an RSS 2.0 document. `now` becomes
/// the channel's lastBuildDate; each item's guid is its link.
pub fn write_channel(
    output: &OutputFeedConfig,
    items: &[NormalizedItem],
    now: DateTime<Utc>,
    encoding_label: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let encoding = Encoding::for_label(encoding_label.as_bytes()).ok_or_else(|| {
        MergeError::Config(format!("unknown output encoding: {}", encoding_label))
    })?;

    let rss_items = items
        .iter()
        .map(|item| {
            ItemBuilder::default()
                .title(Some(item.title.clone()))
                .link(Some(item.link.clone()))
                .description(Some(item.summary.clone()))
                .guid(Some(
                    GuidBuilder::default()
                        .value(item.link.clone())
                        .permalink(true)
                        .build(),
                ))
                .pub_date(Some(item.published.to_rfc2822()))
                .build()
        })
        .collect::<Vec<_>>();

    let channel = ChannelBuilder::default()
        .title(output.title.clone())
        .link(output.link.clone())
        .description(output.summary.clone())
        .last_build_date(Some(now.to_rfc2822()))
        .items(rss_items)
        .build();

    info!(
        "Writing feed \"{}\" ({} items, encoding: {})",
        output.title,
        items.len(),
        encoding.name()
    );

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"{}\"?>{}",
        encoding.name(),
        channel
    );
    let (encoded, _, _) = encoding.encode(&document);
    out.write_all(&encoded)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn output() -> OutputFeedConfig {
        OutputFeedConfig {
            title: "Merged".to_string(),
            link: "https://example.com".to_string(),
            summary: "RSSfeed".to_string(),
            size: 30,
            output: None,
            feeds: Vec::new(),
        }
    }

    fn item() -> NormalizedItem {
        NormalizedItem {
            title: "An item".to_string(),
            link: "https://example.com/an-item".to_string(),
            summary: "body".to_string(),
            published: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn guid_is_the_item_link() {
        let mut buf = Vec::new();
        write_channel(&output(), &[item()], Utc::now(), "utf-8", &mut buf).unwrap();

        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.contains("<guid>https://example.com/an-item</guid>"));
        assert!(xml.contains("<pubDate>Mon, 5 Jan 2026 10:00:00 +0000</pubDate>"));
    }

    #[test]
    fn declares_the_output_encoding() {
        let mut buf = Vec::new();
        write_channel(&output(), &[], Utc::now(), "utf-8", &mut buf).unwrap();

        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<title>Merged</title>"));
        assert!(xml.contains("<description>RSSfeed</description>"));
    }

    #[test]
    fn unknown_encoding_label_is_a_config_error() {
        let mut buf = Vec::new();
        let result = write_channel(&output(), &[], Utc::now(), "not-an-encoding", &mut buf);

        assert!(matches!(result, Err(MergeError::Config(_))));
    }
}
