use crate::types::{FeedDocument, MergeError, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Built-in defaults for a configuration document. The `outputs` value
/// is applied element-wise to every output feed, and its nested `feeds`
/// value element-wise to every source.
pub fn builtin_defaults() -> Value {
    json!({
        "outputs": {
            "title": "Feed",
            "link": "",
            "summary": "RSSfeed",
            "size": 30,

            "feeds": {
                "name": "Feed",

                "type": "normal",
                "source": "",

                "size": 6,

                "prefix": "",
                "regex": {
                    "pattern": null,
                    "replace": null
                },
                "filter": null
            }
        }
    })
}

/// Recursively fill `data` with `defaults`. Object keys present only in
/// `defaults` are copied in; keys present in both recurse. Arrays apply
/// the same `defaults` to every element. Scalars are never merged: any
/// present value, including null, wins over the default.
pub fn fill_with_defaults(data: &mut Value, defaults: &Value) {
    match data {
        Value::Object(map) => {
            if let Value::Object(default_map) = defaults {
                for (key, default_value) in default_map {
                    match map.get_mut(key) {
                        Some(existing) => fill_with_defaults(existing, default_value),
                        None => {
                            map.insert(key.clone(), default_value.clone());
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                fill_with_defaults(item, defaults);
            }
        }
        _ => {}
    }
}

/// Apply defaulting to a raw document and deserialize it. The
/// document's own `defaults` section fills first so it takes priority
/// over the built-ins; explicit per-item values win over both.
pub fn parse_document(mut value: Value) -> Result<FeedDocument> {
    if let Some(declared) = value.get("defaults").cloned() {
        debug!("Applying document-declared defaults");
        fill_with_defaults(&mut value, &json!({ "outputs": declared }));
    }
    fill_with_defaults(&mut value, &builtin_defaults());

    let document = serde_json::from_value(value)?;
    Ok(document)
}

pub fn load_document(path: &Path) -> Result<FeedDocument> {
    let raw = fs::read_to_string(path).map_err(|e| {
        MergeError::Config(format!("cannot read \"{}\": {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| {
        MergeError::Config(format!("cannot parse \"{}\": {}", path.display(), e))
    })?;
    parse_document(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;

    #[test]
    fn fills_absent_keys_recursively() {
        let mut data = json!({ "a": 1, "nested": { "x": "keep" } });
        let defaults = json!({ "a": 0, "b": 2, "nested": { "x": "drop", "y": 3 } });

        fill_with_defaults(&mut data, &defaults);

        assert_eq!(data, json!({ "a": 1, "b": 2, "nested": { "x": "keep", "y": 3 } }));
    }

    #[test]
    fn defaulting_is_idempotent() {
        let defaults = json!({ "a": 1, "list": { "k": "v" } });
        let mut once = json!({ "list": [{}, { "k": "own" }] });
        fill_with_defaults(&mut once, &defaults);

        let mut twice = once.clone();
        fill_with_defaults(&mut twice, &defaults);

        assert_eq!(once, twice);
    }

    #[test]
    fn explicit_falsy_scalars_survive() {
        let mut data = json!({ "title": "", "size": 0, "flag": false });
        let defaults = json!({ "title": "Feed", "size": 30, "flag": true });

        fill_with_defaults(&mut data, &defaults);

        assert_eq!(data, json!({ "title": "", "size": 0, "flag": false }));
    }

    #[test]
    fn explicit_null_is_not_absence() {
        let mut data = json!({ "filter": null });
        fill_with_defaults(&mut data, &json!({ "filter": "^A" }));

        assert_eq!(data, json!({ "filter": null }));
    }

    #[test]
    fn arrays_default_element_wise() {
        let mut data = json!([{ "size": 1 }, {}]);
        fill_with_defaults(&mut data, &json!({ "size": 6, "prefix": "" }));

        assert_eq!(
            data,
            json!([{ "size": 1, "prefix": "" }, { "size": 6, "prefix": "" }])
        );
    }

    #[test]
    fn unknown_keys_pass_through() {
        let mut data = json!({ "extra": [1, 2, 3] });
        fill_with_defaults(&mut data, &json!({ "size": 6 }));

        assert_eq!(data, json!({ "extra": [1, 2, 3], "size": 6 }));
    }

    #[test]
    fn parses_minimal_document_with_builtin_defaults() {
        let doc = parse_document(json!({
            "outputs": [{
                "feeds": [{ "source": "https://example.com/feed.xml" }]
            }]
        }))
        .unwrap();

        let output = &doc.outputs[0];
        assert_eq!(output.title, "Feed");
        assert_eq!(output.summary, "RSSfeed");
        assert_eq!(output.size, 30);

        let source = &output.feeds[0];
        assert_eq!(source.name, "Feed");
        assert_eq!(source.kind, SourceType::Normal);
        assert_eq!(source.size, 6);
        assert_eq!(source.prefix, "");
        assert!(source.regex.pattern.is_none());
        assert!(source.filter.is_none());
    }

    #[test]
    fn document_defaults_beat_builtins_but_not_explicit_values() {
        let doc = parse_document(json!({
            "defaults": {
                "size": 10,
                "feeds": { "size": 3, "prefix": "[d] " }
            },
            "outputs": [{
                "feeds": [
                    { "source": "a" },
                    { "source": "b", "size": 8 }
                ]
            }]
        }))
        .unwrap();

        let output = &doc.outputs[0];
        assert_eq!(output.size, 10);
        assert_eq!(output.feeds[0].size, 3);
        assert_eq!(output.feeds[0].prefix, "[d] ");
        assert_eq!(output.feeds[1].size, 8);
    }

    #[test]
    fn youtube_source_types_deserialize() {
        let doc = parse_document(json!({
            "outputs": [{
                "feeds": [
                    { "type": "youtube", "source": "CHANNEL" },
                    { "type": "youtube-playlist", "source": "PLAYLIST" }
                ]
            }]
        }))
        .unwrap();

        assert_eq!(doc.outputs[0].feeds[0].kind, SourceType::Youtube);
        assert_eq!(doc.outputs[0].feeds[1].kind, SourceType::YoutubePlaylist);
    }
}
