//! Field-name normalization for upstream catalog payloads.
//!
//! The content service has changed its field names more than once, so every
//! target field is resolved through a fixed priority list of source keys.

use serde_json::{Map, Value};

use crate::{models::CatalogEntry, services::duration::parse_duration_minutes};

/// Envelope keys probed for the list of entries, in priority order
pub const LIST_KEYS: &[&str] = &["podcasts", "items", "data"];

pub const PODCAST_ID_KEYS: &[&str] = &["podcast_id", "podcastId", "id", "contentId", "content_id"];
pub const TITLE_KEYS: &[&str] = &["title", "name"];
pub const CATEGORY_KEYS: &[&str] = &["category", "categoryName"];
pub const TOPICS_KEYS: &[&str] = &["topics", "description", "topic"];
pub const DURATION_KEYS: &[&str] = &["duration_minutes", "durationMinutes", "duration"];
pub const CONTENT_URL_KEYS: &[&str] = &["content_url", "contentUrl", "audioUrl", "audio_url", "url"];

const ALIAS_TABLES: &[&[&str]] = &[
    PODCAST_ID_KEYS,
    TITLE_KEYS,
    CATEGORY_KEYS,
    TOPICS_KEYS,
    DURATION_KEYS,
    CONTENT_URL_KEYS,
];

/// Pulls the list of records out of a response payload.
///
/// Probes [`LIST_KEYS`] in order, descending one level into an object found
/// under one of them. Returns `None` when no list is present.
pub fn extract_list(payload: &Value) -> Option<&Vec<Value>> {
    extract_list_at_depth(payload, 0)
}

fn extract_list_at_depth(payload: &Value, depth: usize) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) if depth < 2 => LIST_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|value| !value.is_null())
            .and_then(|value| extract_list_at_depth(value, depth + 1)),
        _ => None,
    }
}

/// Normalizes a full response payload into catalog entries
pub fn normalize_catalog(payload: &Value) -> Vec<CatalogEntry> {
    let Some(items) = extract_list(payload) else {
        tracing::warn!("No podcast list found in content service response");
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| match item {
            Value::Object(record) => Some(normalize_entry(record, position)),
            _ => {
                tracing::debug!(position, "Skipping non-object catalog record");
                None
            }
        })
        .collect()
}

/// Normalizes one upstream record; `position` backs the synthesized id and title
pub fn normalize_entry(record: &Map<String, Value>, position: usize) -> CatalogEntry {
    let podcast_id = first_present(record, PODCAST_ID_KEYS)
        .and_then(value_to_string)
        .unwrap_or_else(|| position.to_string());

    let title = first_present(record, TITLE_KEYS)
        .and_then(value_to_string)
        .unwrap_or_else(|| format!("Podcast {}", position + 1));

    CatalogEntry {
        podcast_id,
        title,
        category: first_present(record, CATEGORY_KEYS).and_then(value_to_string),
        topics: first_present(record, TOPICS_KEYS).and_then(value_to_string),
        duration_minutes: first_present(record, DURATION_KEYS).and_then(parse_duration_minutes),
        content_url: first_present(record, CONTENT_URL_KEYS).and_then(value_to_string),
        extra: unmapped_fields(record),
    }
}

/// Fields not named by any alias table, kept verbatim
fn unmapped_fields(record: &Map<String, Value>) -> Map<String, Value> {
    record
        .iter()
        .filter(|(key, _)| !ALIAS_TABLES.iter().any(|keys| keys.contains(&key.as_str())))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// First non-null value among `keys`
pub fn first_present<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Coerces scalars to strings; objects, arrays and null have no string form
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
