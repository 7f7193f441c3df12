//! JSON feeds: a `value` array plus count and next-link annotations

use serde_json::{Map, Value};
use tracing::debug;

use super::entry::{entry_from_object, entry_to_object};
use super::{as_object, context_url, control, control_str};
use crate::config::{JsonMetadata, ODataVersion};
use crate::constants::{JSON_COUNT, JSON_NEXT_LINK, JSON_VALUE};
use crate::error::{CodecError, Result};
use crate::resource::FeedResource;

/// Read the count annotation; V3 writes it as a string
pub(crate) fn read_count(obj: &Map<String, Value>) -> Result<Option<u64>> {
    match control(obj, JSON_COUNT) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| CodecError::MalformedPayload(format!("invalid count {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| CodecError::MalformedPayload(format!("invalid count '{s}'"))),
        Some(other) => Err(CodecError::MalformedPayload(format!(
            "invalid count {other}"
        ))),
    }
}

/// Read the feed-level members (everything except the entries)
pub(crate) fn envelope_from_object(obj: &Map<String, Value>) -> Result<FeedResource> {
    let mut feed = FeedResource::new();
    feed.metadata = context_url(obj);
    feed.count = read_count(obj)?;
    feed.next = control_str(obj, JSON_NEXT_LINK);
    Ok(feed)
}

/// Read a JSON feed object
pub fn feed_from_object(obj: &Map<String, Value>, version: ODataVersion) -> Result<FeedResource> {
    let mut feed = envelope_from_object(obj)?;
    let items = obj
        .get(JSON_VALUE)
        .and_then(Value::as_array)
        .ok_or_else(|| CodecError::MissingRequiredElement(JSON_VALUE.to_string()))?;
    for item in items {
        feed.entries.push(entry_from_object(as_object(item)?, version)?);
    }
    debug!("Read JSON feed with {} entries", feed.entries.len());
    Ok(feed)
}

/// Write a feed as a JSON object
pub fn feed_to_object(
    feed: &FeedResource,
    version: ODataVersion,
    metadata: JsonMetadata,
) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    if metadata != JsonMetadata::None {
        if let Some(context) = &feed.metadata {
            out.insert(version.metadata_key().to_string(), Value::from(context.as_str()));
        }
    }
    if let Some(count) = feed.count {
        let count = match version {
            ODataVersion::V3 => Value::String(count.to_string()),
            ODataVersion::V4 => Value::from(count),
        };
        out.insert(version.annotation(JSON_COUNT), count);
    }

    let entries = feed
        .entries
        .iter()
        .map(|entry| entry_to_object(entry, version, metadata).map(Value::Object))
        .collect::<Result<Vec<_>>>()?;
    out.insert(JSON_VALUE.to_string(), Value::Array(entries));

    if let Some(next) = &feed.next {
        out.insert(version.annotation(JSON_NEXT_LINK), Value::from(next.as_str()));
    }
    Ok(out)
}
