//! JSON codec for entries, feeds and standalone properties
//!
//! Both the V3 (`odata.*`) and V4 (`@odata.*`) spellings of control
//! annotations are accepted on read; writing uses the configured version.

pub mod entry;
pub mod feed;
pub mod property;

use serde_json::{Map, Value};

use crate::config::{JsonMetadata, ODataVersion};
use crate::constants::{JSON_CONTEXT_V4, JSON_METADATA, JSON_VALUE};
use crate::error::{CodecError, Result};
use crate::resource::Resource;
use crate::tree::json::is_annotation_key;

pub use entry::{entry_from_object, entry_to_object};
pub use feed::{feed_from_object, feed_to_object};
pub use property::{property_from_value, property_to_value};

/// Parse a JSON entry or feed
///
/// An object whose only non-annotation member is a `value` array is read as
/// a feed; anything else is an entry.
pub fn deserialize(bytes: &[u8], version: ODataVersion) -> Result<Resource> {
    let value: Value = serde_json::from_slice(bytes)?;
    let obj = as_object(&value)?;
    if is_feed_object(obj) {
        Ok(Resource::Feed(feed_from_object(obj, version)?))
    } else {
        Ok(Resource::Entry(entry_from_object(obj, version)?))
    }
}

/// Serialize an entry or feed to compact JSON
pub fn serialize(
    resource: &Resource,
    version: ODataVersion,
    metadata: JsonMetadata,
) -> Result<Vec<u8>> {
    let obj = match resource {
        Resource::Entry(entry) => entry_to_object(entry, version, metadata)?,
        Resource::Feed(feed) => feed_to_object(feed, version, metadata)?,
    };
    Ok(serde_json::to_vec(&Value::Object(obj))?)
}

pub(crate) fn as_object(value: &Value) -> Result<&Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        CodecError::MalformedPayload(format!("expected a JSON object, found {}", kind_of(value)))
    })
}

pub(crate) fn is_feed_object(obj: &Map<String, Value>) -> bool {
    obj.get(JSON_VALUE).is_some_and(Value::is_array)
        && obj
            .keys()
            .all(|k| k == JSON_VALUE || is_annotation_key(k))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Control annotation `name` (unprefixed spelling) in either version's form
pub(crate) fn control<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).or_else(|| obj.get(&format!("@{name}")))
}

pub(crate) fn control_str(obj: &Map<String, Value>, name: &str) -> Option<String> {
    control(obj, name).and_then(Value::as_str).map(str::to_string)
}

/// Metadata / context URL of a payload
pub(crate) fn context_url(obj: &Map<String, Value>) -> Option<String> {
    [JSON_METADATA, JSON_CONTEXT_V4, "odata.context"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Split `Name@odata.term` into the property name and the bare term
pub(crate) fn split_property_annotation(key: &str) -> Option<(&str, &str)> {
    let (name, term) = key.split_once('@')?;
    if name.is_empty() {
        return None;
    }
    Some((name, term.strip_prefix("odata.").unwrap_or(term)))
}
