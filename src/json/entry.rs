//! JSON entries
//!
//! Control information lives in `odata.*` members (V4: `@odata.*`), link
//! information in property annotations such as
//! `Orders@odata.navigationLinkUrl`, and operations in `#Namespace.Name`
//! members. Everything else is a property and goes through the tree builder.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{context_url, control, control_str, split_property_annotation};
use crate::config::{JsonMetadata, ODataVersion};
use crate::constants::{
    JSON_ASSOCIATION_LINK, JSON_BIND, JSON_EDIT_LINK, JSON_ETAG, JSON_ID, JSON_MEDIA_CONTENT_TYPE,
    JSON_MEDIA_EDIT_LINK, JSON_MEDIA_READ_LINK, JSON_NAVIGATION_LINK, JSON_READ_LINK, JSON_TYPE,
};
use crate::error::{CodecError, Result};
use crate::resource::{
    EntryResource, FeedResource, Inline, LinkResource, LinkType, Operation, OperationKind,
};
use crate::tree::json::{
    JsonTreeBuilder, annotation_type_name, is_annotation_key, object_type_annotation,
};

// Bare annotation terms, as found after `Name@` with the `odata.` prefix removed
const TERM_NAVIGATION_LINK_URL: &str = "navigationLinkUrl";
const TERM_NAVIGATION_LINK: &str = "navigationLink";
const TERM_ASSOCIATION_LINK_URL: &str = "associationLinkUrl";
const TERM_ASSOCIATION_LINK: &str = "associationLink";
const TERM_BIND: &str = "bind";
const TERM_MEDIA_EDIT_LINK: &str = "mediaEditLink";
const TERM_MEDIA_READ_LINK: &str = "mediaReadLink";

const OPERATION_TITLE: &str = "title";
const OPERATION_TARGET: &str = "target";

fn is_navigation_term(term: &str) -> bool {
    term == TERM_NAVIGATION_LINK_URL || term == TERM_NAVIGATION_LINK
}

/// Whether `name` carries a navigation link annotation in `obj`
fn has_navigation_annotation(obj: &Map<String, Value>, name: &str) -> bool {
    obj.keys().any(|key| {
        split_property_annotation(key)
            .is_some_and(|(prop, term)| prop == name && is_navigation_term(term))
    })
}

/// Whether a value looks like an expanded entity (or list of entities)
fn looks_like_entity(value: &Value) -> bool {
    match value {
        Value::Object(obj) => [JSON_ID, JSON_READ_LINK, JSON_EDIT_LINK, JSON_ETAG]
            .iter()
            .any(|name| control(obj, name).is_some()),
        Value::Array(items) => !items.is_empty() && items.iter().all(looks_like_entity),
        _ => false,
    }
}

/// Read a JSON entry object
pub fn entry_from_object(obj: &Map<String, Value>, version: ODataVersion) -> Result<EntryResource> {
    let mut entry = EntryResource::new();
    entry.metadata = context_url(obj);
    entry.entity_type = object_type_annotation(obj);
    entry.id = control_str(obj, JSON_ID);
    entry.etag = control_str(obj, JSON_ETAG);
    entry.self_link = control_str(obj, JSON_READ_LINK);
    entry.edit_link = control_str(obj, JSON_EDIT_LINK);
    entry.media_content_source =
        control_str(obj, JSON_MEDIA_READ_LINK).or_else(|| control_str(obj, JSON_MEDIA_EDIT_LINK));
    entry.media_content_type = control_str(obj, JSON_MEDIA_CONTENT_TYPE);

    let mut inlined: HashSet<&str> = HashSet::new();

    for (key, value) in obj {
        if let Some(anchor) = key.strip_prefix('#') {
            read_operations(&mut entry, anchor, value)?;
            continue;
        }

        if let Some((name, term)) = split_property_annotation(key) {
            match term {
                t if is_navigation_term(t) => {
                    let href = expect_str(key, value)?;
                    let link = navigation_link(name, href, obj.get(name), version)?;
                    if obj.contains_key(name) {
                        inlined.insert(name);
                    }
                    entry.navigation_links.push(link);
                }
                TERM_BIND => read_bind(&mut entry, name, key, value)?,
                TERM_ASSOCIATION_LINK_URL | TERM_ASSOCIATION_LINK => {
                    let href = expect_str(key, value)?;
                    entry
                        .association_links
                        .push(LinkResource::new(LinkType::Association, name, href));
                }
                TERM_MEDIA_EDIT_LINK | TERM_MEDIA_READ_LINK => {
                    let already = entry.media_edit_links.iter().any(|l| l.name() == name);
                    if !already {
                        let mut link =
                            LinkResource::new(LinkType::MediaEdit, name, expect_str(key, value)?);
                        link.link_type = obj
                            .get(&format!("{name}@{JSON_MEDIA_CONTENT_TYPE}"))
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        entry.media_edit_links.push(link);
                    }
                }
                _ => {}
            }
            continue;
        }

        if is_annotation_key(key) {
            continue;
        }

        // Expanded navigation property without a link annotation
        if looks_like_entity(value) && !has_navigation_annotation(obj, key) {
            entry
                .navigation_links
                .push(navigation_link(key, "", Some(value), version)?);
            inlined.insert(key.as_str());
        }
    }

    let properties: Map<String, Value> = obj
        .iter()
        .filter(|(key, _)| {
            !inlined.contains(key.as_str())
                && key.as_str() != JSON_TYPE
                && key.as_str() != format!("@{JSON_TYPE}")
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let properties = JsonTreeBuilder::new(version).build_properties(&properties)?;

    if entry.is_media_entry() {
        entry.media_entry_properties = Some(properties);
    } else {
        entry.content = Some(properties);
    }

    debug!(
        "Read JSON entry id={:?} type={:?}",
        entry.id, entry.entity_type
    );
    Ok(entry)
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| CodecError::MalformedPayload(format!("'{key}' must be a string")))
}

fn navigation_link(
    name: &str,
    href: &str,
    inline: Option<&Value>,
    version: ODataVersion,
) -> Result<LinkResource> {
    match inline {
        Some(Value::Object(obj)) => Ok(LinkResource::new(LinkType::EntityNavigation, name, href)
            .with_inline(Inline::Entry(Box::new(entry_from_object(obj, version)?)))),
        Some(Value::Array(items)) => {
            let mut feed = FeedResource::new();
            for item in items {
                let item = super::as_object(item)?;
                feed.entries.push(entry_from_object(item, version)?);
            }
            Ok(LinkResource::new(LinkType::EntitySetNavigation, name, href)
                .with_inline(Inline::Feed(Box::new(feed))))
        }
        Some(Value::Null) | None => Ok(LinkResource::new(LinkType::EntityNavigation, name, href)),
        Some(other) => Err(CodecError::MalformedPayload(format!(
            "navigation property '{name}' holds a scalar: {other}"
        ))),
    }
}

fn read_bind(entry: &mut EntryResource, name: &str, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::String(href) => entry.navigation_links.push(LinkResource::new(
            LinkType::EntityNavigation,
            name,
            href.as_str(),
        )),
        Value::Array(hrefs) => {
            for href in hrefs {
                entry.navigation_links.push(LinkResource::new(
                    LinkType::EntitySetNavigation,
                    name,
                    expect_str(key, href)?,
                ));
            }
        }
        _ => {
            return Err(CodecError::MalformedPayload(format!(
                "'{key}' must be a string or an array of strings"
            )));
        }
    }
    Ok(())
}

fn read_operations(entry: &mut EntryResource, anchor: &str, value: &Value) -> Result<()> {
    let bindings: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for binding in bindings {
        let Some(obj) = binding.as_object() else {
            warn!("Ignoring malformed operation #{anchor}");
            continue;
        };
        let target = obj
            .get(OPERATION_TARGET)
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::MissingRequiredElement(format!("#{anchor}/target")))?;
        entry.operations.push(Operation {
            kind: OperationKind::Action,
            metadata_anchor: format!("#{anchor}"),
            title: obj
                .get(OPERATION_TITLE)
                .and_then(Value::as_str)
                .map(str::to_string),
            target: target.to_string(),
        });
    }
    Ok(())
}

/// Write an entry as a JSON object
///
/// With [`JsonMetadata::None`] only properties and expanded navigation
/// content are written.
pub fn entry_to_object(
    entry: &EntryResource,
    version: ODataVersion,
    metadata: JsonMetadata,
) -> Result<Map<String, Value>> {
    let annotate = metadata != JsonMetadata::None;
    let mut out = Map::new();

    if annotate {
        if let Some(context) = &entry.metadata {
            out.insert(version.metadata_key().to_string(), Value::from(context.as_str()));
        }
        if let Some(entity_type) = &entry.entity_type {
            out.insert(
                version.annotation(JSON_TYPE),
                Value::String(annotation_type_name(version, entity_type)),
            );
        }
        let controls = [
            (JSON_ID, &entry.id),
            (JSON_ETAG, &entry.etag),
            (JSON_READ_LINK, &entry.self_link),
            (JSON_EDIT_LINK, &entry.edit_link),
            (JSON_MEDIA_READ_LINK, &entry.media_content_source),
            (JSON_MEDIA_CONTENT_TYPE, &entry.media_content_type),
        ];
        for (name, value) in controls {
            if let Some(value) = value {
                out.insert(version.annotation(name), Value::from(value.as_str()));
            }
        }
    }

    write_navigation_links(&mut out, entry, version, metadata, annotate)?;

    if annotate {
        for link in &entry.association_links {
            out.insert(
                format!("{}@{JSON_ASSOCIATION_LINK}", link.name()),
                Value::from(link.href.as_str()),
            );
        }
        for link in &entry.media_edit_links {
            match link.title.as_deref() {
                Some(name) if !name.is_empty() => {
                    out.insert(
                        format!("{name}@{JSON_MEDIA_EDIT_LINK}"),
                        Value::from(link.href.as_str()),
                    );
                    if let Some(content_type) = &link.link_type {
                        out.insert(
                            format!("{name}@{JSON_MEDIA_CONTENT_TYPE}"),
                            Value::from(content_type.as_str()),
                        );
                    }
                }
                _ => {
                    out.insert(
                        version.annotation(JSON_MEDIA_EDIT_LINK),
                        Value::from(link.href.as_str()),
                    );
                }
            }
        }
        for operation in &entry.operations {
            let key = if operation.metadata_anchor.starts_with('#') {
                operation.metadata_anchor.clone()
            } else {
                format!("#{}", operation.metadata_anchor)
            };
            let mut binding = Map::new();
            if let Some(title) = &operation.title {
                binding.insert(OPERATION_TITLE.to_string(), Value::from(title.as_str()));
            }
            binding.insert(
                OPERATION_TARGET.to_string(),
                Value::from(operation.target.as_str()),
            );
            out.insert(key, Value::Object(binding));
        }
    }

    if let Some(properties) = entry.properties() {
        out.extend(JsonTreeBuilder::new(version).write_subtree(properties, metadata)?);
    }
    Ok(out)
}

/// Expanded links are written inline with their URL annotation; the rest
/// become `@odata.bind` members, one array per entity-set navigation name.
fn write_navigation_links(
    out: &mut Map<String, Value>,
    entry: &EntryResource,
    version: ODataVersion,
    metadata: JsonMetadata,
    annotate: bool,
) -> Result<()> {
    let mut set_binds: Vec<(String, Vec<Value>)> = Vec::new();

    for link in &entry.navigation_links {
        let name = link.name().to_string();
        match &link.inline {
            Some(inline) => {
                if annotate && !link.href.is_empty() {
                    out.insert(
                        format!("{name}@{JSON_NAVIGATION_LINK}"),
                        Value::from(link.href.as_str()),
                    );
                }
                let value = match inline {
                    Inline::Entry(inner) => {
                        Value::Object(entry_to_object(inner, version, metadata)?)
                    }
                    Inline::Feed(feed) => Value::Array(
                        feed.entries
                            .iter()
                            .map(|e| entry_to_object(e, version, metadata).map(Value::Object))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                };
                out.insert(name, value);
            }
            None if !annotate => {}
            None => match link.kind() {
                Ok(LinkType::EntitySetNavigation) => {
                    match set_binds.iter_mut().find(|(n, _)| *n == name) {
                        Some((_, hrefs)) => hrefs.push(Value::from(link.href.as_str())),
                        None => set_binds.push((name, vec![Value::from(link.href.as_str())])),
                    }
                }
                _ => {
                    out.insert(
                        format!("{name}@{JSON_BIND}"),
                        Value::from(link.href.as_str()),
                    );
                }
            },
        }
    }

    for (name, hrefs) in set_binds {
        out.insert(format!("{name}@{JSON_BIND}"), Value::Array(hrefs));
    }
    Ok(())
}
