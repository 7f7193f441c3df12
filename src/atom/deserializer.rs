//! Atom elements to entry and feed resources

use tracing::{debug, warn};

use crate::constants::{
    ATOM_ELEM_ACTION, ATOM_ELEM_CATEGORY, ATOM_ELEM_CONTENT, ATOM_ELEM_COUNT, ATOM_ELEM_ENTRY,
    ATOM_ELEM_FEED, ATOM_ELEM_FUNCTION, ATOM_ELEM_ID, ATOM_ELEM_INLINE, ATOM_ELEM_LINK,
    ATOM_ELEM_PROPERTIES, ATOM_ELEM_SUMMARY, ATOM_ELEM_TITLE, ATOM_ELEM_UPDATED, ATTR_BASE,
    ATTR_ETAG, ATTR_HREF, ATTR_METADATA, ATTR_REL, ATTR_SRC, ATTR_TARGET, ATTR_TERM, ATTR_TITLE,
    ATTR_TYPE, MEDIA_EDIT_LINK_REL, NS_ATOM, NS_METADATA, NS_XML, REL_EDIT, REL_NEXT, REL_SELF,
};
use crate::error::{CodecError, Result};
use crate::resource::{
    EntryResource, FeedResource, Inline, LinkResource, Operation, OperationKind, Resource,
    is_media_resource_rel,
};
use crate::tree::{Element, xml};

/// Parse an Atom document holding a single `<entry>` or `<feed>`
pub fn deserialize(bytes: &[u8]) -> Result<Resource> {
    let root = xml::parse(bytes)?;
    resource_from_element(&root)
}

pub fn resource_from_element(root: &Element) -> Result<Resource> {
    if is_atom(root, ATOM_ELEM_ENTRY) {
        Ok(Resource::Entry(entry_from_element(root, None)?))
    } else if is_atom(root, ATOM_ELEM_FEED) {
        Ok(Resource::Feed(feed_from_element(root, None)?))
    } else {
        Err(CodecError::MalformedPayload(format!(
            "expected an Atom entry or feed, found <{}>",
            root.name
        )))
    }
}

/// Atom elements are matched by local name; unqualified ones are accepted too
fn is_atom(elem: &Element, name: &str) -> bool {
    elem.name == name && matches!(elem.ns.as_deref(), Some(NS_ATOM) | None)
}

fn trimmed_text(elem: &Element) -> Option<String> {
    let text = elem.text();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Read an `<entry>` element
///
/// `inherited_base` is the `xml:base` of the enclosing feed, used when the
/// entry does not declare its own.
pub fn entry_from_element(elem: &Element, inherited_base: Option<&str>) -> Result<EntryResource> {
    let mut entry = EntryResource::new();
    entry.base_uri = elem
        .attr(Some(NS_XML), ATTR_BASE)
        .or(inherited_base)
        .map(str::to_string);
    entry.etag = elem.attr(Some(NS_METADATA), ATTR_ETAG).map(str::to_string);

    let mut has_category = false;
    let mut has_content = false;

    for child in elem.child_elements() {
        if child.is(Some(NS_METADATA), ATOM_ELEM_PROPERTIES) {
            entry.media_entry_properties = Some(child.clone());
            continue;
        }
        if child.is(Some(NS_METADATA), ATOM_ELEM_ACTION) {
            entry.operations.push(operation(child, OperationKind::Action)?);
            continue;
        }
        if child.is(Some(NS_METADATA), ATOM_ELEM_FUNCTION) {
            entry.operations.push(operation(child, OperationKind::Function)?);
            continue;
        }
        if !matches!(child.ns.as_deref(), Some(NS_ATOM) | None) {
            debug!("Skipping foreign element <{}> in entry", child.name);
            continue;
        }

        match child.name.as_str() {
            ATOM_ELEM_ID => entry.id = trimmed_text(child),
            ATOM_ELEM_TITLE => entry.title = trimmed_text(child),
            ATOM_ELEM_SUMMARY => entry.summary = trimmed_text(child),
            ATOM_ELEM_UPDATED => entry.updated = trimmed_text(child),
            ATOM_ELEM_CATEGORY => {
                if let Some(term) = child.attr(None, ATTR_TERM) {
                    // An empty term marks an untyped entry
                    entry.entity_type = Some(term.trim())
                        .filter(|t| !t.is_empty())
                        .map(str::to_string);
                    has_category = true;
                }
            }
            ATOM_ELEM_LINK => read_link(&mut entry, child)?,
            ATOM_ELEM_CONTENT => {
                has_content = true;
                if let Some(src) = child.attr(None, ATTR_SRC) {
                    entry.media_content_source = Some(src.to_string());
                    entry.media_content_type = child.attr(None, ATTR_TYPE).map(str::to_string);
                } else {
                    entry.content = child
                        .find_child(Some(NS_METADATA), ATOM_ELEM_PROPERTIES)
                        .cloned();
                }
            }
            other => debug!("Skipping Atom element <{other}> in entry"),
        }
    }

    if !entry.is_media_entry() {
        if !has_category {
            return Err(CodecError::MissingRequiredElement(
                ATOM_ELEM_CATEGORY.to_string(),
            ));
        }
        if !has_content {
            return Err(CodecError::MissingRequiredElement(
                ATOM_ELEM_CONTENT.to_string(),
            ));
        }
    }

    debug!(
        "Read Atom entry id={:?} type={:?}",
        entry.id, entry.entity_type
    );
    Ok(entry)
}

fn read_link(entry: &mut EntryResource, elem: &Element) -> Result<()> {
    let Some(rel) = elem.attr(None, ATTR_REL) else {
        warn!("Ignoring Atom link without rel");
        return Ok(());
    };
    let href = elem.attr(None, ATTR_HREF).unwrap_or_default().to_string();
    let link_type = elem.attr(None, ATTR_TYPE).map(str::to_string);

    match rel {
        REL_SELF => entry.self_link = Some(href),
        REL_EDIT => entry.edit_link = Some(href),
        _ if rel.starts_with(MEDIA_EDIT_LINK_REL) => entry.add_link(LinkResource {
            title: elem.attr(None, ATTR_TITLE).map(str::to_string),
            rel: rel.to_string(),
            href,
            link_type,
            inline: None,
        })?,
        _ if is_media_resource_rel(rel) => {
            entry.media_content_source = Some(href);
            entry.media_content_type = link_type;
        }
        // Registered relations such as "alternate" carry nothing to bind
        _ if !rel.contains('/') => debug!("Skipping Atom link rel={rel}"),
        _ => {
            let inline = match elem.find_child(Some(NS_METADATA), ATOM_ELEM_INLINE) {
                Some(inline) => inline_content(inline, entry.base_uri.as_deref())?,
                None => None,
            };
            entry.add_link(LinkResource {
                title: elem.attr(None, ATTR_TITLE).map(str::to_string),
                rel: rel.to_string(),
                href,
                link_type,
                inline,
            })?;
        }
    }
    Ok(())
}

fn inline_content(inline: &Element, base: Option<&str>) -> Result<Option<Inline>> {
    for child in inline.child_elements() {
        if is_atom(child, ATOM_ELEM_ENTRY) {
            return Ok(Some(Inline::Entry(Box::new(entry_from_element(child, base)?))));
        }
        if is_atom(child, ATOM_ELEM_FEED) {
            return Ok(Some(Inline::Feed(Box::new(feed_from_element(child, base)?))));
        }
    }
    Ok(None)
}

fn operation(elem: &Element, kind: OperationKind) -> Result<Operation> {
    let metadata_anchor = elem
        .attr(None, ATTR_METADATA)
        .ok_or_else(|| CodecError::MissingRequiredElement(format!("{}@metadata", elem.name)))?;
    let target = elem
        .attr(None, ATTR_TARGET)
        .ok_or_else(|| CodecError::MissingRequiredElement(format!("{}@target", elem.name)))?;
    Ok(Operation {
        kind,
        metadata_anchor: metadata_anchor.to_string(),
        title: elem.attr(None, ATTR_TITLE).map(str::to_string),
        target: target.to_string(),
    })
}

/// Read a `<feed>` element
pub fn feed_from_element(elem: &Element, inherited_base: Option<&str>) -> Result<FeedResource> {
    let mut feed = FeedResource::new();
    feed.base_uri = elem
        .attr(Some(NS_XML), ATTR_BASE)
        .or(inherited_base)
        .map(str::to_string);

    for child in elem.child_elements() {
        if child.is(Some(NS_METADATA), ATOM_ELEM_COUNT) {
            let text = child.text();
            let count = text.trim().parse::<u64>().map_err(|_| {
                CodecError::MalformedPayload(format!("invalid m:count '{}'", text.trim()))
            })?;
            feed.count = Some(count);
            continue;
        }
        if !matches!(child.ns.as_deref(), Some(NS_ATOM) | None) {
            continue;
        }
        match child.name.as_str() {
            ATOM_ELEM_ID => feed.id = trimmed_text(child),
            ATOM_ELEM_TITLE => feed.title = trimmed_text(child),
            ATOM_ELEM_SUMMARY => feed.summary = trimmed_text(child),
            ATOM_ELEM_UPDATED => feed.updated = trimmed_text(child),
            ATOM_ELEM_ENTRY => feed
                .entries
                .push(entry_from_element(child, feed.base_uri.as_deref())?),
            ATOM_ELEM_LINK => {
                if child.attr(None, ATTR_REL) == Some(REL_NEXT) {
                    feed.next = child.attr(None, ATTR_HREF).map(str::to_string);
                }
            }
            _ => {}
        }
    }

    debug!("Read Atom feed with {} entries", feed.entries.len());
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::LinkType;

    const ENTRY: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<entry xml:base="http://host/svc/" xmlns="http://www.w3.org/2005/Atom"
       xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices"
       xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata"
       m:etag="W/&quot;1&quot;">
  <id>http://host/svc/Orders(1)</id>
  <category term="NS.Order" scheme="http://schemas.microsoft.com/ado/2007/08/dataservices/scheme"/>
  <title type="text">Order</title>
  <link rel="edit" title="Order" href="Orders(1)"/>
  <link rel="http://schemas.microsoft.com/ado/2007/08/dataservices/related/Customer"
        type="application/atom+xml;type=entry" title="Customer" href="Orders(1)/Customer">
    <m:inline>
      <entry>
        <category term="NS.Customer" scheme="http://schemas.microsoft.com/ado/2007/08/dataservices/scheme"/>
        <content type="application/xml">
          <m:properties><d:Name>Alice</d:Name></m:properties>
        </content>
      </entry>
    </m:inline>
  </link>
  <link rel="alternate" href="Orders(1)"/>
  <m:action metadata="#Container.Ship" title="Ship" target="Orders(1)/Ship"/>
  <content type="application/xml">
    <m:properties>
      <d:Id m:type="Edm.Int32">1</d:Id>
    </m:properties>
  </content>
</entry>"##;

    #[test]
    fn test_entry_fields() {
        let entry = deserialize(ENTRY.as_bytes()).unwrap().into_entry().unwrap();
        assert_eq!(entry.id.as_deref(), Some("http://host/svc/Orders(1)"));
        assert_eq!(entry.entity_type.as_deref(), Some("NS.Order"));
        assert_eq!(entry.etag.as_deref(), Some("W/\"1\""));
        assert_eq!(entry.base_uri.as_deref(), Some("http://host/svc/"));
        assert_eq!(entry.edit_link.as_deref(), Some("Orders(1)"));
        assert_eq!(entry.operations.len(), 1);
        assert_eq!(entry.operations[0].kind, OperationKind::Action);

        let props = entry.content.as_ref().unwrap();
        assert_eq!(props.find_child(None, "Id"), None);
        assert_eq!(props.child_elements().count(), 1);

        assert_eq!(entry.navigation_links.len(), 1);
        let link = &entry.navigation_links[0];
        assert_eq!(link.kind().unwrap(), LinkType::EntityNavigation);
        match &link.inline {
            Some(Inline::Entry(inner)) => {
                assert_eq!(inner.entity_type.as_deref(), Some("NS.Customer"));
                assert_eq!(inner.base_uri.as_deref(), Some("http://host/svc/"));
            }
            other => panic!("expected inline entry, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_category_fails() {
        let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom"><content type="application/xml"/></entry>"#;
        let err = deserialize(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::MissingRequiredElement(ref e) if e == "category"));
    }

    #[test]
    fn test_empty_category_term_is_untyped() {
        let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom">
            <category term="" scheme="http://schemas.microsoft.com/ado/2007/08/dataservices/scheme"/>
            <content type="application/xml"/>
        </entry>"#;
        let entry = deserialize(xml.as_bytes()).unwrap().into_entry().unwrap();
        assert_eq!(entry.entity_type, None);
    }

    #[test]
    fn test_missing_content_fails() {
        let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom">
            <category term="NS.T" scheme="http://schemas.microsoft.com/ado/2007/08/dataservices/scheme"/>
        </entry>"#;
        let err = deserialize(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::MissingRequiredElement(ref e) if e == "content"));
    }

    #[test]
    fn test_media_resource_link_marks_media_entry() {
        let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom">
            <link rel="http://schemas.microsoft.com/ado/2007/08/dataservices/MediaResource" href="x" type="image/png"/>
        </entry>"#;
        let entry = deserialize(xml.as_bytes()).unwrap().into_entry().unwrap();
        assert!(entry.is_media_entry());
        assert_eq!(entry.media_content_source.as_deref(), Some("x"));
        assert_eq!(entry.media_content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_unresolvable_link_fails() {
        let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom">
            <category term="NS.T"/>
            <link rel="http://example.com/rels/odd" type="text/html" href="y"/>
            <content type="application/xml"/>
        </entry>"#;
        let err = deserialize(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::UnresolvableLinkType { .. }));
    }

    #[test]
    fn test_empty_feed() {
        let feed = deserialize(b"<feed></feed>").unwrap().into_feed().unwrap();
        assert!(feed.entries.is_empty());
        assert_eq!(feed.next, None);
    }

    #[test]
    fn test_feed_count_and_next() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"
              xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
            <m:count>42</m:count>
            <link rel="next" href="Orders?$skiptoken=5"/>
        </feed>"#;
        let feed = deserialize(xml.as_bytes()).unwrap().into_feed().unwrap();
        assert_eq!(feed.count, Some(42));
        assert_eq!(feed.next.as_deref(), Some("Orders?$skiptoken=5"));
    }

    #[test]
    fn test_not_atom() {
        let err = deserialize(b"<html/>").unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload(_)));
    }
}
