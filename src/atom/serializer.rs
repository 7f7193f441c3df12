//! Entry and feed resources to Atom elements

use crate::constants::{
    ATOM_ELEM_ACTION, ATOM_ELEM_CATEGORY, ATOM_ELEM_CONTENT, ATOM_ELEM_COUNT, ATOM_ELEM_ENTRY,
    ATOM_ELEM_FEED, ATOM_ELEM_FUNCTION, ATOM_ELEM_ID, ATOM_ELEM_INLINE, ATOM_ELEM_LINK,
    ATOM_ELEM_SUMMARY, ATOM_ELEM_TITLE, ATOM_ELEM_UPDATED, ATTR_BASE, ATTR_ETAG, ATTR_HREF,
    ATTR_METADATA, ATTR_REL, ATTR_SCHEME, ATTR_SRC, ATTR_TARGET, ATTR_TERM, ATTR_TITLE, ATTR_TYPE,
    CATEGORY_SCHEME, CONTENT_TYPE_XML, NS_ATOM, NS_METADATA, NS_XML, REL_EDIT, REL_NEXT, REL_SELF,
};
use crate::error::Result;
use crate::resource::{
    EntryResource, FeedResource, Inline, LinkResource, Operation, OperationKind, Resource,
};
use crate::tree::{Element, xml};

/// Serialize a resource to a complete Atom document
pub fn serialize(resource: &Resource) -> Result<Vec<u8>> {
    let root = match resource {
        Resource::Entry(entry) => entry_element(entry),
        Resource::Feed(feed) => feed_element(feed),
    };
    xml::write_document(&root)
}

/// Build the `<entry>` element
///
/// Children are written in a fixed order: category, title, summary,
/// updated, association links, navigation links, media-edit links,
/// self/edit links, operations, id, then content. An untyped entry gets a
/// category with an empty term.
pub fn entry_element(entry: &EntryResource) -> Element {
    let mut elem = Element::new(Some(NS_ATOM), ATOM_ELEM_ENTRY);
    if let Some(base) = &entry.base_uri {
        elem.set_attr(Some(NS_XML), ATTR_BASE, base.as_str());
    }
    if let Some(etag) = &entry.etag {
        elem.set_attr(Some(NS_METADATA), ATTR_ETAG, etag.as_str());
    }

    elem.push_element(
        Element::new(Some(NS_ATOM), ATOM_ELEM_CATEGORY)
            .with_attr(None, ATTR_TERM, entry.entity_type.as_deref().unwrap_or_default())
            .with_attr(None, ATTR_SCHEME, CATEGORY_SCHEME),
    );

    push_text_element(&mut elem, ATOM_ELEM_TITLE, entry.title.as_deref());
    push_text_element(&mut elem, ATOM_ELEM_SUMMARY, entry.summary.as_deref());
    push_text_element(&mut elem, ATOM_ELEM_UPDATED, entry.updated.as_deref());

    for link in entry.links() {
        elem.push_element(link_element(link));
    }

    if let Some(href) = &entry.self_link {
        elem.push_element(simple_link(REL_SELF, href));
    }
    if let Some(href) = &entry.edit_link {
        elem.push_element(simple_link(REL_EDIT, href));
    }

    for operation in &entry.operations {
        elem.push_element(operation_element(operation));
    }

    push_text_element(&mut elem, ATOM_ELEM_ID, entry.id.as_deref());

    let mut content = Element::new(Some(NS_ATOM), ATOM_ELEM_CONTENT);
    if entry.is_media_entry() {
        if let Some(content_type) = non_blank(entry.media_content_type.as_deref()) {
            content.set_attr(None, ATTR_TYPE, content_type);
        }
        if let Some(source) = non_blank(entry.media_content_source.as_deref()) {
            content.set_attr(None, ATTR_SRC, source);
        }
        if !content.attributes.is_empty() {
            elem.push_element(content);
        }
        if let Some(properties) = &entry.media_entry_properties {
            elem.push_element(properties.clone());
        }
    } else {
        content.set_attr(None, ATTR_TYPE, CONTENT_TYPE_XML);
        if let Some(properties) = &entry.content {
            content.push_element(properties.clone());
        }
        elem.push_element(content);
    }

    elem
}

/// Build the `<feed>` element; entries are nested unchanged
pub fn feed_element(feed: &FeedResource) -> Element {
    let mut elem = Element::new(Some(NS_ATOM), ATOM_ELEM_FEED);
    if let Some(base) = &feed.base_uri {
        elem.set_attr(Some(NS_XML), ATTR_BASE, base.as_str());
    }

    push_text_element(&mut elem, ATOM_ELEM_ID, feed.id.as_deref());
    push_text_element(&mut elem, ATOM_ELEM_TITLE, feed.title.as_deref());
    push_text_element(&mut elem, ATOM_ELEM_SUMMARY, feed.summary.as_deref());
    push_text_element(&mut elem, ATOM_ELEM_UPDATED, feed.updated.as_deref());

    if let Some(count) = feed.count {
        elem.push_element(
            Element::new(Some(NS_METADATA), ATOM_ELEM_COUNT).with_text(count.to_string()),
        );
    }

    for entry in &feed.entries {
        elem.push_element(entry_element(entry));
    }

    if let Some(next) = &feed.next {
        elem.push_element(simple_link(REL_NEXT, next));
    }

    elem
}

fn link_element(link: &LinkResource) -> Element {
    let mut elem = Element::new(Some(NS_ATOM), ATOM_ELEM_LINK)
        .with_attr(None, ATTR_REL, link.rel.as_str());
    if let Some(title) = &link.title {
        elem.set_attr(None, ATTR_TITLE, title.as_str());
    }
    elem.set_attr(None, ATTR_HREF, link.href.as_str());
    if let Some(link_type) = non_blank(link.link_type.as_deref()) {
        elem.set_attr(None, ATTR_TYPE, link_type);
    }

    if let Some(inline) = &link.inline {
        let nested = match inline {
            Inline::Entry(entry) => entry_element(entry),
            Inline::Feed(feed) => feed_element(feed),
        };
        elem.push_element(Element::new(Some(NS_METADATA), ATOM_ELEM_INLINE).with_child(nested));
    }
    elem
}

fn simple_link(rel: &str, href: &str) -> Element {
    Element::new(Some(NS_ATOM), ATOM_ELEM_LINK)
        .with_attr(None, ATTR_REL, rel)
        .with_attr(None, ATTR_HREF, href)
}

fn operation_element(operation: &Operation) -> Element {
    let name = match operation.kind {
        OperationKind::Action => ATOM_ELEM_ACTION,
        OperationKind::Function => ATOM_ELEM_FUNCTION,
    };
    let mut elem = Element::new(Some(NS_METADATA), name)
        .with_attr(None, ATTR_METADATA, operation.metadata_anchor.as_str());
    if let Some(title) = &operation.title {
        elem.set_attr(None, ATTR_TITLE, title.as_str());
    }
    elem.set_attr(None, ATTR_TARGET, operation.target.as_str());
    elem
}

fn push_text_element(parent: &mut Element, name: &str, text: Option<&str>) {
    if let Some(text) = non_blank(text) {
        parent.push_element(Element::new(Some(NS_ATOM), name).with_text(text));
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
