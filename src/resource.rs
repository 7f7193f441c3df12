//! Wire-level resources shared by the Atom and JSON codecs
//!
//! Entries and feeds here are format independent: the Atom and JSON
//! deserializers both produce them and both serializers consume them.

use crate::constants::{
    ASSOCIATION_LINK_REL, LINK_TYPE_ASSOCIATION, LINK_TYPE_ENTRY, LINK_TYPE_FEED,
    MEDIA_EDIT_LINK_REL, NAVIGATION_LINK_REL, REL_EDIT_MEDIA,
};
use crate::error::{CodecError, Result};
use crate::tree::Element;

/// The four kinds of entity links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Navigation to a single related entity
    EntityNavigation,
    /// Navigation to a related entity set
    EntitySetNavigation,
    /// Association (reference) link
    Association,
    /// Edit link of a named media stream
    MediaEdit,
}

impl LinkType {
    /// Resolve a link kind from its relation and Atom `type`
    ///
    /// # Errors
    ///
    /// [`CodecError::UnresolvableLinkType`] when neither the relation nor the
    /// type identifies one of the four kinds.
    pub fn resolve(rel: &str, link_type: Option<&str>) -> Result<Self> {
        if rel.starts_with(MEDIA_EDIT_LINK_REL) {
            return Ok(LinkType::MediaEdit);
        }
        let normalized: Option<String> = link_type.map(|t| {
            t.chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase()
        });
        match normalized.as_deref() {
            Some(LINK_TYPE_ENTRY) => Ok(LinkType::EntityNavigation),
            Some(LINK_TYPE_FEED) => Ok(LinkType::EntitySetNavigation),
            Some(LINK_TYPE_ASSOCIATION) => Ok(LinkType::Association),
            None if rel.starts_with(ASSOCIATION_LINK_REL) => Ok(LinkType::Association),
            _ => Err(CodecError::UnresolvableLinkType {
                rel: rel.to_string(),
                link_type: link_type.unwrap_or_default().to_string(),
            }),
        }
    }

    /// Atom `type` attribute written for this kind
    pub fn atom_type(&self) -> Option<&'static str> {
        match self {
            LinkType::EntityNavigation => Some(LINK_TYPE_ENTRY),
            LinkType::EntitySetNavigation => Some(LINK_TYPE_FEED),
            LinkType::Association => Some(LINK_TYPE_ASSOCIATION),
            LinkType::MediaEdit => None,
        }
    }

    /// Relation prefix for this kind
    pub fn rel_prefix(&self) -> &'static str {
        match self {
            LinkType::EntityNavigation | LinkType::EntitySetNavigation => NAVIGATION_LINK_REL,
            LinkType::Association => ASSOCIATION_LINK_REL,
            LinkType::MediaEdit => MEDIA_EDIT_LINK_REL,
        }
    }
}

/// Whether a link relation points at the entry's media resource
pub fn is_media_resource_rel(rel: &str) -> bool {
    rel == REL_EDIT_MEDIA
        || rel.to_ascii_lowercase().contains("mediaresource")
}

/// Content inlined into a navigation link (`$expand`)
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Entry(Box<EntryResource>),
    Feed(Box<FeedResource>),
}

/// A link owned by an entry
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkResource {
    pub title: Option<String>,
    pub rel: String,
    pub href: String,
    /// Raw Atom `type` attribute
    pub link_type: Option<String>,
    pub inline: Option<Inline>,
}

impl LinkResource {
    /// Link of the given kind for the property `name`
    pub fn new(kind: LinkType, name: &str, href: impl Into<String>) -> Self {
        Self {
            title: Some(name.to_string()),
            rel: format!("{}{name}", kind.rel_prefix()),
            href: href.into(),
            link_type: kind.atom_type().map(str::to_string),
            inline: None,
        }
    }

    pub fn with_inline(mut self, inline: Inline) -> Self {
        self.inline = Some(inline);
        self
    }

    /// Property name: the title, or the last segment of the relation
    pub fn name(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => self.rel.rsplit('/').next().unwrap_or(&self.rel),
        }
    }

    pub fn kind(&self) -> Result<LinkType> {
        LinkType::resolve(&self.rel, self.link_type.as_deref())
    }
}

/// Kind of an advertised operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Action,
    Function,
}

/// An action or function advertised by an entry
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    /// Metadata anchor, e.g. `#Container.Discount`
    pub metadata_anchor: String,
    pub title: Option<String>,
    pub target: String,
}

/// One entity on the wire
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryResource {
    pub base_uri: Option<String>,
    /// Metadata / context URL
    pub metadata: Option<String>,
    pub id: Option<String>,
    pub entity_type: Option<String>,
    pub etag: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub updated: Option<String>,
    pub self_link: Option<String>,
    pub edit_link: Option<String>,
    pub association_links: Vec<LinkResource>,
    pub navigation_links: Vec<LinkResource>,
    pub media_edit_links: Vec<LinkResource>,
    pub operations: Vec<Operation>,
    /// `m:properties` of a regular entry
    pub content: Option<Element>,
    /// `m:properties` of a media entry (sibling of its content element)
    pub media_entry_properties: Option<Element>,
    pub media_content_source: Option<String>,
    pub media_content_type: Option<String>,
}

impl EntryResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_media_entry(&self) -> bool {
        self.media_entry_properties.is_some()
            || self
                .media_content_source
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty())
    }

    /// Property element of the entry, wherever it lives
    pub fn properties(&self) -> Option<&Element> {
        self.media_entry_properties.as_ref().or(self.content.as_ref())
    }

    /// Every link in kind order (association, navigation, media edit)
    pub fn links(&self) -> impl Iterator<Item = &LinkResource> {
        self.association_links
            .iter()
            .chain(self.navigation_links.iter())
            .chain(self.media_edit_links.iter())
    }

    /// File a link under its kind
    pub fn add_link(&mut self, link: LinkResource) -> Result<()> {
        match link.kind()? {
            LinkType::Association => self.association_links.push(link),
            LinkType::EntityNavigation | LinkType::EntitySetNavigation => {
                self.navigation_links.push(link)
            }
            LinkType::MediaEdit => self.media_edit_links.push(link),
        }
        Ok(())
    }
}

/// A list of entities on the wire
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedResource {
    pub base_uri: Option<String>,
    pub metadata: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub updated: Option<String>,
    pub count: Option<u64>,
    pub entries: Vec<EntryResource>,
    /// Continuation link for the next page
    pub next: Option<String>,
}

impl FeedResource {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A decoded payload: one entry or one feed
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Entry(EntryResource),
    Feed(FeedResource),
}

impl Resource {
    pub fn as_entry(&self) -> Option<&EntryResource> {
        match self {
            Resource::Entry(entry) => Some(entry),
            Resource::Feed(_) => None,
        }
    }

    pub fn as_feed(&self) -> Option<&FeedResource> {
        match self {
            Resource::Feed(feed) => Some(feed),
            Resource::Entry(_) => None,
        }
    }

    pub fn into_entry(self) -> Result<EntryResource> {
        match self {
            Resource::Entry(entry) => Ok(entry),
            Resource::Feed(_) => Err(CodecError::MalformedPayload(
                "expected an entry, found a feed".to_string(),
            )),
        }
    }

    pub fn into_feed(self) -> Result<FeedResource> {
        match self {
            Resource::Feed(feed) => Ok(feed),
            Resource::Entry(_) => Err(CodecError::MalformedPayload(
                "expected a feed, found an entry".to_string(),
            )),
        }
    }
}

impl From<EntryResource> for Resource {
    fn from(entry: EntryResource) -> Self {
        Resource::Entry(entry)
    }
}

impl From<FeedResource> for Resource {
    fn from(feed: FeedResource) -> Self {
        Resource::Feed(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MEDIA_RESOURCE_LINK_REL;

    #[test]
    fn test_resolve_link_types() {
        let nav = format!("{NAVIGATION_LINK_REL}Orders");
        assert_eq!(
            LinkType::resolve(&nav, Some("application/atom+xml;type=feed")).unwrap(),
            LinkType::EntitySetNavigation
        );
        assert_eq!(
            LinkType::resolve(&nav, Some("application/atom+xml; type=entry")).unwrap(),
            LinkType::EntityNavigation
        );
        assert_eq!(
            LinkType::resolve(&format!("{ASSOCIATION_LINK_REL}Orders"), None).unwrap(),
            LinkType::Association
        );
        assert_eq!(
            LinkType::resolve(&format!("{MEDIA_EDIT_LINK_REL}Photo"), Some("image/png")).unwrap(),
            LinkType::MediaEdit
        );
    }

    #[test]
    fn test_unresolvable_link_type() {
        let err = LinkType::resolve("related", Some("text/html")).unwrap_err();
        assert!(matches!(err, CodecError::UnresolvableLinkType { .. }));
    }

    #[test]
    fn test_link_name_falls_back_to_rel() {
        let mut link = LinkResource::new(LinkType::EntityNavigation, "Customer", "Orders(1)/Customer");
        assert_eq!(link.name(), "Customer");
        link.title = None;
        assert_eq!(link.name(), "Customer");
    }

    #[test]
    fn test_media_entry_detection() {
        let mut entry = EntryResource::new();
        assert!(!entry.is_media_entry());
        entry.media_content_source = Some("  ".to_string());
        assert!(!entry.is_media_entry());
        entry.media_content_source = Some("Photos(1)/$value".to_string());
        assert!(entry.is_media_entry());
        assert!(is_media_resource_rel(
            "http://schemas.microsoft.com/ado/2007/08/dataservices/MediaResource"
        ));
        assert!(is_media_resource_rel(&format!("{MEDIA_RESOURCE_LINK_REL}Photo")));
    }

    #[test]
    fn test_add_link_files_by_kind() {
        let mut entry = EntryResource::new();
        entry
            .add_link(LinkResource::new(LinkType::Association, "Orders", "x/$links/Orders"))
            .unwrap();
        entry
            .add_link(LinkResource::new(LinkType::EntitySetNavigation, "Orders", "x/Orders"))
            .unwrap();
        assert_eq!(entry.association_links.len(), 1);
        assert_eq!(entry.navigation_links.len(), 1);
        assert_eq!(entry.links().count(), 2);
    }
}
