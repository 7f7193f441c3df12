//! Namespaces, element names, link relations and JSON annotation keys

/// Atom syndication namespace
pub const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
/// OData metadata namespace (`m:` prefix)
pub const NS_METADATA: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
/// OData data services namespace (`d:` prefix)
pub const NS_DATASERVICES: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices";
/// GML namespace used by geospatial values
pub const NS_GML: &str = "http://www.opengis.net/gml";
/// GeoRSS namespace
pub const NS_GEORSS: &str = "http://www.georss.org/georss";
/// XML namespace (`xml:base`)
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

pub const PREFIX_METADATA: &str = "m";
pub const PREFIX_DATASERVICES: &str = "d";
pub const PREFIX_GML: &str = "gml";
pub const PREFIX_GEORSS: &str = "georss";

/// Relation prefix of navigation links
pub const NAVIGATION_LINK_REL: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/related/";
/// Relation prefix of association links
pub const ASSOCIATION_LINK_REL: &str =
    "http://schemas.microsoft.com/ado/2007/08/dataservices/relatedlinks/";
/// Relation prefix of named stream edit links
pub const MEDIA_EDIT_LINK_REL: &str =
    "http://schemas.microsoft.com/ado/2007/08/dataservices/edit-media/";
/// Relation prefix of named stream read links
pub const MEDIA_RESOURCE_LINK_REL: &str =
    "http://schemas.microsoft.com/ado/2007/08/dataservices/mediaresource/";
/// Scheme of the entity type category
pub const CATEGORY_SCHEME: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/scheme";

pub const REL_SELF: &str = "self";
pub const REL_EDIT: &str = "edit";
pub const REL_EDIT_MEDIA: &str = "edit-media";
pub const REL_NEXT: &str = "next";

/// Link type of an inlined/related single entity
pub const LINK_TYPE_ENTRY: &str = "application/atom+xml;type=entry";
/// Link type of an inlined/related entity set
pub const LINK_TYPE_FEED: &str = "application/atom+xml;type=feed";
/// Link type of association links
pub const LINK_TYPE_ASSOCIATION: &str = "application/xml";
/// Content type of property content
pub const CONTENT_TYPE_XML: &str = "application/xml";

// Atom element names
pub const ATOM_ELEM_FEED: &str = "feed";
pub const ATOM_ELEM_ENTRY: &str = "entry";
pub const ATOM_ELEM_ID: &str = "id";
pub const ATOM_ELEM_TITLE: &str = "title";
pub const ATOM_ELEM_SUMMARY: &str = "summary";
pub const ATOM_ELEM_UPDATED: &str = "updated";
pub const ATOM_ELEM_CATEGORY: &str = "category";
pub const ATOM_ELEM_LINK: &str = "link";
pub const ATOM_ELEM_CONTENT: &str = "content";
pub const ATOM_ELEM_INLINE: &str = "inline";
pub const ATOM_ELEM_PROPERTIES: &str = "properties";
pub const ATOM_ELEM_COUNT: &str = "count";
pub const ATOM_ELEM_ACTION: &str = "action";
pub const ATOM_ELEM_FUNCTION: &str = "function";

// Attribute names
pub const ATTR_TYPE: &str = "type";
pub const ATTR_NULL: &str = "null";
pub const ATTR_ETAG: &str = "etag";
pub const ATTR_REL: &str = "rel";
pub const ATTR_HREF: &str = "href";
pub const ATTR_TITLE: &str = "title";
pub const ATTR_TERM: &str = "term";
pub const ATTR_SCHEME: &str = "scheme";
pub const ATTR_SRC: &str = "src";
pub const ATTR_BASE: &str = "base";
pub const ATTR_METADATA: &str = "metadata";
pub const ATTR_TARGET: &str = "target";

/// Wrapper element of every collection item
pub const ELEM_ELEMENT: &str = "element";

// JSON control annotations, unprefixed (V3 spelling; V4 adds a leading '@')
pub const JSON_TYPE: &str = "odata.type";
pub const JSON_ID: &str = "odata.id";
pub const JSON_ETAG: &str = "odata.etag";
pub const JSON_READ_LINK: &str = "odata.readLink";
pub const JSON_EDIT_LINK: &str = "odata.editLink";
pub const JSON_MEDIA_READ_LINK: &str = "odata.mediaReadLink";
pub const JSON_MEDIA_EDIT_LINK: &str = "odata.mediaEditLink";
pub const JSON_MEDIA_CONTENT_TYPE: &str = "odata.mediaContentType";
pub const JSON_MEDIA_ETAG: &str = "odata.mediaEtag";
pub const JSON_NAVIGATION_LINK: &str = "odata.navigationLinkUrl";
pub const JSON_ASSOCIATION_LINK: &str = "odata.associationLinkUrl";
pub const JSON_BIND: &str = "odata.bind";
pub const JSON_COUNT: &str = "odata.count";
pub const JSON_NEXT_LINK: &str = "odata.nextLink";
pub const JSON_METADATA: &str = "odata.metadata";
pub const JSON_CONTEXT_V4: &str = "@odata.context";
pub const JSON_LEGACY_TYPE: &str = "@type";
/// Array member holding the entities of a JSON feed
pub const JSON_VALUE: &str = "value";

// GeoJSON members
pub const GEOJSON_TYPE: &str = "type";
pub const GEOJSON_COORDINATES: &str = "coordinates";
pub const GEOJSON_GEOMETRIES: &str = "geometries";
pub const GEOJSON_CRS: &str = "crs";
