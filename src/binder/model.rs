//! Public entity and property value model

use crate::edm::primitive::PrimitiveValue;
use crate::resource::{LinkType, Operation};

/// A typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Primitive(PrimitiveValue),
    /// Structured value with ordered named members
    Complex {
        type_name: Option<String>,
        properties: Vec<ODataProperty>,
    },
    /// Ordered homogeneous items
    Collection {
        type_name: Option<String>,
        items: Vec<PropertyValue>,
    },
    Enum { type_name: String, value: String },
    /// Present but null; keeps the declared type when known
    Null { type_name: Option<String> },
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null { .. })
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            PropertyValue::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// Declared or implied type name
    pub fn type_name(&self) -> Option<String> {
        match self {
            PropertyValue::Primitive(value) => Some(value.edm_type().to_string()),
            PropertyValue::Complex { type_name, .. }
            | PropertyValue::Collection { type_name, .. }
            | PropertyValue::Null { type_name } => type_name.clone(),
            PropertyValue::Enum { type_name, .. } => Some(type_name.clone()),
        }
    }
}

impl From<PrimitiveValue> for PropertyValue {
    fn from(value: PrimitiveValue) -> Self {
        PropertyValue::Primitive(value)
    }
}

/// A named property
#[derive(Debug, Clone, PartialEq)]
pub struct ODataProperty {
    pub name: String,
    pub value: PropertyValue,
}

impl ODataProperty {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A null property with an optional declared type
    pub fn null(name: impl Into<String>, type_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::Null {
                type_name: type_name.map(str::to_string),
            },
        }
    }
}

/// Where a link leads
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Not expanded; needs a separate request to follow
    Lazy,
    InlineEntity(Box<ODataEntity>),
    InlineEntitySet(Box<ODataEntitySet>),
}

/// A link of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct ODataLink {
    pub name: String,
    pub rel: String,
    pub href: String,
    pub kind: LinkType,
    /// Raw Atom `type`, kept for media-edit links
    pub link_type: Option<String>,
    pub target: LinkTarget,
}

impl ODataLink {
    pub fn is_inline(&self) -> bool {
        !matches!(self.target, LinkTarget::Lazy)
    }
}

/// A typed entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ODataEntity {
    pub type_name: Option<String>,
    pub id: Option<String>,
    pub etag: Option<String>,
    pub self_link: Option<String>,
    pub edit_link: Option<String>,
    pub media_entity: bool,
    pub media_content_type: Option<String>,
    pub media_content_source: Option<String>,
    pub properties: Vec<ODataProperty>,
    pub navigation_links: Vec<ODataLink>,
    pub association_links: Vec<ODataLink>,
    pub media_edit_links: Vec<ODataLink>,
    pub operations: Vec<Operation>,
}

impl ODataEntity {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    pub fn property(&self, name: &str) -> Option<&ODataProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Append a property, replacing any existing one with the same name
    pub fn set_property(&mut self, property: ODataProperty) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn navigation_link(&self, name: &str) -> Option<&ODataLink> {
        self.navigation_links.iter().find(|l| l.name == name)
    }
}

/// A page of entities
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ODataEntitySet {
    pub entities: Vec<ODataEntity>,
    pub count: Option<u64>,
    /// Continuation link of the next page
    pub next: Option<String>,
}
