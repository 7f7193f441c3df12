//! Binding between wire resources and the public entity model
//!
//! Property types are taken from the element's `m:type` first, then from the
//! injected [`TypeResolver`], and fall back to `Edm.String`.

pub mod model;

use std::sync::Arc;

use tracing::debug;

use crate::config::ODataVersion;
use crate::constants::{ATOM_ELEM_PROPERTIES, ELEM_ELEMENT, NS_DATASERVICES, NS_METADATA};
use crate::edm::geospatial::Geospatial;
use crate::edm::metadata::TypeResolver;
use crate::edm::primitive::PrimitiveValue;
use crate::edm::simple_type::EdmSimpleType;
use crate::error::Result;
use crate::resource::{EntryResource, FeedResource, Inline, LinkResource, LinkType};
use crate::tree::Element;
use crate::tree::json::{collection_item_type, is_collection_type};

pub use model::{
    LinkTarget, ODataEntity, ODataEntitySet, ODataLink, ODataProperty, PropertyValue,
};

/// Projects entries and feeds onto entities and back
#[derive(Clone, Default)]
pub struct Binder {
    version: ODataVersion,
    resolver: Option<Arc<dyn TypeResolver>>,
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("version", &self.version)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Binder {
    pub fn new(version: ODataVersion) -> Self {
        Self {
            version,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn version(&self) -> ODataVersion {
        self.version
    }

    /// Bind a wire entry to an entity
    ///
    /// # Errors
    ///
    /// [`CodecError::UnresolvableLinkType`](crate::CodecError::UnresolvableLinkType)
    /// for links of unknown kind, or any error binding a property value.
    pub fn entity_from_entry(&self, entry: &EntryResource) -> Result<ODataEntity> {
        let mut entity = ODataEntity {
            type_name: entry.entity_type.clone(),
            id: entry.id.clone(),
            etag: entry.etag.clone(),
            self_link: entry.self_link.clone(),
            edit_link: entry.edit_link.clone(),
            media_entity: entry.is_media_entry(),
            media_content_type: entry.media_content_type.clone(),
            media_content_source: entry.media_content_source.clone(),
            operations: entry.operations.clone(),
            ..ODataEntity::default()
        };

        if let Some(properties) = entry.properties() {
            for child in properties.child_elements() {
                entity
                    .properties
                    .push(self.property_from_element(child, entry.entity_type.as_deref())?);
            }
        }

        for link in entry.links() {
            let bound = self.link_from_resource(link)?;
            match bound.kind {
                LinkType::Association => entity.association_links.push(bound),
                LinkType::EntityNavigation | LinkType::EntitySetNavigation => {
                    entity.navigation_links.push(bound)
                }
                LinkType::MediaEdit => entity.media_edit_links.push(bound),
            }
        }

        debug!(
            "Bound entity type={:?} with {} properties",
            entity.type_name,
            entity.properties.len()
        );
        Ok(entity)
    }

    pub fn entity_set_from_feed(&self, feed: &FeedResource) -> Result<ODataEntitySet> {
        Ok(ODataEntitySet {
            entities: feed
                .entries
                .iter()
                .map(|entry| self.entity_from_entry(entry))
                .collect::<Result<Vec<_>>>()?,
            count: feed.count,
            next: feed.next.clone(),
        })
    }

    fn link_from_resource(&self, link: &LinkResource) -> Result<ODataLink> {
        let kind = link.kind()?;
        let target = match &link.inline {
            Some(Inline::Entry(entry)) => {
                LinkTarget::InlineEntity(Box::new(self.entity_from_entry(entry)?))
            }
            Some(Inline::Feed(feed)) => {
                LinkTarget::InlineEntitySet(Box::new(self.entity_set_from_feed(feed)?))
            }
            None => LinkTarget::Lazy,
        };
        Ok(ODataLink {
            name: link.name().to_string(),
            rel: link.rel.clone(),
            href: link.href.clone(),
            kind,
            link_type: link.link_type.clone(),
            target,
        })
    }

    /// Bind one property element
    ///
    /// `owner` is the structured type declaring the property, used to ask
    /// the resolver when the element carries no type.
    pub fn property_from_element(
        &self,
        elem: &Element,
        owner: Option<&str>,
    ) -> Result<ODataProperty> {
        let declared = self.declared_type(elem, owner);
        Ok(ODataProperty {
            name: elem.name.clone(),
            value: self.value_from_element(elem, declared.as_deref())?,
        })
    }

    /// Wire annotation first, then the resolver, then the JSON value class
    fn declared_type(&self, elem: &Element, owner: Option<&str>) -> Option<String> {
        elem.edm_type()
            .map(str::to_string)
            .or_else(|| {
                let resolver = self.resolver.as_ref()?;
                resolver.property_type(owner?, &elem.name)
            })
            .or_else(|| elem.inferred_type.clone())
    }

    fn value_from_element(&self, elem: &Element, declared: Option<&str>) -> Result<PropertyValue> {
        if elem.is_null() {
            return Ok(PropertyValue::Null {
                type_name: declared.map(str::to_string),
            });
        }

        if let Some(type_name) = declared.filter(|t| EdmSimpleType::is_geospatial_name(t)) {
            let geo = Geospatial::from_gml(EdmSimpleType::type_for(type_name)?, elem)?;
            return Ok(PropertyValue::Primitive(PrimitiveValue::Geospatial(geo)));
        }

        if declared.is_some_and(is_collection_type) || elem.is_collection_like() {
            let item_type = declared.and_then(collection_item_type);
            let items = elem
                .child_elements()
                .map(|item| {
                    let own = item.edm_type().or(item_type);
                    self.value_from_element(item, own)
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(PropertyValue::Collection {
                type_name: declared.map(str::to_string),
                items,
            });
        }

        if elem.has_element_children() {
            let properties = elem
                .child_elements()
                .map(|child| self.property_from_element(child, declared))
                .collect::<Result<Vec<_>>>()?;
            return Ok(PropertyValue::Complex {
                type_name: declared.map(str::to_string),
                properties,
            });
        }

        let text = elem.text();
        match declared {
            Some(type_name) if type_name.starts_with("Edm.") => {
                let edm_type = EdmSimpleType::type_for(type_name)?;
                edm_type.check_version(self.version)?;
                Ok(PropertyValue::Primitive(PrimitiveValue::parse(edm_type, &text)?))
            }
            Some(type_name) => {
                let is_enum = self
                    .resolver
                    .as_ref()
                    .is_some_and(|r| r.is_enum_type(type_name));
                if is_enum || !text.is_empty() {
                    Ok(PropertyValue::Enum {
                        type_name: type_name.to_string(),
                        value: text,
                    })
                } else {
                    Ok(PropertyValue::Complex {
                        type_name: Some(type_name.to_string()),
                        properties: Vec::new(),
                    })
                }
            }
            None => Ok(PropertyValue::Primitive(PrimitiveValue::String(text))),
        }
    }

    /// Unbind an entity to a wire entry
    pub fn entry_from_entity(&self, entity: &ODataEntity) -> Result<EntryResource> {
        let mut entry = EntryResource {
            entity_type: entity.type_name.clone(),
            id: entity.id.clone(),
            etag: entity.etag.clone(),
            self_link: entity.self_link.clone(),
            edit_link: entity.edit_link.clone(),
            media_content_type: entity.media_content_type.clone(),
            media_content_source: entity.media_content_source.clone(),
            operations: entity.operations.clone(),
            ..EntryResource::default()
        };

        let mut properties = Element::new(Some(NS_METADATA), ATOM_ELEM_PROPERTIES);
        for property in &entity.properties {
            properties.push_element(element_from_property(property));
        }
        if entity.media_entity {
            entry.media_entry_properties = Some(properties);
        } else {
            entry.content = Some(properties);
        }

        for link in entity
            .association_links
            .iter()
            .chain(&entity.navigation_links)
            .chain(&entity.media_edit_links)
        {
            entry.add_link(self.link_to_resource(link)?)?;
        }
        Ok(entry)
    }

    pub fn feed_from_entity_set(&self, set: &ODataEntitySet) -> Result<FeedResource> {
        Ok(FeedResource {
            entries: set
                .entities
                .iter()
                .map(|entity| self.entry_from_entity(entity))
                .collect::<Result<Vec<_>>>()?,
            count: set.count,
            next: set.next.clone(),
            ..FeedResource::default()
        })
    }

    fn link_to_resource(&self, link: &ODataLink) -> Result<LinkResource> {
        let inline = match &link.target {
            LinkTarget::Lazy => None,
            LinkTarget::InlineEntity(entity) => {
                Some(Inline::Entry(Box::new(self.entry_from_entity(entity)?)))
            }
            LinkTarget::InlineEntitySet(set) => {
                Some(Inline::Feed(Box::new(self.feed_from_entity_set(set)?)))
            }
        };
        Ok(LinkResource {
            title: Some(link.name.clone()),
            rel: link.rel.clone(),
            href: link.href.clone(),
            link_type: link
                .link_type
                .clone()
                .or_else(|| link.kind.atom_type().map(str::to_string)),
            inline,
        })
    }
}

/// Build the `d:` element of a property
pub fn element_from_property(property: &ODataProperty) -> Element {
    let mut elem = Element::new(Some(NS_DATASERVICES), property.name.as_str());
    fill_element(&mut elem, &property.value, None);
    elem
}

/// `implied` is the collection item type; items of that type carry no `m:type`
fn fill_element(elem: &mut Element, value: &PropertyValue, implied: Option<&str>) {
    let set_type = |elem: &mut Element, type_name: &str| {
        if implied != Some(type_name) {
            elem.set_edm_type(type_name);
        }
    };

    match value {
        PropertyValue::Null { type_name } => {
            if let Some(type_name) = type_name {
                set_type(elem, type_name);
            }
            elem.set_null();
        }
        PropertyValue::Primitive(primitive) => {
            let edm_type = primitive.edm_type();
            if edm_type != EdmSimpleType::String {
                set_type(elem, &edm_type.to_string());
            }
            match primitive {
                PrimitiveValue::Geospatial(geo) => elem.push_element(geo.to_gml()),
                other => elem.push_text(other.to_wire_string()),
            }
        }
        PropertyValue::Complex {
            type_name,
            properties,
        } => {
            if let Some(type_name) = type_name {
                set_type(elem, type_name);
            }
            for property in properties {
                elem.push_element(element_from_property(property));
            }
        }
        PropertyValue::Collection { type_name, items } => {
            if let Some(type_name) = type_name {
                set_type(elem, type_name);
            }
            let item_type = type_name.as_deref().and_then(collection_item_type);
            for item in items {
                let mut child = Element::new(Some(NS_DATASERVICES), ELEM_ELEMENT);
                fill_element(&mut child, item, item_type);
                elem.push_element(child);
            }
        }
        PropertyValue::Enum { type_name, value } => {
            set_type(elem, type_name);
            elem.push_text(value.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NAVIGATION_LINK_REL;
    use crate::edm::metadata::EdmMetadata;
    use crate::error::CodecError;

    fn props(children: Vec<Element>) -> Element {
        let mut elem = Element::new(Some(NS_METADATA), ATOM_ELEM_PROPERTIES);
        for child in children {
            elem.push_element(child);
        }
        elem
    }

    fn d(name: &str) -> Element {
        Element::new(Some(NS_DATASERVICES), name)
    }

    #[test]
    fn test_untyped_property_defaults_to_string() {
        let binder = Binder::new(ODataVersion::V3);
        let prop = binder
            .property_from_element(&d("Name").with_text("A"), None)
            .unwrap();
        assert_eq!(
            prop.value,
            PropertyValue::Primitive(PrimitiveValue::String("A".to_string()))
        );
    }

    #[test]
    fn test_null_keeps_declared_type() {
        let binder = Binder::new(ODataVersion::V3);
        let mut elem = d("Age");
        elem.set_edm_type("Edm.Int32");
        elem.set_null();
        let prop = binder.property_from_element(&elem, None).unwrap();
        assert_eq!(
            prop.value,
            PropertyValue::Null {
                type_name: Some("Edm.Int32".to_string())
            }
        );
    }

    #[test]
    fn test_complex_and_collection() {
        let binder = Binder::new(ODataVersion::V3);
        let mut address = d("Address").with_child(d("City").with_text("Oslo"));
        address.set_edm_type("NS.Address");
        let mut tags = d("Tags")
            .with_child(d("element").with_text("1"))
            .with_child(d("element").with_text("2"));
        tags.set_edm_type("Collection(Edm.Int32)");

        let address = binder.property_from_element(&address, None).unwrap();
        match &address.value {
            PropertyValue::Complex {
                type_name,
                properties,
            } => {
                assert_eq!(type_name.as_deref(), Some("NS.Address"));
                assert_eq!(properties[0].name, "City");
            }
            other => panic!("expected complex, got {other:?}"),
        }

        let tags = binder.property_from_element(&tags, None).unwrap();
        assert_eq!(
            tags.value,
            PropertyValue::Collection {
                type_name: Some("Collection(Edm.Int32)".to_string()),
                items: vec![
                    PropertyValue::Primitive(PrimitiveValue::Int32(1)),
                    PropertyValue::Primitive(PrimitiveValue::Int32(2)),
                ],
            }
        );

        // Item types are implied by the collection type
        let rebuilt = element_from_property(&tags);
        assert!(rebuilt.child_elements().all(|c| c.edm_type().is_none()));
    }

    #[test]
    fn test_version_check() {
        let binder = Binder::new(ODataVersion::V4);
        let mut elem = d("When").with_text("2024-01-01T00:00:00");
        elem.set_edm_type("Edm.DateTime");
        let err = binder.property_from_element(&elem, None).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_resolver_supplies_types() {
        let edmx = r#"<edmx:Edmx Version="1.0" xmlns:edmx="http://schemas.microsoft.com/ado/2007/06/edmx">
          <edmx:DataServices>
            <Schema Namespace="NS" xmlns="http://schemas.microsoft.com/ado/2009/11/edm">
              <EntityType Name="Order">
                <Key><PropertyRef Name="Id"/></Key>
                <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
              </EntityType>
            </Schema>
          </edmx:DataServices>
        </edmx:Edmx>"#;
        let metadata = EdmMetadata::parse(edmx).unwrap();
        let binder = Binder::new(ODataVersion::V3).with_resolver(Arc::new(metadata));

        let mut entry = EntryResource::new();
        entry.entity_type = Some("NS.Order".to_string());
        entry.content = Some(props(vec![d("Id").with_text("7")]));
        let entity = binder.entity_from_entry(&entry).unwrap();
        assert_eq!(
            entity.property("Id").unwrap().value,
            PropertyValue::Primitive(PrimitiveValue::Int32(7))
        );

        // A type inferred from a JSON string yields to the declared one
        let mut id = d("Id").with_text("8");
        id.inferred_type = Some("Edm.String".to_string());
        entry.content = Some(props(vec![id]));
        let entity = binder.entity_from_entry(&entry).unwrap();
        assert_eq!(
            entity.property("Id").unwrap().value,
            PropertyValue::Primitive(PrimitiveValue::Int32(8))
        );
    }

    #[test]
    fn test_inferred_type_without_resolver() {
        let binder = Binder::new(ODataVersion::V3);
        let mut flag = d("Active").with_text("true");
        flag.inferred_type = Some("Edm.Boolean".to_string());
        let prop = binder.property_from_element(&flag, Some("NS.Order")).unwrap();
        assert_eq!(
            prop.value,
            PropertyValue::Primitive(PrimitiveValue::Boolean(true))
        );
    }

    #[test]
    fn test_inline_targets() {
        let binder = Binder::new(ODataVersion::V3);
        let mut inner = EntryResource::new();
        inner.content = Some(props(vec![]));
        let mut entry = EntryResource::new();
        entry.content = Some(props(vec![]));
        entry.navigation_links.push(
            LinkResource::new(LinkType::EntityNavigation, "Customer", "Orders(1)/Customer")
                .with_inline(Inline::Entry(Box::new(inner))),
        );
        entry.navigation_links.push(
            LinkResource::new(LinkType::EntitySetNavigation, "Items", "Orders(1)/Items")
                .with_inline(Inline::Feed(Box::new(FeedResource::new()))),
        );
        entry.navigation_links.push(LinkResource::new(
            LinkType::EntitySetNavigation,
            "Notes",
            "Orders(1)/Notes",
        ));

        let entity = binder.entity_from_entry(&entry).unwrap();
        assert!(matches!(
            entity.navigation_link("Customer").unwrap().target,
            LinkTarget::InlineEntity(_)
        ));
        assert!(matches!(
            entity.navigation_link("Items").unwrap().target,
            LinkTarget::InlineEntitySet(_)
        ));
        assert_eq!(entity.navigation_link("Notes").unwrap().target, LinkTarget::Lazy);

        let back = binder.entry_from_entity(&entity).unwrap();
        assert_eq!(back.navigation_links, entry.navigation_links);
    }

    #[test]
    fn test_unresolvable_link() {
        let binder = Binder::new(ODataVersion::V3);
        let mut entry = EntryResource::new();
        entry.navigation_links.push(LinkResource {
            title: Some("Odd".to_string()),
            rel: format!("{NAVIGATION_LINK_REL}Odd"),
            href: "x".to_string(),
            link_type: Some("text/plain".to_string()),
            inline: None,
        });
        let err = binder.entity_from_entry(&entry).unwrap_err();
        assert!(matches!(err, CodecError::UnresolvableLinkType { .. }));
    }
}
