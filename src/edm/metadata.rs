//! Schema metadata (EDMX) and property type resolution
//!
//! V3 and V4 services describe their schema with different EDMX dialects.
//! [`EdmMetadata`] keeps one variant per protocol version; the lookups that
//! differ (navigation targets) dispatch on the variant.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::ODataVersion;
use crate::error::{CodecError, Result};

/// Supplies declared types for named properties during deserialization
pub trait TypeResolver: Send + Sync {
    /// Declared type of `property` on the structured type `owner`
    fn property_type(&self, owner: &str, property: &str) -> Option<String>;

    /// Whether `type_name` is an enumeration type
    fn is_enum_type(&self, _type_name: &str) -> bool {
        false
    }
}

/// A structural property declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
}

/// A navigation property declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPropertyDef {
    pub name: String,
    /// V4: target type, possibly `Collection(...)`
    pub type_name: Option<String>,
    /// V3: association and target role
    pub relationship: Option<String>,
    pub to_role: Option<String>,
}

/// Entity or complex type declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredType {
    pub name: String,
    pub base_type: Option<String>,
    pub key: Vec<String>,
    pub properties: Vec<PropertyDef>,
    pub navigation_properties: Vec<NavigationPropertyDef>,
    /// Entity is a media entity
    pub has_stream: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumTypeDef {
    pub name: String,
    pub underlying_type: Option<String>,
    pub is_flags: bool,
    pub members: Vec<(String, Option<i64>)>,
}

/// V3 association end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationEnd {
    pub role: String,
    pub type_name: String,
    pub multiplicity: String,
}

/// V3 association between two entity types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Association {
    pub name: String,
    pub ends: Vec<AssociationEnd>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub namespace: String,
    pub alias: Option<String>,
    pub entity_types: Vec<StructuredType>,
    pub complex_types: Vec<StructuredType>,
    pub enum_types: Vec<EnumTypeDef>,
    pub associations: Vec<Association>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataV3 {
    pub schemas: Vec<Schema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataV4 {
    pub schemas: Vec<Schema>,
}

/// Parsed service metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdmMetadata {
    V3(MetadataV3),
    V4(MetadataV4),
}

impl EdmMetadata {
    /// Parse an EDMX document
    ///
    /// The protocol version comes from the `Version` attribute of the root
    /// `Edmx` element (`4.0` for V4, anything else for V3).
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut version: Option<ODataVersion> = None;
        let mut schemas: Vec<Schema> = Vec::new();
        let mut current_type: Option<(TypeKind, StructuredType)> = None;
        let mut current_enum: Option<EnumTypeDef> = None;
        let mut current_assoc: Option<Association> = None;
        let mut in_key = false;

        loop {
            let event = reader.read_event().map_err(|e| {
                CodecError::MalformedPayload(format!(
                    "EDMX parsing error at position {}: {e}",
                    reader.error_position()
                ))
            })?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let local_name = local_name(e);
                    match local_name.as_str() {
                        "Edmx" => {
                            version = Some(match attr(e, "Version").as_deref() {
                                Some("4.0") | Some("4.01") => ODataVersion::V4,
                                _ => ODataVersion::V3,
                            });
                        }
                        "Schema" => schemas.push(Schema {
                            namespace: attr(e, "Namespace").unwrap_or_default(),
                            alias: attr(e, "Alias"),
                            ..Default::default()
                        }),
                        "EntityType" | "ComplexType" => {
                            let kind = if local_name == "EntityType" {
                                TypeKind::Entity
                            } else {
                                TypeKind::Complex
                            };
                            let def = StructuredType {
                                name: attr(e, "Name").unwrap_or_default(),
                                base_type: attr(e, "BaseType"),
                                has_stream: attr(e, "HasStream").as_deref() == Some("true"),
                                ..Default::default()
                            };
                            if is_empty {
                                push_type(&mut schemas, kind, def);
                            } else {
                                current_type = Some((kind, def));
                            }
                        }
                        "Key" => in_key = !is_empty,
                        "PropertyRef" if in_key => {
                            if let (Some((_, def)), Some(name)) =
                                (current_type.as_mut(), attr(e, "Name"))
                            {
                                def.key.push(name);
                            }
                        }
                        "Property" => {
                            if let Some((_, def)) = current_type.as_mut() {
                                def.properties.push(PropertyDef {
                                    name: attr(e, "Name").unwrap_or_default(),
                                    type_name: attr(e, "Type").unwrap_or_default(),
                                    nullable: attr(e, "Nullable").as_deref() != Some("false"),
                                });
                            }
                        }
                        "NavigationProperty" => {
                            if let Some((_, def)) = current_type.as_mut() {
                                def.navigation_properties.push(NavigationPropertyDef {
                                    name: attr(e, "Name").unwrap_or_default(),
                                    type_name: attr(e, "Type"),
                                    relationship: attr(e, "Relationship"),
                                    to_role: attr(e, "ToRole"),
                                });
                            }
                        }
                        "EnumType" => {
                            let def = EnumTypeDef {
                                name: attr(e, "Name").unwrap_or_default(),
                                underlying_type: attr(e, "UnderlyingType"),
                                is_flags: attr(e, "IsFlags").as_deref() == Some("true"),
                                members: Vec::new(),
                            };
                            if is_empty {
                                if let Some(schema) = schemas.last_mut() {
                                    schema.enum_types.push(def);
                                }
                            } else {
                                current_enum = Some(def);
                            }
                        }
                        "Member" => {
                            if let Some(def) = current_enum.as_mut() {
                                def.members.push((
                                    attr(e, "Name").unwrap_or_default(),
                                    attr(e, "Value").and_then(|v| v.parse().ok()),
                                ));
                            }
                        }
                        // Association sets inside the entity container reuse "End"
                        "Association" if current_assoc.is_none() => {
                            current_assoc = Some(Association {
                                name: attr(e, "Name").unwrap_or_default(),
                                ends: Vec::new(),
                            });
                        }
                        "End" => {
                            if let (Some(assoc), Some(type_name)) =
                                (current_assoc.as_mut(), attr(e, "Type"))
                            {
                                assoc.ends.push(AssociationEnd {
                                    role: attr(e, "Role").unwrap_or_default(),
                                    type_name,
                                    multiplicity: attr(e, "Multiplicity").unwrap_or_default(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let name = e.local_name();
                    match name.as_ref() {
                        b"EntityType" | b"ComplexType" => {
                            if let Some((kind, def)) = current_type.take() {
                                push_type(&mut schemas, kind, def);
                            }
                        }
                        b"Key" => in_key = false,
                        b"EnumType" => {
                            if let (Some(def), Some(schema)) =
                                (current_enum.take(), schemas.last_mut())
                            {
                                schema.enum_types.push(def);
                            }
                        }
                        b"Association" => {
                            if let (Some(assoc), Some(schema)) =
                                (current_assoc.take(), schemas.last_mut())
                            {
                                schema.associations.push(assoc);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let version = version.ok_or_else(|| {
            CodecError::MalformedPayload("EDMX document has no Edmx root element".to_string())
        })?;
        tracing::debug!(%version, schemas = schemas.len(), "parsed service metadata");
        Ok(match version {
            ODataVersion::V3 => EdmMetadata::V3(MetadataV3 { schemas }),
            ODataVersion::V4 => EdmMetadata::V4(MetadataV4 { schemas }),
        })
    }

    pub fn version(&self) -> ODataVersion {
        match self {
            EdmMetadata::V3(_) => ODataVersion::V3,
            EdmMetadata::V4(_) => ODataVersion::V4,
        }
    }

    pub fn schemas(&self) -> &[Schema] {
        match self {
            EdmMetadata::V3(m) => &m.schemas,
            EdmMetadata::V4(m) => &m.schemas,
        }
    }

    /// Find a schema by namespace or alias and split off the simple name
    fn split_qualified<'a>(&self, qualified: &'a str) -> Option<(&Schema, &'a str)> {
        let (ns, simple) = qualified.rsplit_once('.')?;
        self.schemas()
            .iter()
            .find(|s| s.namespace == ns || s.alias.as_deref() == Some(ns))
            .map(|s| (s, simple))
    }

    /// Entity or complex type by qualified name
    pub fn structured_type(&self, qualified: &str) -> Option<&StructuredType> {
        let (schema, simple) = self.split_qualified(qualified)?;
        schema
            .entity_types
            .iter()
            .chain(schema.complex_types.iter())
            .find(|t| t.name == simple)
    }

    pub fn enum_type(&self, qualified: &str) -> Option<&EnumTypeDef> {
        let (schema, simple) = self.split_qualified(qualified)?;
        schema.enum_types.iter().find(|t| t.name == simple)
    }

    /// Qualified name with any alias replaced by its namespace
    pub fn resolve_alias(&self, qualified: &str) -> String {
        if let Some(item) = qualified
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return format!("Collection({})", self.resolve_alias(item));
        }
        match self.split_qualified(qualified) {
            Some((schema, simple)) => format!("{}.{simple}", schema.namespace),
            None => qualified.to_string(),
        }
    }

    /// Property declaration, searching base types
    pub fn property(&self, owner: &str, property: &str) -> Option<&PropertyDef> {
        let mut current = self.structured_type(owner);
        // Bounded walk guards against cyclic base types
        for _ in 0..32 {
            let def = current?;
            if let Some(found) = def.properties.iter().find(|p| p.name == property) {
                return Some(found);
            }
            current = def
                .base_type
                .as_deref()
                .and_then(|base| self.structured_type(base));
        }
        None
    }

    /// Target entity type of a navigation property and whether it is a collection
    pub fn navigation_target(&self, owner: &str, navigation: &str) -> Option<(String, bool)> {
        let def = self.structured_type(owner)?;
        let nav = def
            .navigation_properties
            .iter()
            .find(|n| n.name == navigation)?;
        match self {
            EdmMetadata::V4(_) => {
                let type_name = nav.type_name.as_deref()?;
                let resolved = self.resolve_alias(type_name);
                match resolved
                    .strip_prefix("Collection(")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    Some(item) => Some((item.to_string(), true)),
                    None => Some((resolved, false)),
                }
            }
            EdmMetadata::V3(_) => {
                let relationship = nav.relationship.as_deref()?;
                let to_role = nav.to_role.as_deref()?;
                let (schema, simple) = self.split_qualified(relationship)?;
                let end = schema
                    .associations
                    .iter()
                    .find(|a| a.name == simple)?
                    .ends
                    .iter()
                    .find(|e| e.role == to_role)?;
                Some((self.resolve_alias(&end.type_name), end.multiplicity == "*"))
            }
        }
    }
}

impl TypeResolver for EdmMetadata {
    fn property_type(&self, owner: &str, property: &str) -> Option<String> {
        self.property(owner, property)
            .map(|p| self.resolve_alias(&p.type_name))
    }

    fn is_enum_type(&self, type_name: &str) -> bool {
        self.enum_type(type_name).is_some()
    }
}

#[derive(Debug, Clone, Copy)]
enum TypeKind {
    Entity,
    Complex,
}

fn push_type(schemas: &mut [Schema], kind: TypeKind, def: StructuredType) {
    if let Some(schema) = schemas.last_mut() {
        match kind {
            TypeKind::Entity => schema.entity_types.push(def),
            TypeKind::Complex => schema.complex_types.push(def),
        }
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}
