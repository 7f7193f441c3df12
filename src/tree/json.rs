//! JSON objects to element trees and back
//!
//! Property members become `d:` elements under a parent, annotated with
//! `m:type` and `m:null` the same way Atom content is, so everything
//! downstream reads a single tree shape.

use serde_json::{Map, Value};

use super::Element;
use crate::config::{JsonMetadata, ODataVersion};
use crate::constants::{
    ATOM_ELEM_PROPERTIES, ELEM_ELEMENT, JSON_LEGACY_TYPE, JSON_TYPE, NS_DATASERVICES, NS_METADATA,
};
use crate::edm::geospatial::Geospatial;
use crate::edm::primitive::PrimitiveValue;
use crate::edm::simple_type::{EDM_NAMESPACE, EdmSimpleType, infer_json_type};
use crate::error::{CodecError, Result};

/// Type name used for un-annotated empty arrays
pub const DEFAULT_COLLECTION_TYPE: &str = "Collection(Edm.String)";

/// Whether `type_name` names a collection, e.g. `Collection(Edm.Int32)`
pub fn is_collection_type(type_name: &str) -> bool {
    type_name.starts_with("Collection(") && type_name.ends_with(')')
}

/// Item type of a collection type name
pub fn collection_item_type(type_name: &str) -> Option<&str> {
    type_name
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
}

/// Normalise a type annotation value
///
/// Strips the V4 `#` marker and qualifies bare primitive names, so that
/// `#Int32`, `Edm.Int32` and `Int32` all read as `Edm.Int32`.
pub fn normalize_type_name(raw: &str) -> String {
    let name = raw.trim().trim_start_matches('#');
    if let Some(item) = collection_item_type(name) {
        return format!("Collection({})", normalize_type_name(item));
    }
    if !name.contains('.') && EdmSimpleType::type_for(name).is_ok() {
        format!("{EDM_NAMESPACE}.{name}")
    } else {
        name.to_string()
    }
}

/// Render a type name the way `version` writes annotation values
pub fn annotation_type_name(version: ODataVersion, type_name: &str) -> String {
    match version {
        ODataVersion::V3 => type_name.to_string(),
        ODataVersion::V4 => {
            let short = match collection_item_type(type_name) {
                Some(item) => format!(
                    "Collection({})",
                    item.strip_prefix("Edm.").unwrap_or(item)
                ),
                None => type_name
                    .strip_prefix("Edm.")
                    .unwrap_or(type_name)
                    .to_string(),
            };
            format!("#{short}")
        }
    }
}

/// Whether a member key is a control or property annotation rather than a property
pub fn is_annotation_key(key: &str) -> bool {
    key.contains('@') || key.starts_with("odata.") || key.starts_with('#')
}

/// Type annotation attached to `property` in `obj`, if any
pub fn property_type_annotation(obj: &Map<String, Value>, property: &str) -> Option<String> {
    [
        format!("{property}@{JSON_TYPE}"),
        format!("{property}{JSON_LEGACY_TYPE}"),
    ]
    .iter()
    .find_map(|key| obj.get(key).and_then(Value::as_str))
    .map(normalize_type_name)
}

/// In-object type annotation (`odata.type` / `@odata.type`)
pub fn object_type_annotation(obj: &Map<String, Value>) -> Option<String> {
    obj.get(JSON_TYPE)
        .or_else(|| obj.get(&format!("@{JSON_TYPE}")))
        .and_then(Value::as_str)
        .map(normalize_type_name)
}

/// Converts between JSON property members and element trees
#[derive(Debug, Clone, Copy)]
pub struct JsonTreeBuilder {
    version: ODataVersion,
}

impl JsonTreeBuilder {
    pub fn new(version: ODataVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ODataVersion {
        self.version
    }

    /// Build an `m:properties` element from the property members of `obj`
    pub fn build_properties(&self, obj: &Map<String, Value>) -> Result<Element> {
        let mut properties = Element::new(Some(NS_METADATA), ATOM_ELEM_PROPERTIES);
        self.build_subtree(&mut properties, obj)?;
        Ok(properties)
    }

    /// Append one child element per property member of `obj` to `parent`
    ///
    /// Annotation members never become children: type annotations set the
    /// `m:type` of the annotated node, everything else is skipped.
    pub fn build_subtree(&self, parent: &mut Element, obj: &Map<String, Value>) -> Result<()> {
        if let Some(type_name) = object_type_annotation(obj) {
            parent.set_edm_type(type_name);
        }
        for (key, value) in obj {
            if is_annotation_key(key) {
                continue;
            }
            let declared = property_type_annotation(obj, key);
            let property = self.build_property(key, value, declared.as_deref())?;
            parent.push_element(property);
        }
        Ok(())
    }

    /// Build the element for a single named value
    pub fn build_property(
        &self,
        name: &str,
        value: &Value,
        declared: Option<&str>,
    ) -> Result<Element> {
        let mut elem = Element::new(Some(NS_DATASERVICES), name);
        self.fill(&mut elem, value, declared)?;
        Ok(elem)
    }

    fn fill(&self, elem: &mut Element, value: &Value, declared: Option<&str>) -> Result<()> {
        if let Some(type_name) = declared {
            elem.set_edm_type(type_name);
        }

        if value.is_null() {
            elem.set_null();
            return Ok(());
        }

        // Geospatial values go to the GeoJSON codec, never the generic walker
        if let Some(type_name) = declared.filter(|t| EdmSimpleType::is_geospatial_name(t)) {
            let edm_type = EdmSimpleType::type_for(type_name)?;
            let geo = Geospatial::from_geojson(edm_type, value)?;
            elem.set_edm_type(geo.edm_type().to_string());
            elem.push_element(geo.to_gml());
            return Ok(());
        }

        match value {
            Value::Object(obj) => {
                if declared.is_none() {
                    if let Some(type_name) = object_type_annotation(obj) {
                        if EdmSimpleType::is_geospatial_name(&type_name) {
                            return self.fill(elem, value, Some(&type_name));
                        }
                    }
                }
                self.build_subtree(elem, obj)
            }
            Value::Array(items) => {
                let inferred = match declared {
                    Some(_) => None,
                    None => infer_collection_type(items),
                };
                elem.inferred_type = inferred.clone();
                let item_type = declared
                    .or(inferred.as_deref())
                    .and_then(collection_item_type);
                for item in items {
                    let mut child = Element::new(Some(NS_DATASERVICES), ELEM_ELEMENT);
                    self.fill_item(&mut child, item, item_type)?;
                    elem.push_element(child);
                }
                Ok(())
            }
            scalar => self.fill_scalar(elem, scalar, declared),
        }
    }

    fn fill_item(&self, elem: &mut Element, item: &Value, item_type: Option<&str>) -> Result<()> {
        match item {
            Value::Null => {
                elem.set_null();
                Ok(())
            }
            Value::Object(_) | Value::Array(_) => self.fill(elem, item, item_type),
            scalar => {
                let edm_type = match item_type.filter(|t| t.starts_with("Edm.")) {
                    Some(t) => Some(EdmSimpleType::type_for(t)?),
                    None => None,
                };
                elem.push_text(canonical_text(edm_type, scalar)?);
                Ok(())
            }
        }
    }

    fn fill_scalar(&self, elem: &mut Element, scalar: &Value, declared: Option<&str>) -> Result<()> {
        let edm_type = match declared {
            Some(type_name) if type_name.starts_with("Edm.") => {
                Some(EdmSimpleType::type_for(type_name)?)
            }
            // Enum and type definition members carry their text as-is
            Some(_) => None,
            None => {
                let inferred = infer_json_type(scalar).ok_or_else(|| {
                    CodecError::MalformedPayload(format!("unexpected JSON value {scalar}"))
                })?;
                elem.inferred_type = Some(inferred.to_string());
                Some(inferred)
            }
        };
        elem.push_text(canonical_text(edm_type, scalar)?);
        Ok(())
    }

    /// Write the property children of `content` as JSON members
    pub fn write_subtree(
        &self,
        content: &Element,
        metadata: JsonMetadata,
    ) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for child in content.child_elements() {
            let (annotation, value) = self.write_property(child, metadata)?;
            if let Some(type_name) = annotation {
                out.insert(
                    format!("{}@{JSON_TYPE}", child.name),
                    Value::String(annotation_type_name(self.version, &type_name)),
                );
            }
            out.insert(child.name.clone(), value);
        }
        Ok(out)
    }

    /// JSON value of one property element, plus the type to annotate it with
    pub fn write_property(
        &self,
        prop: &Element,
        metadata: JsonMetadata,
    ) -> Result<(Option<String>, Value)> {
        let declared = prop.value_type().map(str::to_string);
        let value = self.write_value(prop, declared.as_deref(), metadata)?;

        // Complex values carry their type inside the object
        let carries_own_type = value.is_object() && !is_geo(declared.as_deref());
        let annotate = !carries_own_type
            && match (&declared, metadata) {
                (None, _) | (_, JsonMetadata::None) => false,
                (Some(_), JsonMetadata::Full) => true,
                (Some(declared), JsonMetadata::Minimal) => {
                    inferred_type_of(&value).as_deref() != Some(declared.as_str())
                }
            };
        Ok((if annotate { declared } else { None }, value))
    }

    fn write_value(
        &self,
        elem: &Element,
        declared: Option<&str>,
        metadata: JsonMetadata,
    ) -> Result<Value> {
        if elem.is_null() {
            return Ok(Value::Null);
        }

        if let Some(type_name) = declared.filter(|t| EdmSimpleType::is_geospatial_name(t)) {
            let geo = Geospatial::from_gml(EdmSimpleType::type_for(type_name)?, elem)?;
            return Ok(geo.to_geojson());
        }

        let is_collection =
            declared.is_some_and(is_collection_type) || elem.is_collection_like();
        if is_collection {
            let item_type = declared.and_then(collection_item_type);
            let items = elem
                .child_elements()
                .map(|item| self.write_item(item, item_type, metadata))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Value::Array(items));
        }

        if elem.has_element_children() {
            let mut obj = Map::new();
            if let Some(type_name) = declared {
                if metadata != JsonMetadata::None {
                    obj.insert(
                        self.version.annotation(JSON_TYPE),
                        Value::String(annotation_type_name(self.version, type_name)),
                    );
                }
            }
            obj.extend(self.write_subtree(elem, metadata)?);
            return Ok(Value::Object(obj));
        }

        let text = elem.text();
        match declared {
            Some(type_name) if type_name.starts_with("Edm.") => {
                let edm_type = EdmSimpleType::type_for(type_name)?;
                if edm_type == EdmSimpleType::String {
                    Ok(Value::String(text))
                } else {
                    Ok(PrimitiveValue::parse(edm_type, &text)?.to_json(self.version))
                }
            }
            _ => Ok(Value::String(text)),
        }
    }

    fn write_item(
        &self,
        item: &Element,
        item_type: Option<&str>,
        metadata: JsonMetadata,
    ) -> Result<Value> {
        let own_type = item.edm_type().or(item_type);
        self.write_value(item, own_type, metadata)
    }
}

fn is_geo(type_name: Option<&str>) -> bool {
    type_name.is_some_and(EdmSimpleType::is_geospatial_name)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text of a scalar, canonicalised when its primitive type is known
fn canonical_text(edm_type: Option<EdmSimpleType>, scalar: &Value) -> Result<String> {
    match edm_type {
        Some(EdmSimpleType::String) | None => Ok(scalar_text(scalar)),
        Some(t) => Ok(PrimitiveValue::from_json(t, scalar)?.to_wire_string()),
    }
}

/// Collection type a reader infers for an un-annotated array
///
/// Empty arrays read as `Collection(Edm.String)`; arrays of scalars sharing
/// one inferred type read as a collection of that type. Anything else has no
/// inferable type.
pub fn infer_collection_type(items: &[Value]) -> Option<String> {
    let mut common: Option<EdmSimpleType> = None;
    for item in items {
        match infer_json_type(item) {
            Some(t) if t != EdmSimpleType::Null && common.is_none_or(|c| c == t) => {
                common = Some(t)
            }
            _ => return None,
        }
    }
    Some(format!(
        "Collection({})",
        common.unwrap_or(EdmSimpleType::String)
    ))
}

/// Type a reader would infer for an un-annotated JSON value
fn inferred_type_of(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => infer_collection_type(items),
        Value::Object(_) => None,
        other => infer_json_type(other).map(|t| t.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn builder() -> JsonTreeBuilder {
        JsonTreeBuilder::new(ODataVersion::V3)
    }

    #[test]
    fn test_type_annotation_sets_attribute() {
        let props = builder()
            .build_properties(&obj(json!({"Age@odata.type": "Edm.Int16", "Age": 7})))
            .unwrap();
        let children: Vec<_> = props.child_elements().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].edm_type(), Some("Edm.Int16"));
        assert_eq!(children[0].text(), "7");
    }

    #[test]
    fn test_v4_and_legacy_annotations() {
        let props = builder()
            .build_properties(&obj(json!({
                "A@odata.type": "#Int64", "A": 1,
                "B@type": "Edm.Byte", "B": 2
            })))
            .unwrap();
        let a = props.find_child(Some(NS_DATASERVICES), "A").unwrap();
        let b = props.find_child(Some(NS_DATASERVICES), "B").unwrap();
        assert_eq!(a.edm_type(), Some("Edm.Int64"));
        assert_eq!(b.edm_type(), Some("Edm.Byte"));
    }

    #[test]
    fn test_inference_and_null() {
        let props = builder()
            .build_properties(&obj(json!({
                "I": 1, "D": 2.50, "B": true, "S": "x",
                "N@odata.type": "Edm.String", "N": null
            })))
            .unwrap();
        let types: Vec<_> = props.child_elements().map(|e| e.value_type()).collect();
        assert_eq!(
            types,
            vec![
                Some("Edm.Int32"),
                Some("Edm.Decimal"),
                Some("Edm.Boolean"),
                Some("Edm.String"),
                Some("Edm.String")
            ]
        );
        // Only the annotated member carries m:type
        let annotated: Vec<_> = props.child_elements().filter_map(|e| e.edm_type()).collect();
        assert_eq!(annotated, vec!["Edm.String"]);
        let d = props.find_child(Some(NS_DATASERVICES), "D").unwrap();
        assert_eq!(d.text(), "2.5");
        let n = props.find_child(Some(NS_DATASERVICES), "N").unwrap();
        assert!(n.is_null());
    }

    #[test]
    fn test_arrays_use_element_items() {
        let props = builder()
            .build_properties(&obj(json!({"Tags": ["a", "b"], "Empty": []})))
            .unwrap();
        let tags = props.find_child(Some(NS_DATASERVICES), "Tags").unwrap();
        assert!(tags.is_collection_like());
        assert_eq!(tags.value_type(), Some("Collection(Edm.String)"));
        let empty = props.find_child(Some(NS_DATASERVICES), "Empty").unwrap();
        assert_eq!(empty.value_type(), Some(DEFAULT_COLLECTION_TYPE));
        assert!(!empty.has_element_children());
    }

    #[test]
    fn test_geospatial_member() {
        let props = builder()
            .build_properties(&obj(json!({
                "Loc@odata.type": "Edm.Geography",
                "Loc": {"type": "Point", "coordinates": [1.0, 2.0]}
            })))
            .unwrap();
        let loc = props.find_child(Some(NS_DATASERVICES), "Loc").unwrap();
        assert_eq!(loc.edm_type(), Some("Edm.GeographyPoint"));
        assert!(loc.child_elements().next().unwrap().name == "Point");
    }

    #[test]
    fn test_malformed_geospatial_member() {
        let err = builder()
            .build_properties(&obj(json!({
                "Loc@odata.type": "Edm.GeographyPoint",
                "Loc": {"type": "Point"}
            })))
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedGeospatialPayload(_)));
    }

    #[test]
    fn test_minimal_metadata_annotates_only_when_needed() {
        let source = obj(json!({
            "I": 1,
            "Small@odata.type": "Edm.Int16", "Small": 1,
            "When@odata.type": "Edm.DateTime", "When": "2013-01-01T00:00:00",
            "Addr": {"odata.type": "NS.Address", "City": "Rome"},
            "Gone@odata.type": "Edm.Int32", "Gone": null
        }));
        let tree = builder().build_properties(&source).unwrap();
        let out = builder().write_subtree(&tree, JsonMetadata::Minimal).unwrap();
        assert!(!out.contains_key("I@odata.type"));
        assert_eq!(out["Small@odata.type"], "Edm.Int16");
        assert_eq!(out["When@odata.type"], "Edm.DateTime");
        assert_eq!(out["Addr"]["odata.type"], "NS.Address");
        assert_eq!(out["Gone@odata.type"], "Edm.Int32");
        assert_eq!(out["Gone"], Value::Null);

        let none = builder().write_subtree(&tree, JsonMetadata::None).unwrap();
        assert!(none.keys().all(|k| !k.contains('@')));
        assert!(none["Addr"].get("odata.type").is_none());
    }

    #[test]
    fn test_rebuild_is_stable() {
        let source = obj(json!({
            "Id": 1, "Price": "12.50", "Price@odata.type": "Edm.Decimal",
            "Tags": ["x"], "None": [], "Loc@odata.type": "Edm.GeometryPoint",
            "Loc": {"type": "Point", "coordinates": [1.5, 2.5]}
        }));
        let tree = builder().build_properties(&source).unwrap();
        let written = builder().write_subtree(&tree, JsonMetadata::Minimal).unwrap();
        let rebuilt = builder().build_properties(&written).unwrap();
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_v4_type_names() {
        assert_eq!(annotation_type_name(ODataVersion::V4, "Edm.Int16"), "#Int16");
        assert_eq!(
            annotation_type_name(ODataVersion::V4, "Collection(Edm.Guid)"),
            "#Collection(Guid)"
        );
        assert_eq!(normalize_type_name("#Collection(Guid)"), "Collection(Edm.Guid)");
        assert_eq!(normalize_type_name("#NS.Color"), "NS.Color");
    }
}
