//! Standalone JSON property payloads (`{"value": ...}`)

use serde_json::{Map, Value};

use super::{as_object, context_url};
use crate::config::{JsonMetadata, ODataVersion};
use crate::constants::{JSON_CONTEXT_V4, JSON_METADATA, JSON_TYPE, JSON_VALUE};
use crate::edm::simple_type::EdmSimpleType;
use crate::error::Result;
use crate::tree::Element;
use crate::tree::json::{
    JsonTreeBuilder, annotation_type_name, is_collection_type, normalize_type_name,
    object_type_annotation, property_type_annotation,
};

/// Type named by the fragment of a metadata URL, e.g. `$metadata#Edm.Int32`
fn context_type(context: &str) -> Option<String> {
    let (_, fragment) = context.rsplit_once('#')?;
    let type_name = normalize_type_name(fragment);
    (EdmSimpleType::is_edm_name(&type_name) || is_collection_type(&type_name)).then_some(type_name)
}

/// Read a property payload into a `d:value` element
///
/// Primitive and collection values sit in the `value` member; a complex
/// value is the payload object itself.
pub fn property_from_value(value: &Value, version: ODataVersion) -> Result<Element> {
    let obj = as_object(value)?;
    let declared = property_type_annotation(obj, JSON_VALUE)
        .or_else(|| object_type_annotation(obj))
        .or_else(|| context_url(obj).as_deref().and_then(context_type));
    let builder = JsonTreeBuilder::new(version);

    match obj.get(JSON_VALUE) {
        Some(inner) => builder.build_property(JSON_VALUE, inner, declared.as_deref()),
        None => {
            let members: Map<String, Value> = obj
                .iter()
                .filter(|(key, _)| {
                    !matches!(key.as_str(), JSON_METADATA | JSON_CONTEXT_V4 | "odata.context")
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            builder.build_property(JSON_VALUE, &Value::Object(members), declared.as_deref())
        }
    }
}

/// Write a property element as a property payload
pub fn property_to_value(
    elem: &Element,
    version: ODataVersion,
    metadata: JsonMetadata,
    context: Option<&str>,
) -> Result<Value> {
    let builder = JsonTreeBuilder::new(version);
    let (annotation, value) = builder.write_property(elem, metadata)?;

    let mut out = Map::new();
    if metadata != JsonMetadata::None {
        if let Some(context) = context {
            out.insert(version.metadata_key().to_string(), Value::from(context));
        }
    }

    let is_geo = elem.edm_type().is_some_and(EdmSimpleType::is_geospatial_name);
    match value {
        Value::Object(members) if !is_geo => out.extend(members),
        other => {
            if let Some(type_name) = annotation {
                out.insert(
                    version.annotation(JSON_TYPE),
                    Value::String(annotation_type_name(version, &type_name)),
                );
            }
            out.insert(JSON_VALUE.to_string(), other);
        }
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_property_from_context() {
        let payload = json!({
            "odata.metadata": "http://host/svc/$metadata#Edm.Int64",
            "value": "9007199254740993"
        });
        let elem = property_from_value(&payload, ODataVersion::V3).unwrap();
        assert_eq!(elem.name, "value");
        assert_eq!(elem.edm_type(), Some("Edm.Int64"));
        assert_eq!(elem.text(), "9007199254740993");
    }

    #[test]
    fn test_complex_property() {
        let payload = json!({
            "odata.type": "NS.Address",
            "Street": "Main St",
            "Number": 12
        });
        let elem = property_from_value(&payload, ODataVersion::V3).unwrap();
        assert_eq!(elem.edm_type(), Some("NS.Address"));
        assert_eq!(elem.child_elements().count(), 2);

        let out = property_to_value(&elem, ODataVersion::V3, JsonMetadata::Minimal, None).unwrap();
        assert_eq!(out["odata.type"], json!("NS.Address"));
        assert_eq!(out["Street"], json!("Main St"));
    }

    #[test]
    fn test_write_v4_primitive() {
        let mut elem = Element::new(None, "value").with_text("42");
        elem.set_edm_type("Edm.Int16");
        let out = property_to_value(
            &elem,
            ODataVersion::V4,
            JsonMetadata::Full,
            Some("http://host/$metadata#Edm.Int16"),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({
                "@odata.context": "http://host/$metadata#Edm.Int16",
                "@odata.type": "#Int16",
                "value": 42
            })
        );
    }

    #[test]
    fn test_null_property() {
        let payload = json!({"value@odata.type": "Edm.String", "value": null});
        let elem = property_from_value(&payload, ODataVersion::V3).unwrap();
        assert!(elem.is_null());
        assert_eq!(elem.edm_type(), Some("Edm.String"));
    }
}
