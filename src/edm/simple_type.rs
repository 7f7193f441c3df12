//! Registry of Edm simple (primitive) types

use serde::{Deserialize, Serialize};

use crate::config::ODataVersion;
use crate::error::{CodecError, Result};

/// Namespace of all built-in primitive types
pub const EDM_NAMESPACE: &str = "Edm";

/// Native representation category of a primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeKind {
    Null,
    Integer,
    Float,
    /// Arbitrary precision decimal
    Decimal,
    Bytes,
    Boolean,
    Timestamp,
    Duration,
    Uuid,
    Geospatial,
    String,
    Uri,
}

/// An Edm simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmSimpleType {
    Null,
    Binary,
    Boolean,
    Byte,
    SByte,
    DateTime,
    Date,
    DateTimeOffset,
    Time,
    TimeOfDay,
    Duration,
    Decimal,
    Single,
    Double,
    Geography,
    GeographyPoint,
    GeographyLineString,
    GeographyPolygon,
    GeographyMultiPoint,
    GeographyMultiLineString,
    GeographyMultiPolygon,
    GeographyCollection,
    Geometry,
    GeometryPoint,
    GeometryLineString,
    GeometryPolygon,
    GeometryMultiPoint,
    GeometryMultiLineString,
    GeometryMultiPolygon,
    GeometryCollection,
    Guid,
    Int16,
    Int32,
    Int64,
    String,
    Stream,
}

const ALL_VERSIONS: &[ODataVersion] = &[ODataVersion::V3, ODataVersion::V4];
const V3_ONLY: &[ODataVersion] = &[ODataVersion::V3];
const V4_ONLY: &[ODataVersion] = &[ODataVersion::V4];

impl EdmSimpleType {
    /// Every registered type, in registry order
    pub const ALL: [EdmSimpleType; 36] = [
        EdmSimpleType::Null,
        EdmSimpleType::Binary,
        EdmSimpleType::Boolean,
        EdmSimpleType::Byte,
        EdmSimpleType::SByte,
        EdmSimpleType::DateTime,
        EdmSimpleType::Date,
        EdmSimpleType::DateTimeOffset,
        EdmSimpleType::Time,
        EdmSimpleType::TimeOfDay,
        EdmSimpleType::Duration,
        EdmSimpleType::Decimal,
        EdmSimpleType::Single,
        EdmSimpleType::Double,
        EdmSimpleType::Geography,
        EdmSimpleType::GeographyPoint,
        EdmSimpleType::GeographyLineString,
        EdmSimpleType::GeographyPolygon,
        EdmSimpleType::GeographyMultiPoint,
        EdmSimpleType::GeographyMultiLineString,
        EdmSimpleType::GeographyMultiPolygon,
        EdmSimpleType::GeographyCollection,
        EdmSimpleType::Geometry,
        EdmSimpleType::GeometryPoint,
        EdmSimpleType::GeometryLineString,
        EdmSimpleType::GeometryPolygon,
        EdmSimpleType::GeometryMultiPoint,
        EdmSimpleType::GeometryMultiLineString,
        EdmSimpleType::GeometryMultiPolygon,
        EdmSimpleType::GeometryCollection,
        EdmSimpleType::Guid,
        EdmSimpleType::Int16,
        EdmSimpleType::Int32,
        EdmSimpleType::Int64,
        EdmSimpleType::String,
        EdmSimpleType::Stream,
    ];

    /// Short name without the `Edm.` namespace
    pub fn name(&self) -> &'static str {
        match self {
            EdmSimpleType::Null => "Null",
            EdmSimpleType::Binary => "Binary",
            EdmSimpleType::Boolean => "Boolean",
            EdmSimpleType::Byte => "Byte",
            EdmSimpleType::SByte => "SByte",
            EdmSimpleType::DateTime => "DateTime",
            EdmSimpleType::Date => "Date",
            EdmSimpleType::DateTimeOffset => "DateTimeOffset",
            EdmSimpleType::Time => "Time",
            EdmSimpleType::TimeOfDay => "TimeOfDay",
            EdmSimpleType::Duration => "Duration",
            EdmSimpleType::Decimal => "Decimal",
            EdmSimpleType::Single => "Single",
            EdmSimpleType::Double => "Double",
            EdmSimpleType::Geography => "Geography",
            EdmSimpleType::GeographyPoint => "GeographyPoint",
            EdmSimpleType::GeographyLineString => "GeographyLineString",
            EdmSimpleType::GeographyPolygon => "GeographyPolygon",
            EdmSimpleType::GeographyMultiPoint => "GeographyMultiPoint",
            EdmSimpleType::GeographyMultiLineString => "GeographyMultiLineString",
            EdmSimpleType::GeographyMultiPolygon => "GeographyMultiPolygon",
            EdmSimpleType::GeographyCollection => "GeographyCollection",
            EdmSimpleType::Geometry => "Geometry",
            EdmSimpleType::GeometryPoint => "GeometryPoint",
            EdmSimpleType::GeometryLineString => "GeometryLineString",
            EdmSimpleType::GeometryPolygon => "GeometryPolygon",
            EdmSimpleType::GeometryMultiPoint => "GeometryMultiPoint",
            EdmSimpleType::GeometryMultiLineString => "GeometryMultiLineString",
            EdmSimpleType::GeometryMultiPolygon => "GeometryMultiPolygon",
            EdmSimpleType::GeometryCollection => "GeometryCollection",
            EdmSimpleType::Guid => "Guid",
            EdmSimpleType::Int16 => "Int16",
            EdmSimpleType::Int32 => "Int32",
            EdmSimpleType::Int64 => "Int64",
            EdmSimpleType::String => "String",
            EdmSimpleType::Stream => "Stream",
        }
    }

    /// Fully qualified name, e.g. `Edm.Int32`
    pub fn full_name(&self) -> String {
        format!("{EDM_NAMESPACE}.{}", self.name())
    }

    /// Look up a type by name
    ///
    /// Accepts the qualified form (`Edm.Int32`) as well as the bare name.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownType`] when the name is not registered.
    pub fn type_for(name: &str) -> Result<Self> {
        let short = name
            .strip_prefix(EDM_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == short)
            .ok_or_else(|| CodecError::UnknownType(name.to_string()))
    }

    /// Whether `name` is a qualified `Edm.*` primitive type name
    pub fn is_edm_name(name: &str) -> bool {
        name.starts_with("Edm.") && Self::type_for(name).is_ok()
    }

    /// Target representation category
    pub fn native_kind(&self) -> NativeKind {
        match self {
            EdmSimpleType::Null => NativeKind::Null,
            EdmSimpleType::Binary => NativeKind::Bytes,
            EdmSimpleType::Boolean => NativeKind::Boolean,
            EdmSimpleType::Byte
            | EdmSimpleType::SByte
            | EdmSimpleType::Int16
            | EdmSimpleType::Int32
            | EdmSimpleType::Int64 => NativeKind::Integer,
            EdmSimpleType::DateTime | EdmSimpleType::Date | EdmSimpleType::DateTimeOffset => {
                NativeKind::Timestamp
            }
            EdmSimpleType::Time | EdmSimpleType::TimeOfDay | EdmSimpleType::Duration => {
                NativeKind::Duration
            }
            EdmSimpleType::Decimal => NativeKind::Decimal,
            EdmSimpleType::Single | EdmSimpleType::Double => NativeKind::Float,
            EdmSimpleType::Guid => NativeKind::Uuid,
            EdmSimpleType::String => NativeKind::String,
            EdmSimpleType::Stream => NativeKind::Uri,
            _ => NativeKind::Geospatial,
        }
    }

    /// Canonical text pattern, when the type has one
    ///
    /// Numeric patterns use `#` for optional digits; temporal patterns are
    /// chrono format strings.
    pub fn pattern(&self) -> Option<&'static str> {
        match self {
            EdmSimpleType::DateTime => Some("%Y-%m-%dT%H:%M:%S%.f"),
            EdmSimpleType::Date => Some("%Y-%m-%d"),
            EdmSimpleType::DateTimeOffset => Some("%Y-%m-%dT%H:%M:%S%.f%:z"),
            EdmSimpleType::TimeOfDay => Some("%H:%M:%S%.f"),
            EdmSimpleType::Decimal => Some("#.#######################"),
            EdmSimpleType::Single => Some("#.#######E0"),
            EdmSimpleType::Double => Some("#.#######################E0"),
            _ => None,
        }
    }

    /// Protocol versions in which the type exists
    pub fn supported_versions(&self) -> &'static [ODataVersion] {
        match self {
            EdmSimpleType::DateTime | EdmSimpleType::Time => V3_ONLY,
            EdmSimpleType::Date | EdmSimpleType::TimeOfDay | EdmSimpleType::Duration => V4_ONLY,
            _ => ALL_VERSIONS,
        }
    }

    pub fn is_supported_by(&self, version: ODataVersion) -> bool {
        self.supported_versions().contains(&version)
    }

    /// Fail with [`CodecError::UnsupportedVersion`] if the type does not exist in `version`
    pub fn check_version(&self, version: ODataVersion) -> Result<()> {
        if self.is_supported_by(version) {
            Ok(())
        } else {
            Err(CodecError::UnsupportedVersion {
                edm_type: self.full_name(),
                version: version.to_string(),
            })
        }
    }

    pub fn is_geospatial(&self) -> bool {
        self.name().starts_with("Geo")
    }

    /// Prefix check on a qualified type name; never fails
    pub fn is_geospatial_name(type_name: &str) -> bool {
        type_name.starts_with("Edm.Geo")
    }

    /// Abstract `Geography` / `Geometry` whose shape comes from the payload
    pub fn is_abstract_geospatial(&self) -> bool {
        matches!(self, EdmSimpleType::Geography | EdmSimpleType::Geometry)
    }

    /// Type used for date/time values in `version` when no offset is present
    pub fn local_timestamp_for(version: ODataVersion) -> Self {
        match version {
            ODataVersion::V3 => EdmSimpleType::DateTime,
            ODataVersion::V4 => EdmSimpleType::Date,
        }
    }
}

impl std::fmt::Display for EdmSimpleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{EDM_NAMESPACE}.{}", self.name())
    }
}

impl std::str::FromStr for EdmSimpleType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::type_for(s)
    }
}

/// Infer the primitive type of an un-annotated JSON scalar
///
/// Priority is Int32 > Int64 > Decimal > Double > Boolean > String: a value
/// that fits several categories takes the first. Returns `None` for arrays
/// and objects.
pub fn infer_json_type(value: &serde_json::Value) -> Option<EdmSimpleType> {
    use serde_json::Value;

    match value {
        Value::Null => Some(EdmSimpleType::Null),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i32::try_from(i).is_ok() {
                    Some(EdmSimpleType::Int32)
                } else {
                    Some(EdmSimpleType::Int64)
                }
            } else if n.is_u64() {
                Some(EdmSimpleType::Decimal)
            } else {
                let text = n.to_string();
                if text.contains(['e', 'E']) {
                    Some(EdmSimpleType::Double)
                } else {
                    Some(EdmSimpleType::Decimal)
                }
            }
        }
        Value::Bool(_) => Some(EdmSimpleType::Boolean),
        Value::String(_) => Some(EdmSimpleType::String),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_for_qualified_and_bare() {
        assert_eq!(EdmSimpleType::type_for("Edm.Int32").unwrap(), EdmSimpleType::Int32);
        assert_eq!(
            EdmSimpleType::type_for("GeographyPoint").unwrap(),
            EdmSimpleType::GeographyPoint
        );
        assert!(matches!(
            EdmSimpleType::type_for("Edm.Int128"),
            Err(CodecError::UnknownType(_))
        ));
    }

    #[test]
    fn test_display_roundtrips_through_registry() {
        for t in EdmSimpleType::ALL {
            assert_eq!(EdmSimpleType::type_for(&t.to_string()).unwrap(), t);
        }
    }

    #[test]
    fn test_geospatial_prefix() {
        assert!(EdmSimpleType::is_geospatial_name("Edm.GeometryPolygon"));
        assert!(!EdmSimpleType::is_geospatial_name("Edm.Guid"));
        assert!(!EdmSimpleType::is_geospatial_name(""));
        assert!(EdmSimpleType::GeographyCollection.is_geospatial());
        assert_eq!(
            EdmSimpleType::GeometryPoint.native_kind(),
            NativeKind::Geospatial
        );
    }

    #[test]
    fn test_versions() {
        assert!(EdmSimpleType::DateTime.is_supported_by(ODataVersion::V3));
        assert!(!EdmSimpleType::DateTime.is_supported_by(ODataVersion::V4));
        assert!(EdmSimpleType::Duration.check_version(ODataVersion::V3).is_err());
        assert!(EdmSimpleType::Int32.check_version(ODataVersion::V4).is_ok());
    }

    #[test]
    fn test_infer_json_type_priority() {
        assert_eq!(infer_json_type(&json!(42)), Some(EdmSimpleType::Int32));
        assert_eq!(
            infer_json_type(&json!(5_000_000_000i64)),
            Some(EdmSimpleType::Int64)
        );
        assert_eq!(
            infer_json_type(&json!(u64::MAX)),
            Some(EdmSimpleType::Decimal)
        );
        assert_eq!(infer_json_type(&json!(1.25)), Some(EdmSimpleType::Decimal));
        assert_eq!(infer_json_type(&json!(1e300)), Some(EdmSimpleType::Double));
        assert_eq!(infer_json_type(&json!(true)), Some(EdmSimpleType::Boolean));
        assert_eq!(infer_json_type(&json!("42")), Some(EdmSimpleType::String));
        assert_eq!(infer_json_type(&json!([1])), None);
    }
}
