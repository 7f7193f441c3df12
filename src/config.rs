//! Codec configuration
//!
//! Protocol version, payload format and JSON metadata level are always
//! explicit: payloads are never sniffed to guess their format.

use serde::{Deserialize, Serialize};

use crate::constants;

/// OData protocol version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ODataVersion {
    #[default]
    V3,
    V4,
}

impl ODataVersion {
    /// All known protocol versions
    pub const ALL: [ODataVersion; 2] = [ODataVersion::V3, ODataVersion::V4];

    /// Prefix placed in front of `odata.*` control annotations
    ///
    /// V3 writes `odata.type`, V4 writes `@odata.type`.
    pub fn annotation_prefix(&self) -> &'static str {
        match self {
            ODataVersion::V3 => "",
            ODataVersion::V4 => "@",
        }
    }

    /// Key of the context/metadata URL annotation
    pub fn metadata_key(&self) -> &'static str {
        match self {
            ODataVersion::V3 => constants::JSON_METADATA,
            ODataVersion::V4 => constants::JSON_CONTEXT_V4,
        }
    }

    /// Build a control annotation key such as `odata.id` / `@odata.id`
    pub fn annotation(&self, name: &str) -> String {
        format!("{}{}", self.annotation_prefix(), name)
    }
}

impl std::fmt::Display for ODataVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ODataVersion::V3 => write!(f, "V3"),
            ODataVersion::V4 => write!(f, "V4"),
        }
    }
}

impl std::str::FromStr for ODataVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v3" | "3" | "3.0" => Ok(ODataVersion::V3),
            "v4" | "4" | "4.0" => Ok(ODataVersion::V4),
            _ => Err(format!("Unknown OData version: {s}. Expected v3 or v4")),
        }
    }
}

/// Publishing format of entries and feeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PubFormat {
    /// Atom Publishing Protocol with OData extensions
    Atom,
    /// JSON with minimal metadata
    #[default]
    Json,
    /// JSON without any metadata annotations
    JsonNoMetadata,
    /// JSON with full metadata annotations
    JsonFullMetadata,
}

impl PubFormat {
    /// Whether this is one of the JSON variants
    pub fn is_json(&self) -> bool {
        !matches!(self, PubFormat::Atom)
    }

    /// Metadata level used when writing JSON
    pub fn json_metadata(&self) -> JsonMetadata {
        match self {
            PubFormat::JsonNoMetadata => JsonMetadata::None,
            PubFormat::JsonFullMetadata => JsonMetadata::Full,
            _ => JsonMetadata::Minimal,
        }
    }

    /// HTTP content type for this format
    pub fn content_type(&self) -> &'static str {
        match self {
            PubFormat::Atom => "application/atom+xml",
            PubFormat::Json => "application/json;odata=minimalmetadata",
            PubFormat::JsonNoMetadata => "application/json;odata=nometadata",
            PubFormat::JsonFullMetadata => "application/json;odata=fullmetadata",
        }
    }
}

impl std::fmt::Display for PubFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PubFormat::Atom => write!(f, "atom"),
            PubFormat::Json => write!(f, "json"),
            PubFormat::JsonNoMetadata => write!(f, "json-no-metadata"),
            PubFormat::JsonFullMetadata => write!(f, "json-full-metadata"),
        }
    }
}

impl std::str::FromStr for PubFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atom" | "xml" => Ok(PubFormat::Atom),
            "json" | "json-minimal-metadata" => Ok(PubFormat::Json),
            "json-no-metadata" => Ok(PubFormat::JsonNoMetadata),
            "json-full-metadata" => Ok(PubFormat::JsonFullMetadata),
            _ => Err(format!(
                "Unknown format: {s}. Expected atom, json, json-no-metadata or json-full-metadata"
            )),
        }
    }
}

/// How much type information is written into JSON payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonMetadata {
    /// Never write type annotations
    None,
    /// Annotate only when the reader could not infer the declared type
    #[default]
    Minimal,
    /// Annotate every typed property
    Full,
}

/// Configuration for the codec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodecConfig {
    /// Protocol version used to pick annotation names and type availability
    pub version: ODataVersion,

    /// Default JSON metadata level when a format does not imply one
    pub json_metadata: JsonMetadata,

    /// Largest single entry the streaming iterator will buffer (bytes)
    pub max_entry_bytes: usize,

    /// Read buffer size for streaming input (bytes)
    pub read_buffer_size: usize,

    /// Base URI applied to entries and feeds that carry none
    pub base_uri: Option<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            version: ODataVersion::V3,
            json_metadata: JsonMetadata::Minimal,
            max_entry_bytes: 16 * 1024 * 1024,
            read_buffer_size: 8 * 1024,
            base_uri: None,
        }
    }
}

impl CodecConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> CodecConfigBuilder {
        CodecConfigBuilder::default()
    }

    /// Parse a configuration from TOML text
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Invalid codec configuration: {e}"))
    }

    /// Load a configuration from a TOML file
    #[cfg(feature = "config-file")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

/// Builder for CodecConfig
#[derive(Debug, Default)]
pub struct CodecConfigBuilder {
    config: CodecConfig,
}

impl CodecConfigBuilder {
    /// Set the protocol version
    pub fn version(mut self, version: ODataVersion) -> Self {
        self.config.version = version;
        self
    }

    /// Set the JSON metadata level
    pub fn json_metadata(mut self, level: JsonMetadata) -> Self {
        self.config.json_metadata = level;
        self
    }

    /// Set the per-entry buffer limit used while streaming
    pub fn max_entry_bytes(mut self, max: usize) -> Self {
        self.config.max_entry_bytes = max.max(1);
        self
    }

    /// Set the streaming read buffer size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size.max(64);
        self
    }

    /// Set the default base URI
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.config.base_uri = Some(base_uri.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> CodecConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert_eq!(config.version, ODataVersion::V3);
        assert_eq!(config.json_metadata, JsonMetadata::Minimal);
        assert_eq!(config.read_buffer_size, 8 * 1024);
        assert!(config.base_uri.is_none());
    }

    #[test]
    fn test_builder() {
        let config = CodecConfig::builder()
            .version(ODataVersion::V4)
            .json_metadata(JsonMetadata::Full)
            .max_entry_bytes(1024)
            .base_uri("http://localhost/svc/")
            .build();

        assert_eq!(config.version, ODataVersion::V4);
        assert_eq!(config.json_metadata, JsonMetadata::Full);
        assert_eq!(config.max_entry_bytes, 1024);
        assert_eq!(config.base_uri.as_deref(), Some("http://localhost/svc/"));
    }

    #[test]
    fn test_buffer_size_clamping() {
        let config = CodecConfig::builder().read_buffer_size(1).build();
        assert_eq!(config.read_buffer_size, 64);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("V4".parse::<ODataVersion>().unwrap(), ODataVersion::V4);
        assert_eq!("xml".parse::<PubFormat>().unwrap(), PubFormat::Atom);
        assert_eq!(
            "json-full-metadata".parse::<PubFormat>().unwrap(),
            PubFormat::JsonFullMetadata
        );
        assert!("yaml".parse::<PubFormat>().is_err());
    }

    #[test]
    fn test_annotation_names() {
        assert_eq!(ODataVersion::V3.annotation("odata.type"), "odata.type");
        assert_eq!(ODataVersion::V4.annotation("odata.type"), "@odata.type");
        assert_eq!(ODataVersion::V4.metadata_key(), "@odata.context");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_str() {
        let config = CodecConfig::from_toml_str(
            r#"
            version = "v4"
            jsonMetadata = "none"
            maxEntryBytes = 2048
            "#,
        )
        .unwrap();
        assert_eq!(config.version, ODataVersion::V4);
        assert_eq!(config.json_metadata, JsonMetadata::None);
        assert_eq!(config.max_entry_bytes, 2048);
        assert_eq!(config.read_buffer_size, 8 * 1024);
    }
}
