//! Error types for payload encoding and decoding

use thiserror::Error;

/// Errors that can occur while encoding, decoding or streaming OData payloads
#[derive(Error, Debug)]
pub enum CodecError {
    /// Type name is not a registered Edm simple type
    #[error("Unknown Edm type: {0}")]
    UnknownType(String),

    /// Type exists but is not defined for the configured protocol version
    #[error("Type {edm_type} is not supported by OData {version}")]
    UnsupportedVersion { edm_type: String, version: String },

    /// Text could not be parsed as a value of the declared type
    #[error("Invalid {edm_type} value: {value}")]
    InvalidValue { edm_type: String, value: String },

    /// Geospatial sub-object is missing coordinates or members
    #[error("Malformed geospatial payload: {0}")]
    MalformedGeospatialPayload(String),

    /// Required Atom element (category, content, ...) is absent
    #[error("Missing required element: {0}")]
    MissingRequiredElement(String),

    /// No further entity is available from the iterator
    #[error("No entity found")]
    NoSuchElement,

    /// Continuation link requested before the feed was fully read
    #[error("Iteration must be completed in order to retrieve the link for next page")]
    IterationNotComplete,

    /// Link relation/type does not map to a known link kind
    #[error("Invalid link type: rel={rel}, type={link_type}")]
    UnresolvableLinkType { rel: String, link_type: String },

    /// Stream could not be tokenized (unbalanced braces/tags, premature EOF)
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// IO error from the underlying stream or writer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Shorthand for an [`CodecError::InvalidValue`]
    pub fn invalid_value(edm_type: impl Into<String>, value: impl Into<String>) -> Self {
        CodecError::InvalidValue {
            edm_type: edm_type.into(),
            value: value.into(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CodecError::UnknownType(name) => {
                format!(
                    "Unknown Edm type: {name}\n\nHint: Primitive type names look like 'Edm.Int32' or 'Edm.GeographyPoint'."
                )
            }
            CodecError::UnsupportedVersion { edm_type, version } => {
                format!(
                    "{edm_type} is not available in OData {version}.\n\n\
                    Hint: Check the --odata-version flag against the service's protocol version."
                )
            }
            CodecError::MalformedPayload(msg) => {
                format!(
                    "Malformed payload: {msg}\n\nHint: Make sure the --format flag matches the payload (atom or json)."
                )
            }
            CodecError::IterationNotComplete => {
                "The next-page link is only known once every entity was read.\n\n\
                Hint: Drain the iterator before asking for the next link."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::MalformedPayload(format!("JSON: {e}"))
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(e: quick_xml::Error) -> Self {
        CodecError::MalformedPayload(format!("XML: {e}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for CodecError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        CodecError::MalformedPayload(format!("XML attribute: {e}"))
    }
}

impl From<std::str::Utf8Error> for CodecError {
    fn from(e: std::str::Utf8Error) -> Self {
        CodecError::MalformedPayload(format!("invalid UTF-8: {e}"))
    }
}
