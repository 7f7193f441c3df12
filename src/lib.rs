//! OData Codec SDK - Reading and writing OData v3/v4 payloads
//!
//! Provides:
//! - The Edm primitive type registry and literal conversions
//! - A namespace-aware element tree shared by the Atom and JSON codecs
//! - Atom (XML) and JSON serializers for entries, feeds and properties
//! - Streaming iteration over large entity sets
//! - Binding between wire resources and client-side entities

pub mod atom;
pub mod binder;
pub mod codec;
pub mod config;
pub mod constants;
pub mod edm;
pub mod error;
pub mod json;
pub mod resource;
pub mod stream;
pub mod tree;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use codec::ODataCodec;
pub use config::{CodecConfig, CodecConfigBuilder, JsonMetadata, ODataVersion, PubFormat};
pub use error::{CodecError, Result};

pub use binder::{
    Binder, LinkTarget, ODataEntity, ODataEntitySet, ODataLink, ODataProperty, PropertyValue,
};
pub use resource::{
    EntryResource, FeedResource, Inline, LinkResource, LinkType, Operation, OperationKind,
    Resource,
};

pub use edm::{EdmMetadata, EdmSimpleType, Geospatial, PrimitiveValue, TypeResolver};
pub use stream::{EntitySetIterator, IteratorState};
pub use tree::Element;
