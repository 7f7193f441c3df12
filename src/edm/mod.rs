//! Entity Data Model: primitive types, values, geospatial shapes and schema metadata

pub mod geospatial;
pub mod metadata;
pub mod primitive;
pub mod simple_type;

pub use geospatial::{Dimension, Geospatial, Position, Shape};
pub use metadata::{EdmMetadata, TypeResolver};
pub use primitive::{EdmDecimal, PrimitiveValue};
pub use simple_type::{EdmSimpleType, NativeKind, infer_json_type};
