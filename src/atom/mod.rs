//! Atom Publishing Protocol codec with the OData extensions
//!
//! Resources are mapped to and from [`Element`](crate::tree::Element) trees;
//! byte-level parsing and writing is done by [`crate::tree::xml`].

pub mod deserializer;
pub mod serializer;

pub use deserializer::{deserialize, entry_from_element, feed_from_element, resource_from_element};
pub use serializer::{entry_element, feed_element, serialize};
