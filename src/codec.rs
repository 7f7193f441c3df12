//! Codec facade: encode, decode and stream in any supported format

use std::io::Read;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::atom;
use crate::binder::{Binder, ODataEntity, ODataEntitySet, ODataProperty, element_from_property};
use crate::config::{CodecConfig, JsonMetadata, PubFormat};
use crate::edm::metadata::TypeResolver;
use crate::error::Result;
use crate::json;
use crate::resource::Resource;
use crate::stream::EntitySetIterator;
use crate::tree::xml;

/// Entry point for encoding and decoding OData payloads
///
/// The format is always given explicitly; payloads are never sniffed.
#[derive(Debug, Clone, Default)]
pub struct ODataCodec {
    config: CodecConfig,
    binder: Binder,
}

impl ODataCodec {
    pub fn new(config: CodecConfig) -> Self {
        let binder = Binder::new(config.version);
        Self { config, binder }
    }

    /// Use `resolver` to type properties that carry no type annotation
    pub fn with_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.binder = self.binder.with_resolver(resolver);
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Serialize an entry or feed
    pub fn encode(&self, resource: &Resource, format: PubFormat) -> Result<Vec<u8>> {
        debug!("Encoding {} as {format}", resource_kind(resource));
        match format {
            PubFormat::Atom => match self.with_default_base(resource) {
                Some(based) => atom::serialize(&based),
                None => atom::serialize(resource),
            },
            json_format => json::serialize(
                resource,
                self.config.version,
                self.json_metadata(json_format),
            ),
        }
    }

    /// Metadata level for a JSON format; plain `Json` uses the configured level
    fn json_metadata(&self, format: PubFormat) -> JsonMetadata {
        match format {
            PubFormat::Json => self.config.json_metadata,
            other => other.json_metadata(),
        }
    }

    /// Copy of `resource` carrying the configured base URI, when it has none
    fn with_default_base(&self, resource: &Resource) -> Option<Resource> {
        let base = self.config.base_uri.as_ref()?;
        match resource {
            Resource::Entry(entry) if entry.base_uri.is_none() => {
                let mut entry = entry.clone();
                entry.base_uri = Some(base.clone());
                Some(Resource::Entry(entry))
            }
            Resource::Feed(feed) if feed.base_uri.is_none() => {
                let mut feed = feed.clone();
                feed.base_uri = Some(base.clone());
                Some(Resource::Feed(feed))
            }
            _ => None,
        }
    }

    /// Parse an entry or feed
    pub fn decode(&self, bytes: &[u8], format: PubFormat) -> Result<Resource> {
        let resource = match format {
            PubFormat::Atom => atom::deserialize(bytes)?,
            _ => json::deserialize(bytes, self.config.version)?,
        };
        debug!(
            "Decoded {} ({} bytes of {format})",
            resource_kind(&resource),
            bytes.len()
        );
        Ok(resource)
    }

    pub fn encode_entity(&self, entity: &ODataEntity, format: PubFormat) -> Result<Vec<u8>> {
        let entry = self.binder.entry_from_entity(entity)?;
        self.encode(&Resource::Entry(entry), format)
    }

    pub fn encode_entity_set(&self, set: &ODataEntitySet, format: PubFormat) -> Result<Vec<u8>> {
        let feed = self.binder.feed_from_entity_set(set)?;
        self.encode(&Resource::Feed(feed), format)
    }

    /// Decode a single entity
    pub fn decode_entity(&self, bytes: &[u8], format: PubFormat) -> Result<ODataEntity> {
        let entry = self.decode(bytes, format)?.into_entry()?;
        self.binder.entity_from_entry(&entry)
    }

    /// Decode a whole entity set in memory
    pub fn decode_entity_set(&self, bytes: &[u8], format: PubFormat) -> Result<ODataEntitySet> {
        let feed = self.decode(bytes, format)?.into_feed()?;
        self.binder.entity_set_from_feed(&feed)
    }

    /// Iterate the entities of a feed without buffering it
    pub fn stream_entities<R: Read>(&self, reader: R, format: PubFormat) -> EntitySetIterator<R> {
        info!("Streaming {format} entity set");
        EntitySetIterator::with_binder(reader, format, &self.config, self.binder.clone())
    }

    /// Serialize a standalone property
    pub fn encode_property(&self, property: &ODataProperty, format: PubFormat) -> Result<Vec<u8>> {
        let elem = element_from_property(property);
        match format {
            PubFormat::Atom => xml::write_document(&elem),
            json_format => {
                let value = json::property_to_value(
                    &elem,
                    self.config.version,
                    self.json_metadata(json_format),
                    None,
                )?;
                Ok(serde_json::to_vec(&value)?)
            }
        }
    }

    /// Parse a standalone property
    ///
    /// JSON property payloads carry no name; the property is named `value`.
    pub fn decode_property(&self, bytes: &[u8], format: PubFormat) -> Result<ODataProperty> {
        let elem = match format {
            PubFormat::Atom => xml::parse(bytes)?,
            _ => {
                let value: Value = serde_json::from_slice(bytes)?;
                json::property_from_value(&value, self.config.version)?
            }
        };
        self.binder.property_from_element(&elem, None)
    }
}

fn resource_kind(resource: &Resource) -> &'static str {
    match resource {
        Resource::Entry(_) => "entry",
        Resource::Feed(_) => "feed",
    }
}
