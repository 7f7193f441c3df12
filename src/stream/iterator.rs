//! Single-pass entity-set iterator

use std::fmt;
use std::io::Read;

use serde_json::Value;
use tracing::{debug, warn};

use super::scanner::{AtomScanner, ByteSource, JsonScanner, Scanner};
use crate::atom;
use crate::binder::{Binder, ODataEntity};
use crate::config::{CodecConfig, ODataVersion, PubFormat};
use crate::constants::{ATTR_BASE, NS_XML};
use crate::error::{CodecError, Result};
use crate::json;
use crate::resource::{EntryResource, FeedResource};
use crate::tree::xml;

/// Lifecycle of an [`EntitySetIterator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    /// Looking for the next entry boundary
    Scanning,
    /// An entry has been captured and not yet handed out
    EntryReady,
    /// No entries left; feed-level data is available
    Exhausted,
    /// Input released
    Closed,
}

impl fmt::Display for IteratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IteratorState::Scanning => "scanning",
            IteratorState::EntryReady => "entry-ready",
            IteratorState::Exhausted => "exhausted",
            IteratorState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Streams the entities of an Atom or JSON feed one at a time
///
/// Memory use is bounded by the largest entry plus the feed envelope; the
/// input is read once, front to back. The continuation link is only known
/// after the last entry has been read.
///
/// Any error closes the iterator.
///
/// # Example
///
/// ```
/// use odata_codec_sdk::{CodecConfig, PubFormat};
/// use odata_codec_sdk::stream::EntitySetIterator;
///
/// let feed = br#"{"value":[{"Id":"1"},{"Id":"2"}]}"#;
/// let mut entities =
///     EntitySetIterator::new(&feed[..], PubFormat::Json, &CodecConfig::default());
/// let mut seen = 0;
/// while entities.has_next()? {
///     let entity = entities.next_entity()?;
///     assert!(entity.property("Id").is_some());
///     seen += 1;
/// }
/// assert_eq!(seen, 2);
/// assert_eq!(entities.next_link()?, None);
/// # Ok::<(), odata_codec_sdk::CodecError>(())
/// ```
pub struct EntitySetIterator<R: Read> {
    source: Option<ByteSource<R>>,
    scanner: Scanner,
    format: PubFormat,
    version: ODataVersion,
    max_entry_bytes: usize,
    binder: Binder,
    state: IteratorState,
    pending: Option<Vec<u8>>,
    envelope: Vec<u8>,
    feed: Option<FeedResource>,
    yielded: usize,
}

impl<R: Read> fmt::Debug for EntitySetIterator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySetIterator")
            .field("format", &self.format)
            .field("state", &self.state)
            .field("yielded", &self.yielded)
            .finish()
    }
}

impl<R: Read> EntitySetIterator<R> {
    pub fn new(reader: R, format: PubFormat, config: &CodecConfig) -> Self {
        Self::with_binder(reader, format, config, Binder::new(config.version))
    }

    /// Iterator binding entities with a preconfigured binder
    pub fn with_binder(reader: R, format: PubFormat, config: &CodecConfig, binder: Binder) -> Self {
        let scanner = if format.is_json() {
            Scanner::Json(JsonScanner::new())
        } else {
            Scanner::Atom(AtomScanner::new())
        };
        Self {
            source: Some(ByteSource::new(reader, config.read_buffer_size)),
            scanner,
            format,
            version: config.version,
            max_entry_bytes: config.max_entry_bytes,
            binder,
            state: IteratorState::Scanning,
            pending: None,
            envelope: Vec::new(),
            feed: None,
            yielded: 0,
        }
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    /// Whether another entity is available, scanning ahead if needed
    pub fn has_next(&mut self) -> Result<bool> {
        match self.state {
            IteratorState::EntryReady => Ok(true),
            IteratorState::Exhausted | IteratorState::Closed => Ok(false),
            IteratorState::Scanning => {
                let result = self.scan();
                self.close_on_error(result)
            }
        }
    }

    fn scan(&mut self) -> Result<bool> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        match self
            .scanner
            .next_entry(source, &mut self.envelope, self.max_entry_bytes)?
        {
            Some(entry) => {
                self.pending = Some(entry);
                self.transition(IteratorState::EntryReady);
                Ok(true)
            }
            None => {
                self.feed = Some(self.parse_envelope()?);
                self.envelope = Vec::new();
                // Nothing left to read
                self.source = None;
                self.transition(IteratorState::Exhausted);
                Ok(false)
            }
        }
    }

    /// Decode the captured entity
    ///
    /// # Errors
    ///
    /// [`CodecError::NoSuchElement`] unless [`has_next`](Self::has_next)
    /// reported an available entity since the last call.
    pub fn next_entity(&mut self) -> Result<ODataEntity> {
        if self.state != IteratorState::EntryReady {
            return Err(CodecError::NoSuchElement);
        }
        let Some(bytes) = self.pending.take() else {
            return Err(CodecError::NoSuchElement);
        };
        self.transition(IteratorState::Scanning);
        let result = self.decode(&bytes);
        let entity = self.close_on_error(result)?;
        self.yielded += 1;
        Ok(entity)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ODataEntity> {
        let entry = self.decode_entry(bytes)?;
        self.binder.entity_from_entry(&entry)
    }

    fn decode_entry(&self, bytes: &[u8]) -> Result<EntryResource> {
        match self.format {
            PubFormat::Atom => {
                let wrapper = xml::parse(bytes)?;
                let base = wrapper.attr(Some(NS_XML), ATTR_BASE);
                let entry = wrapper.child_elements().next().ok_or_else(|| {
                    CodecError::MalformedPayload("captured Atom entry is empty".to_string())
                })?;
                atom::entry_from_element(entry, base)
            }
            _ => {
                let value: Value = serde_json::from_slice(bytes)?;
                json::entry_from_object(json::as_object(&value)?, self.version)
            }
        }
    }

    fn parse_envelope(&self) -> Result<FeedResource> {
        match self.format {
            PubFormat::Atom => atom::deserialize(&self.envelope)?.into_feed(),
            _ => {
                let value: Value = serde_json::from_slice(&self.envelope)?;
                json::feed::envelope_from_object(json::as_object(&value)?)
            }
        }
    }

    /// Continuation link of the feed
    ///
    /// # Errors
    ///
    /// [`CodecError::IterationNotComplete`] until every entity has been read.
    pub fn next_link(&self) -> Result<Option<String>> {
        self.feed
            .as_ref()
            .map(|feed| feed.next.clone())
            .ok_or(CodecError::IterationNotComplete)
    }

    /// Inline count of the feed, available once every entity has been read
    pub fn inline_count(&self) -> Result<Option<u64>> {
        self.feed
            .as_ref()
            .map(|feed| feed.count)
            .ok_or(CodecError::IterationNotComplete)
    }

    /// Number of entities handed out so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Release the input; safe to call more than once
    pub fn close(&mut self) {
        if self.state == IteratorState::Closed {
            return;
        }
        self.source = None;
        self.pending = None;
        self.envelope = Vec::new();
        self.transition(IteratorState::Closed);
    }

    fn close_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!("Closing entity-set iterator after error: {e}");
            self.close();
        }
        result
    }

    fn transition(&mut self, next: IteratorState) {
        debug!("Entity-set iterator {} -> {}", self.state, next);
        self.state = next;
    }
}

impl<R: Read> Iterator for EntitySetIterator<R> {
    type Item = Result<ODataEntity>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_entity()),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: Read> Drop for EntitySetIterator<R> {
    fn drop(&mut self) {
        self.close();
    }
}
