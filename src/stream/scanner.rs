//! Entry boundary scanners for Atom and JSON feeds
//!
//! Scanners read the input one byte at a time through a [`ByteSource`] and
//! never look back. Bytes of an entry are copied into a fresh buffer for the
//! caller; every other byte goes to the feed envelope buffer, which is parsed
//! once the input is exhausted.

use std::io::{BufRead, BufReader, ErrorKind, Read};

use tracing::trace;

use crate::error::{CodecError, Result};

/// Forward-only byte cursor over a buffered reader
pub struct ByteSource<R: Read> {
    reader: BufReader<R>,
    position: u64,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            position: 0,
        }
    }

    /// Next byte, or `None` at end of input
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        loop {
            let byte = match self.reader.fill_buf() {
                Ok(buf) => buf.first().copied(),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if byte.is_some() {
                self.reader.consume(1);
                self.position += 1;
            }
            return Ok(byte);
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }
}

fn check_entry_size(entry: &[u8], max_entry_bytes: usize) -> Result<()> {
    if entry.len() > max_entry_bytes {
        return Err(CodecError::MalformedPayload(format!(
            "entry exceeds the limit of {max_entry_bytes} bytes"
        )));
    }
    Ok(())
}

/// Format-specific scanner
#[derive(Debug)]
pub enum Scanner {
    Json(JsonScanner),
    Atom(AtomScanner),
}

impl Scanner {
    /// Bytes of the next entry (wrapped for standalone parsing when Atom),
    /// or `None` once the feed has no more entries
    pub fn next_entry<R: Read>(
        &mut self,
        src: &mut ByteSource<R>,
        envelope: &mut Vec<u8>,
        max_entry_bytes: usize,
    ) -> Result<Option<Vec<u8>>> {
        match self {
            Scanner::Json(scanner) => scanner.next_entry(src, envelope, max_entry_bytes),
            Scanner::Atom(scanner) => scanner.next_entry(src, envelope, max_entry_bytes),
        }
    }
}

/// Tracks the top-level JSON object and its `value` array
///
/// Strings and escapes are tokenized, so braces inside string values never
/// affect nesting.
#[derive(Debug, Default)]
pub struct JsonScanner {
    started: bool,
    finished: bool,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Content of the string being read at depth 1
    key: Vec<u8>,
    last_key: Option<Vec<u8>>,
    after_colon: bool,
    in_value_array: bool,
}

impl JsonScanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_entry<R: Read>(
        &mut self,
        src: &mut ByteSource<R>,
        envelope: &mut Vec<u8>,
        max_entry_bytes: usize,
    ) -> Result<Option<Vec<u8>>> {
        while let Some(b) = src.next_byte()? {
            if self.in_value_array {
                match b {
                    b'{' => {
                        let mut entry = vec![b'{'];
                        capture_json_object(src, &mut entry, max_entry_bytes)?;
                        trace!(
                            "JSON entry of {} bytes ends at offset {}",
                            entry.len(),
                            src.position()
                        );
                        return Ok(Some(entry));
                    }
                    b']' => {
                        self.in_value_array = false;
                        self.depth -= 1;
                        envelope.push(b);
                    }
                    b',' => {}
                    b if b.is_ascii_whitespace() => {}
                    other => {
                        return Err(CodecError::MalformedPayload(format!(
                            "expected an entity object in 'value', found '{}' at offset {}",
                            other as char,
                            src.position()
                        )));
                    }
                }
                continue;
            }

            envelope.push(b);
            if self.in_string {
                self.string_byte(b);
                continue;
            }
            self.structural_byte(b, src.position())?;
        }

        if !self.finished {
            return Err(CodecError::MalformedPayload(if self.started {
                "JSON feed is truncated".to_string()
            } else {
                "JSON feed is empty".to_string()
            }));
        }
        Ok(None)
    }

    fn string_byte(&mut self, b: u8) {
        let record = self.depth == 1;
        if self.escaped {
            self.escaped = false;
        } else if b == b'\\' {
            self.escaped = true;
        } else if b == b'"' {
            self.in_string = false;
            if record {
                self.last_key = Some(std::mem::take(&mut self.key));
                self.after_colon = false;
            }
            return;
        }
        if record {
            self.key.push(b);
        }
    }

    fn structural_byte(&mut self, b: u8, offset: u64) -> Result<()> {
        match b {
            b'"' if self.started => {
                self.in_string = true;
                self.key.clear();
            }
            b'{' | b'[' => {
                if !self.started {
                    if b != b'{' {
                        return Err(CodecError::MalformedPayload(
                            "JSON feed must be an object".to_string(),
                        ));
                    }
                    self.started = true;
                    self.depth = 1;
                    return Ok(());
                }
                if self.finished {
                    return Err(trailing(offset));
                }
                let opens_value = b == b'['
                    && self.depth == 1
                    && self.after_colon
                    && self.last_key.as_deref() == Some(b"value".as_slice());
                self.depth += 1;
                if opens_value {
                    self.in_value_array = true;
                    trace!("Found 'value' array at offset {offset}");
                }
            }
            b'}' | b']' => {
                if self.depth == 0 {
                    return Err(trailing(offset));
                }
                self.depth -= 1;
                if self.depth == 0 {
                    self.finished = true;
                }
            }
            b':' if self.depth == 1 => self.after_colon = true,
            b',' if self.depth == 1 => {
                self.after_colon = false;
                self.last_key = None;
            }
            b if b.is_ascii_whitespace() => {}
            _ if !self.started || self.finished => return Err(trailing(offset)),
            _ => {}
        }
        Ok(())
    }
}

fn trailing(offset: u64) -> CodecError {
    CodecError::MalformedPayload(format!("unexpected JSON content at offset {offset}"))
}

/// Copy one JSON object (its `{` already in `entry`) from `src`
fn capture_json_object<R: Read>(
    src: &mut ByteSource<R>,
    entry: &mut Vec<u8>,
    max_entry_bytes: usize,
) -> Result<()> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    loop {
        let b = src.next_byte()?.ok_or_else(|| {
            CodecError::MalformedPayload("JSON feed is truncated inside an entry".to_string())
        })?;
        entry.push(b);
        check_entry_size(entry, max_entry_bytes)?;
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

/// Kind of a tag read from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Start,
    End,
    Empty,
}

#[derive(Debug)]
enum Markup {
    Tag { kind: TagKind, local_name: String },
    /// Comment, CDATA section, processing instruction or doctype
    Other,
}

/// Read the rest of a markup construct whose `<` is already in `out`
fn read_markup<R: Read>(src: &mut ByteSource<R>, out: &mut Vec<u8>) -> Result<Markup> {
    let start = out.len() - 1;
    let mut next = |out: &mut Vec<u8>| -> Result<u8> {
        let b = src.next_byte()?.ok_or_else(|| {
            CodecError::MalformedPayload("Atom feed is truncated inside markup".to_string())
        })?;
        out.push(b);
        Ok(b)
    };

    let first = next(out)?;
    match first {
        b'?' => {
            while !out[start..].ends_with(b"?>") {
                next(out)?;
            }
            Ok(Markup::Other)
        }
        b'!' => {
            let second = next(out)?;
            match second {
                b'-' => {
                    while out.len() - start < 7 || !out[start..].ends_with(b"-->") {
                        next(out)?;
                    }
                }
                b'[' => {
                    while !out[start..].ends_with(b"]]>") {
                        next(out)?;
                    }
                }
                _ => read_until_tag_end(&mut next, out)?,
            }
            Ok(Markup::Other)
        }
        _ => {
            if first != b'>' {
                read_until_tag_end(&mut next, out)?;
            }
            Ok(tag_info(&out[start..]))
        }
    }
}

/// Consume up to the closing `>`, skipping over quoted attribute values
fn read_until_tag_end(
    next: &mut impl FnMut(&mut Vec<u8>) -> Result<u8>,
    out: &mut Vec<u8>,
) -> Result<()> {
    if out.last() == Some(&b'>') {
        return Ok(());
    }
    let mut quote: Option<u8> = None;
    loop {
        let b = next(out)?;
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Ok(()),
            None => {}
        }
    }
}

fn tag_info(tag: &[u8]) -> Markup {
    let (kind, body) = if tag.starts_with(b"</") {
        (TagKind::End, &tag[2..])
    } else if tag.ends_with(b"/>") {
        (TagKind::Empty, &tag[1..])
    } else {
        (TagKind::Start, &tag[1..])
    };
    let name_end = body
        .iter()
        .position(|b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>')
        .unwrap_or(body.len());
    let qname = String::from_utf8_lossy(&body[..name_end]);
    let local_name = qname.rsplit(':').next().unwrap_or_default().to_string();
    Markup::Tag { kind, local_name }
}

/// Root `<feed>` start tag, reused to wrap every entry
#[derive(Debug)]
struct RootTag {
    start: Vec<u8>,
    qname: Vec<u8>,
}

/// Finds `<entry>` elements of an Atom feed
///
/// Entry boundaries are matched case-insensitively on the local name, with
/// nested (inlined) entries counted so they stay inside their parent.
/// Comments, CDATA sections and processing instructions are copied through
/// without being inspected for tags.
#[derive(Debug, Default)]
pub struct AtomScanner {
    root: Option<RootTag>,
    depth: usize,
    closed: bool,
}

impl AtomScanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_entry<R: Read>(
        &mut self,
        src: &mut ByteSource<R>,
        envelope: &mut Vec<u8>,
        max_entry_bytes: usize,
    ) -> Result<Option<Vec<u8>>> {
        while let Some(b) = src.next_byte()? {
            if b != b'<' {
                envelope.push(b);
                continue;
            }

            let mut markup = vec![b'<'];
            let Markup::Tag { kind, local_name } = read_markup(src, &mut markup)? else {
                envelope.extend_from_slice(&markup);
                continue;
            };

            if self.root.is_none() {
                if kind == TagKind::End || !local_name.eq_ignore_ascii_case("feed") {
                    return Err(CodecError::MalformedPayload(format!(
                        "expected an Atom feed, found <{local_name}>"
                    )));
                }
                self.root = Some(RootTag {
                    qname: qualified_name(&markup),
                    start: markup.clone(),
                });
                if kind == TagKind::Empty {
                    self.closed = true;
                } else {
                    self.depth = 1;
                }
                envelope.extend_from_slice(&markup);
                continue;
            }

            if kind != TagKind::End && !self.closed && local_name.eq_ignore_ascii_case("entry") {
                let mut entry = markup;
                if kind == TagKind::Start {
                    capture_atom_entry(src, &mut entry, max_entry_bytes)?;
                }
                trace!(
                    "Atom entry of {} bytes ends at offset {}",
                    entry.len(),
                    src.position()
                );
                return Ok(Some(self.wrap(&entry)));
            }

            match kind {
                TagKind::Start => self.depth += 1,
                TagKind::End => {
                    if self.depth == 0 {
                        return Err(CodecError::MalformedPayload(format!(
                            "unbalanced </{local_name}> at offset {}",
                            src.position()
                        )));
                    }
                    self.depth -= 1;
                    if self.depth == 0 {
                        self.closed = true;
                    }
                }
                TagKind::Empty => {}
            }
            envelope.extend_from_slice(&markup);
        }

        if self.root.is_none() {
            return Err(CodecError::MalformedPayload(
                "Atom feed has no root element".to_string(),
            ));
        }
        if !self.closed {
            return Err(CodecError::MalformedPayload(
                "Atom feed is truncated".to_string(),
            ));
        }
        Ok(None)
    }

    /// Enclose an entry in a copy of the feed start tag so its namespace
    /// prefixes and `xml:base` resolve
    fn wrap(&self, entry: &[u8]) -> Vec<u8> {
        match &self.root {
            Some(root) => {
                let mut doc = Vec::with_capacity(root.start.len() + entry.len() + 16);
                doc.extend_from_slice(&root.start);
                doc.extend_from_slice(entry);
                doc.extend_from_slice(b"</");
                doc.extend_from_slice(&root.qname);
                doc.push(b'>');
                doc
            }
            None => entry.to_vec(),
        }
    }
}

fn qualified_name(start_tag: &[u8]) -> Vec<u8> {
    start_tag[1..]
        .iter()
        .take_while(|b| !b.is_ascii_whitespace() && **b != b'/' && **b != b'>')
        .copied()
        .collect()
}

/// Copy one `<entry>` element (its start tag already in `entry`)
fn capture_atom_entry<R: Read>(
    src: &mut ByteSource<R>,
    entry: &mut Vec<u8>,
    max_entry_bytes: usize,
) -> Result<()> {
    let mut depth = 1usize;
    loop {
        let b = src.next_byte()?.ok_or_else(|| {
            CodecError::MalformedPayload("Atom feed is truncated inside an entry".to_string())
        })?;
        entry.push(b);
        if b == b'<' {
            match read_markup(src, entry)? {
                Markup::Tag {
                    kind: TagKind::Start,
                    ..
                } => depth += 1,
                Markup::Tag {
                    kind: TagKind::End, ..
                } => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        check_entry_size(entry, max_entry_bytes)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(scanner: &mut Scanner, input: &[u8]) -> Result<(Vec<String>, String)> {
        let mut src = ByteSource::new(input, 64);
        let mut envelope = Vec::new();
        let mut entries = Vec::new();
        while let Some(entry) = scanner.next_entry(&mut src, &mut envelope, 1 << 20)? {
            entries.push(String::from_utf8(entry).unwrap());
        }
        Ok((entries, String::from_utf8(envelope).unwrap()))
    }

    #[test]
    fn test_json_entries_and_envelope() {
        let input = br#"{"odata.count":"2","value":[{"Id":"1"}, {"Id":"2","N":{"a":[1]}}],"odata.nextLink":"n"}"#;
        let (entries, envelope) = collect(&mut Scanner::Json(JsonScanner::new()), input).unwrap();
        assert_eq!(entries, vec![r#"{"Id":"1"}"#, r#"{"Id":"2","N":{"a":[1]}}"#]);
        assert_eq!(envelope, r#"{"odata.count":"2","value":[],"odata.nextLink":"n"}"#);
    }

    #[test]
    fn test_json_braces_inside_strings() {
        let input = br#"{"value":[{"Text":"a } \" { b"},{"Text":"}"}]}"#;
        let (entries, _) = collect(&mut Scanner::Json(JsonScanner::new()), input).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], r#"{"Text":"a } \" { b"}"#);
    }

    #[test]
    fn test_json_objects_before_value() {
        let input = br#"{"meta":{"value":[{"x":1}]},"value":[{"Id":1}]}"#;
        let (entries, _) = collect(&mut Scanner::Json(JsonScanner::new()), input).unwrap();
        assert_eq!(entries, vec![r#"{"Id":1}"#]);
    }

    #[test]
    fn test_json_truncated() {
        let input = br#"{"value":[{"Id":"1"},{"Id":"#;
        let err = collect(&mut Scanner::Json(JsonScanner::new()), input).unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload(_)));
    }

    #[test]
    fn test_json_entry_size_limit() {
        let input = br#"{"value":[{"Name":"a long enough value"}]}"#;
        let mut src = ByteSource::new(&input[..], 64);
        let mut envelope = Vec::new();
        let err = Scanner::Json(JsonScanner::new())
            .next_entry(&mut src, &mut envelope, 8)
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload(_)));
    }

    #[test]
    fn test_atom_entries_are_wrapped() {
        let input = br#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:base="http://host/">
  <!-- <entry>not an entry</entry> -->
  <ENTRY><id>1</id></ENTRY>
  <entry m:etag="x"><link><m:inline><entry><id>inner</id></entry></m:inline></link></entry>
  <link rel="next" href="n"/>
</feed>"#;
        let (entries, envelope) = collect(&mut Scanner::Atom(AtomScanner::new()), input).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with(
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xml:base="http://host/"><ENTRY>"#
        ));
        assert!(entries[0].ends_with("</ENTRY></feed>"));
        assert!(entries[1].contains("<id>inner</id></entry></m:inline></link></entry></feed>"));
        assert!(envelope.contains(r#"<link rel="next" href="n"/>"#));
        assert!(envelope.contains("<!-- <entry>not an entry</entry> -->"));
        assert!(!envelope.contains("<id>"));
    }

    #[test]
    fn test_atom_attribute_with_angle_bracket() {
        let input = br#"<feed><entry><title type="text" x="a>b">t</title></entry></feed>"#;
        let (entries, _) = collect(&mut Scanner::Atom(AtomScanner::new()), input).unwrap();
        assert_eq!(entries, vec![r#"<feed><entry><title type="text" x="a>b">t</title></entry></feed>"#]);
    }

    #[test]
    fn test_atom_cdata_is_opaque() {
        let input = b"<feed><entry><summary><![CDATA[</entry>]]></summary></entry></feed>";
        let (entries, _) = collect(&mut Scanner::Atom(AtomScanner::new()), input).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("<![CDATA[</entry>]]>"));
    }

    #[test]
    fn test_atom_empty_feed() {
        let (entries, envelope) =
            collect(&mut Scanner::Atom(AtomScanner::new()), b"<feed></feed>").unwrap();
        assert!(entries.is_empty());
        assert_eq!(envelope, "<feed></feed>");
    }

    #[test]
    fn test_atom_truncated_entry() {
        let input = b"<feed><entry><id>1</id>";
        let err = collect(&mut Scanner::Atom(AtomScanner::new()), input).unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload(_)));
    }

    #[test]
    fn test_atom_requires_feed_root() {
        let err = collect(&mut Scanner::Atom(AtomScanner::new()), b"<entry/>").unwrap_err();
        assert!(matches!(err, CodecError::MalformedPayload(_)));
    }
}
