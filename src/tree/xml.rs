//! XML bytes to element tree and back

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::Writer;

use super::{Attribute, Element, Node};
use crate::constants::{
    ATTR_TYPE, NS_ATOM, NS_DATASERVICES, NS_GEORSS, NS_GML, NS_METADATA, NS_XML, PREFIX_DATASERVICES,
    PREFIX_GEORSS, PREFIX_GML, PREFIX_METADATA,
};
use crate::error::{CodecError, Result};

/// Parse a complete XML document (or standalone fragment) into its root element
pub fn parse(bytes: &[u8]) -> Result<Element> {
    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    loop {
        let position = reader.buffer_position();
        let (resolved, event) = reader.read_resolved_event().map_err(|e| {
            CodecError::MalformedPayload(format!("XML error near position {position}: {e}"))
        })?;
        let ns = resolved_ns(resolved, b"")?;
        match event {
            Event::Start(ref start) => {
                let elem = start_element(&reader, ns, start)?;
                stack.push(elem);
            }
            Event::Empty(ref start) => {
                let elem = start_element(&reader, ns, start)?;
                if let Some(done) = close(&mut stack, elem) {
                    return Ok(done);
                }
            }
            Event::End(_) => {
                let elem = stack.pop().ok_or_else(|| {
                    CodecError::MalformedPayload("unbalanced closing tag".to_string())
                })?;
                if let Some(done) = close(&mut stack, elem) {
                    return Ok(done);
                }
            }
            Event::Text(ref text) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(text.unescape()?.into_owned());
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = stack.last_mut() {
                    let raw = cdata.into_inner();
                    current.push_text(std::str::from_utf8(&raw)?.to_string());
                }
            }
            Event::Eof => {
                return Err(CodecError::MalformedPayload(if stack.is_empty() {
                    "document has no root element".to_string()
                } else {
                    format!("premature end of document inside <{}>", stack_path(&stack))
                }));
            }
            _ => {}
        }
    }
}

/// Parse an XML string
pub fn parse_str(xml: &str) -> Result<Element> {
    parse(xml.as_bytes())
}

fn stack_path(stack: &[Element]) -> String {
    stack
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// Attach a finished element to its parent; returns it when it is the root
fn close(stack: &mut [Element], mut elem: Element) -> Option<Element> {
    if elem.has_element_children() {
        elem.children.retain(|n| match n {
            Node::Text(t) => !t.trim().is_empty(),
            Node::Element(_) => true,
        });
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.push_element(elem);
            None
        }
        None => Some(elem),
    }
}

fn resolved_ns(resolved: ResolveResult, prefix_hint: &[u8]) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(std::str::from_utf8(ns.as_ref())?.to_string())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => {
            if prefix == b"xml" || prefix_hint == b"xml" {
                Ok(Some(NS_XML.to_string()))
            } else {
                Err(CodecError::MalformedPayload(format!(
                    "undeclared namespace prefix '{}'",
                    String::from_utf8_lossy(&prefix)
                )))
            }
        }
    }
}

fn start_element(
    reader: &NsReader<&[u8]>,
    ns: Option<String>,
    start: &BytesStart,
) -> Result<Element> {
    let name = std::str::from_utf8(start.local_name().as_ref())?.to_string();
    let mut elem = Element {
        ns,
        name,
        attributes: Vec::new(),
        children: Vec::new(),
        inferred_type: None,
    };

    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let prefix = attr.key.prefix().map(|p| p.as_ref().to_vec()).unwrap_or_default();
        let (attr_ns, local) = reader.resolve_attribute(attr.key);
        elem.attributes.push(Attribute {
            ns: resolved_ns(attr_ns, &prefix)?,
            name: std::str::from_utf8(local.as_ref())?.to_string(),
            value: attr.unescape_value()?.into_owned(),
        });
    }
    Ok(elem)
}

/// Preferred prefix for well-known namespaces
fn known_prefix(ns: &str) -> Option<&'static str> {
    match ns {
        NS_METADATA => Some(PREFIX_METADATA),
        NS_DATASERVICES => Some(PREFIX_DATASERVICES),
        NS_GML => Some(PREFIX_GML),
        NS_GEORSS => Some(PREFIX_GEORSS),
        NS_ATOM => Some("atom"),
        NS_XML => Some("xml"),
        _ => None,
    }
}

/// Namespace URI to prefix assignment for one document
struct Prefixes {
    map: HashMap<String, String>,
    /// Namespace written as the default (unprefixed) namespace
    default_ns: Option<String>,
    /// Declaration order
    declared: Vec<(String, String)>,
}

impl Prefixes {
    fn for_tree(root: &Element) -> Self {
        let mut used = UsedNamespaces::default();
        used.collect(root);
        let has_unqualified = used.has_unqualified;

        let default_ns = match root.ns.as_deref() {
            Some(ns) if ns != NS_XML && !has_unqualified => Some(ns.to_string()),
            _ => None,
        };

        let mut map = HashMap::new();
        let mut declared = Vec::new();
        let mut generated = 0usize;
        for ns in used.all {
            // Attributes never take the default namespace, so it keeps a prefix
            if Some(&ns) == default_ns.as_ref() && !used.on_attributes.contains(&ns) {
                continue;
            }
            let prefix = match known_prefix(&ns) {
                Some(p) => p.to_string(),
                None => {
                    let p = format!("ns{generated}");
                    generated += 1;
                    p
                }
            };
            if ns != NS_XML {
                declared.push((prefix.clone(), ns.clone()));
            }
            map.insert(ns, prefix);
        }
        Self {
            map,
            default_ns,
            declared,
        }
    }

    fn element_name(&self, elem: &Element) -> String {
        match elem.ns.as_deref() {
            Some(ns) if Some(ns) == self.default_ns.as_deref() => elem.name.clone(),
            Some(ns) => match self.map.get(ns) {
                Some(prefix) => format!("{prefix}:{}", elem.name),
                None => elem.name.clone(),
            },
            None => elem.name.clone(),
        }
    }

    fn attribute_name(&self, attr: &Attribute) -> String {
        match attr.ns.as_deref().and_then(|ns| self.map.get(ns)) {
            Some(prefix) => format!("{prefix}:{}", attr.name),
            None => attr.name.clone(),
        }
    }
}

#[derive(Default)]
struct UsedNamespaces {
    /// Every namespace in first-use order
    all: Vec<String>,
    on_attributes: Vec<String>,
    has_unqualified: bool,
}

impl UsedNamespaces {
    fn collect(&mut self, elem: &Element) {
        match &elem.ns {
            Some(ns) => self.add(ns),
            None => self.has_unqualified = true,
        }
        for attr in written_attributes(elem) {
            if let Some(ns) = &attr.ns {
                self.add(ns);
                if !self.on_attributes.contains(ns) {
                    self.on_attributes.push(ns.clone());
                }
            }
        }
        for child in elem.child_elements() {
            self.collect(child);
        }
    }

    fn add(&mut self, ns: &str) {
        if !self.all.iter().any(|u| u == ns) {
            self.all.push(ns.to_string());
        }
    }
}

/// Attributes as written; XML has no value classes, so an inferred type
/// becomes an explicit `m:type`
fn written_attributes(elem: &Element) -> Vec<Attribute> {
    let mut attributes = elem.attributes.clone();
    if let (None, Some(inferred)) = (elem.edm_type(), &elem.inferred_type) {
        attributes.push(Attribute {
            ns: Some(NS_METADATA.to_string()),
            name: ATTR_TYPE.to_string(),
            value: inferred.clone(),
        });
    }
    attributes
}

/// Serialize a tree as a standalone XML document with an XML declaration
pub fn write_document(root: &Element) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write_root(&mut writer, root)?;
    Ok(writer.into_inner())
}

/// Serialize a tree without an XML declaration
pub fn write_fragment(root: &Element) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write_root(&mut writer, root)?;
    Ok(writer.into_inner())
}

fn write_root(writer: &mut Writer<Vec<u8>>, root: &Element) -> Result<()> {
    let prefixes = Prefixes::for_tree(root);
    let mut declarations: Vec<(String, String)> = Vec::new();
    if let Some(ns) = &prefixes.default_ns {
        declarations.push(("xmlns".to_string(), ns.clone()));
    }
    for (prefix, ns) in &prefixes.declared {
        declarations.push((format!("xmlns:{prefix}"), ns.clone()));
    }
    write_element(writer, root, &prefixes, &declarations)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    elem: &Element,
    prefixes: &Prefixes,
    declarations: &[(String, String)],
) -> Result<()> {
    let name = prefixes.element_name(elem);
    let mut start = BytesStart::new(name.as_str());
    for (key, value) in declarations {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    for attr in &written_attributes(elem) {
        let key = prefixes.attribute_name(attr);
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if elem.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &elem.children {
        match child {
            Node::Element(e) => write_element(writer, e, prefixes, &[])?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}
