//! Generic attributed element tree
//!
//! Both wire encodings meet in this tree: Atom documents parse into it
//! directly, JSON objects are converted into it by [`json`], and property
//! binding reads from it regardless of where it came from.

pub mod json;
pub mod xml;

use crate::constants::{ATTR_NULL, ATTR_TYPE, ELEM_ELEMENT, NS_METADATA};

/// A namespaced attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Namespace URI; `None` for unprefixed attributes
    pub ns: Option<String>,
    pub name: String,
    pub value: String,
}

/// A child of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A namespaced element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Namespace URI
    pub ns: Option<String>,
    /// Local name
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// Type read off an un-annotated JSON value; not an `m:type` annotation
    pub inferred_type: Option<String>,
}

impl Element {
    pub fn new(ns: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            ns: ns.map(str::to_string),
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            inferred_type: None,
        }
    }

    /// Whether this element has the given namespace and local name
    pub fn is(&self, ns: Option<&str>, name: &str) -> bool {
        self.ns.as_deref() == ns && self.name == name
    }

    pub fn attr(&self, ns: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.ns.as_deref() == ns && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing one with the same name
    pub fn set_attr(&mut self, ns: Option<&str>, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.ns.as_deref() == ns && a.name == name)
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                ns: ns.map(str::to_string),
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, ns: Option<&str>, name: &str) -> Option<String> {
        let idx = self
            .attributes
            .iter()
            .position(|a| a.ns.as_deref() == ns && a.name == name)?;
        Some(self.attributes.remove(idx).value)
    }

    pub fn with_attr(mut self, ns: Option<&str>, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(ns, name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push_element(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn push_element(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        // Adjacent text nodes are merged
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(&text);
        } else {
            self.children.push(Node::Text(text));
        }
    }

    /// Child elements in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> + '_ {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given namespace and local name
    pub fn find_child(&self, ns: Option<&str>, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(ns, name))
    }

    /// All child elements with the given namespace and local name
    pub fn find_children<'a>(
        &'a self,
        ns: Option<&'a str>,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |e| e.is(ns, name))
    }

    /// Concatenated text content of direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    pub fn has_element_children(&self) -> bool {
        self.children.iter().any(|n| matches!(n, Node::Element(_)))
    }

    /// Whether every child element is a collection `element` item
    pub fn is_collection_like(&self) -> bool {
        self.has_element_children() && self.child_elements().all(|c| c.name == ELEM_ELEMENT)
    }

    /// Declared type (`m:type`)
    pub fn edm_type(&self) -> Option<&str> {
        self.attr(Some(NS_METADATA), ATTR_TYPE)
    }

    pub fn set_edm_type(&mut self, type_name: impl Into<String>) {
        self.set_attr(Some(NS_METADATA), ATTR_TYPE, type_name);
    }

    /// Declared type, falling back to the type inferred from a JSON value
    pub fn value_type(&self) -> Option<&str> {
        self.edm_type().or(self.inferred_type.as_deref())
    }

    /// Explicit null marker (`m:null="true"`)
    pub fn is_null(&self) -> bool {
        self.attr(Some(NS_METADATA), ATTR_NULL) == Some("true")
    }

    pub fn set_null(&mut self) {
        self.set_attr(Some(NS_METADATA), ATTR_NULL, "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_namespaced() {
        let mut elem = Element::new(None, "Name")
            .with_attr(Some(NS_METADATA), "type", "Edm.String")
            .with_attr(None, "type", "plain");
        assert_eq!(elem.edm_type(), Some("Edm.String"));
        assert_eq!(elem.attr(None, "type"), Some("plain"));

        elem.set_edm_type("Edm.Int32");
        assert_eq!(elem.attributes.len(), 2);
        assert_eq!(elem.remove_attr(None, "type").as_deref(), Some("plain"));
    }

    #[test]
    fn test_inferred_type_is_not_an_annotation() {
        let mut elem = Element::new(None, "Id").with_text("1");
        elem.inferred_type = Some("Edm.Int32".to_string());
        assert_eq!(elem.edm_type(), None);
        assert_eq!(elem.value_type(), Some("Edm.Int32"));

        elem.set_edm_type("Edm.Int64");
        assert_eq!(elem.value_type(), Some("Edm.Int64"));
    }

    #[test]
    fn test_text_nodes_merge() {
        let mut elem = Element::new(None, "Title");
        elem.push_text("Hello, ");
        elem.push_text("");
        elem.push_text("world");
        assert_eq!(elem.children.len(), 1);
        assert_eq!(elem.text(), "Hello, world");
    }

    #[test]
    fn test_null_marker() {
        let mut elem = Element::new(None, "Missing");
        assert!(!elem.is_null());
        elem.set_null();
        assert!(elem.is_null());
    }

    #[test]
    fn test_collection_like() {
        let list = Element::new(None, "Tags")
            .with_child(Element::new(None, ELEM_ELEMENT).with_text("a"))
            .with_child(Element::new(None, ELEM_ELEMENT).with_text("b"));
        assert!(list.is_collection_like());
        assert!(!Element::new(None, "Empty").is_collection_like());
    }
}
