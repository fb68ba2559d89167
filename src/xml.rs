//! XML text to tree parsing.
//!
//! Produces the tree shape the marshaler works on: an element maps each child
//! name to the list of child nodes with that name, attributes live apart (the
//! `$` map) and bare text content is kept separately (the `_` value). An
//! element with neither attributes nor children collapses to its text.
//!
//! Uses quick-xml which does not expand external entities; DTD and entity
//! declarations are additionally rejected up front when configured.

use crate::config::XxePreventionConfig;
use crate::error::ServerError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A child representation.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// Text-only element
    Text(String),
    /// Element with attributes and/or children
    Element(XmlElement),
}

impl XmlNode {
    /// Text content: the collapsed text, or the element's `_` value.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(element) => element.text(),
        }
    }

    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Whether the node carries child elements.
    pub fn has_children(&self) -> bool {
        self.as_element()
            .map(|e| !e.children.is_empty())
            .unwrap_or(false)
    }

    /// Shape name used in diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Element(_) => "object",
        }
    }
}

/// A structural element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<(String, Vec<XmlNode>)>,
}

impl XmlElement {
    /// Attributes in document order (the `$` map).
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Bare text content (the `_` value).
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Child groups in order of first appearance.
    pub fn children(&self) -> impl Iterator<Item = (&str, &[XmlNode])> {
        self.children
            .iter()
            .map(|(name, nodes)| (name.as_str(), nodes.as_slice()))
    }

    /// Child names in order of first appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&[XmlNode]> {
        self.children
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, nodes)| nodes.as_slice())
    }

    /// First node of the named child group.
    pub fn first(&self, name: &str) -> Option<&XmlNode> {
        self.child(name).and_then(|nodes| nodes.first())
    }

    /// First child whose local name contains `fragment`, ignoring prefixes.
    pub fn find_local(&self, fragment: &str) -> Option<(&str, &XmlNode)> {
        self.children
            .iter()
            .find(|(name, _)| local_name(name).contains(fragment))
            .and_then(|(name, nodes)| nodes.first().map(|node| (name.as_str(), node)))
    }

    fn push_child(&mut self, name: String, node: XmlNode) {
        match self.children.iter_mut().find(|(key, _)| *key == name) {
            Some((_, nodes)) => nodes.push(node),
            None => self.children.push((name, vec![node])),
        }
    }
}

/// Name without its namespace prefix.
pub fn local_name(name: &str) -> &str {
    name.split_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Namespace prefix including the trailing `:`, or empty.
pub fn prefix_of(name: &str) -> &str {
    name.find(':').map(|i| &name[..=i]).unwrap_or("")
}

struct Pending {
    name: String,
    element: XmlElement,
    text: String,
    cdata: bool,
}

impl Pending {
    fn finish(self) -> (String, XmlNode) {
        let Pending {
            name,
            mut element,
            text,
            cdata,
        } = self;

        // Text is kept verbatim; a leaf keeps even whitespace-only text.
        if element.attributes.is_empty() && element.children.is_empty() {
            return (name, XmlNode::Text(text));
        }
        // Whitespace between child elements is layout, not content.
        if cdata || !text.trim().is_empty() {
            element.text = Some(text);
        }
        (name, XmlNode::Element(element))
    }
}

/// Parse raw bytes into a document tree.
///
/// The returned element is the document itself: its single child group is the
/// root element.
pub fn parse_document(data: &[u8], xxe: &XxePreventionConfig) -> Result<XmlElement, ServerError> {
    let xml_str = std::str::from_utf8(data)
        .map_err(|e| ServerError::XmlParse(format!("Invalid UTF-8: {}", e)))?;

    if xxe.enabled {
        check_xxe_patterns(xml_str, xxe)?;
    }

    let mut reader = Reader::from_str(xml_str);

    let mut document = XmlElement::default();
    let mut stack: Vec<Pending> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(start_element(e)?);
            }

            Ok(Event::Empty(ref e)) => {
                let (name, node) = start_element(e)?.finish();
                attach(&mut stack, &mut document, name, node);
            }

            Ok(Event::End(_)) => {
                if let Some(pending) = stack.pop() {
                    let (name, node) = pending.finish();
                    attach(&mut stack, &mut document, name, node);
                }
            }

            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ServerError::XmlParse(format!("XML parse error: {}", e)))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }

            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    top.cdata = true;
                }
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(ServerError::XmlParse(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }

            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ServerError::XmlParse(format!(
            "Unclosed element <{}>",
            open.name
        )));
    }
    if document.children.is_empty() {
        return Err(ServerError::XmlParse("No root element".to_string()));
    }

    Ok(document)
}

fn start_element(e: &BytesStart) -> Result<Pending, ServerError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| ServerError::XmlParse(format!("Invalid element name: {}", e)))?
        .to_string();

    let mut element = XmlElement::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ServerError::XmlParse(format!("Invalid attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ServerError::XmlParse(format!("Invalid attribute value: {}", e)))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(Pending {
        name,
        element,
        text: String::new(),
        cdata: false,
    })
}

fn attach(stack: &mut [Pending], document: &mut XmlElement, name: String, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.element.push_child(name, node),
        None => document.push_child(name, node),
    }
}

/// Check for XXE attack patterns.
fn check_xxe_patterns(xml: &str, config: &XxePreventionConfig) -> Result<(), ServerError> {
    if config.block_doctype && (xml.contains("<!DOCTYPE") || xml.contains("<!doctype")) {
        return Err(ServerError::XmlParse(
            "DOCTYPE declarations are not allowed".to_string(),
        ));
    }

    if config.block_external_entities && (xml.contains("<!ENTITY") || xml.contains("<!entity")) {
        return Err(ServerError::XmlParse(
            "Entity declarations are not allowed".to_string(),
        ));
    }

    Ok(())
}
