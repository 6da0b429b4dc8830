//! In-memory XML tree for plugin descriptors
//!
//! Built from quick-xml events. Keeps everything needed to write the
//! document back out: comments, processing instructions, CDATA sections,
//! attribute order and unresolved entity references.

use crate::{PatcherError, Result};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Syntax error raised while building a [`ManifestDocument`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at byte {position})")]
pub struct SyntaxError {
    /// What went wrong
    pub message: String,

    /// Byte offset in the input where the reader stopped
    pub position: u64,
}

/// A node in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element
    Element(Element),

    /// Character data, entity-decoded
    Text(String),

    /// CDATA section content, raw
    CData(String),

    /// Comment content
    Comment(String),

    /// Processing instruction (`<?target content?>`)
    ProcessingInstruction { target: String, content: String },

    /// Reference to an entity that is not one of the predefined XML entities
    EntityRef(String),

    /// Document type declaration content
    DocType(String),
}

impl Node {
    /// Whether this is a text node made only of whitespace
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }

    /// Whether this node is part of an element's character content
    pub fn is_character_data(&self) -> bool {
        matches!(self, Node::Text(_) | Node::CData(_) | Node::EntityRef(_))
    }
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in document order
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Get an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists
    ///
    /// Returns the previous value.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let name = name.into();
        let value = value.into();

        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.attributes.push((name, value));
                None
            }
        }
    }

    /// All child nodes in document order
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    /// Mutable access to the first child element with the given name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    /// Insert a child element at `index` in the node list (clamped to the end)
    pub fn insert_child(&mut self, index: usize, element: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(element));
    }

    /// Append a node, merging adjacent text
    pub fn push_node(&mut self, node: Node) {
        if let Node::Text(ref text) = node {
            if let Some(Node::Text(existing)) = self.children.last_mut() {
                existing.push_str(text);
                return;
            }
        }
        self.children.push(node);
    }

    /// Character content of this element, trimmed
    ///
    /// Concatenates text and CDATA children. Unresolved entity references
    /// are rendered as `&name;`.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => text.push_str(t),
                Node::EntityRef(name) => {
                    text.push('&');
                    text.push_str(name);
                    text.push(';');
                }
                _ => {}
            }
        }
        text.trim().to_string()
    }

    /// Text content of this element and all its descendants, trimmed
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Element(child) => child.collect_text(out),
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::EntityRef(name) => {
                    out.push('&');
                    out.push_str(name);
                    out.push(';');
                }
                _ => {}
            }
        }
    }

    /// Replace all children with a single text node
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Replace all children with a single CDATA section
    pub fn set_cdata(&mut self, text: impl Into<String>) {
        self.children = vec![Node::CData(text.into())];
    }
}

/// XML declaration (`<?xml version="1.0" encoding="UTF-8"?>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for Declaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        }
    }
}

impl Declaration {
    fn from_event(decl: &BytesDecl) -> Self {
        let version = decl
            .version()
            .map(|v| String::from_utf8_lossy(&v).into_owned())
            .unwrap_or_else(|_| "1.0".to_string());
        let encoding = decl
            .encoding()
            .and_then(|r| r.ok())
            .map(|v| String::from_utf8_lossy(&v).into_owned());
        let standalone = decl
            .standalone()
            .and_then(|r| r.ok())
            .map(|v| String::from_utf8_lossy(&v).into_owned());

        Self {
            version,
            encoding,
            standalone,
        }
    }
}

/// A parsed manifest document
///
/// Owned and mutated in place by the patch operations, then written out
/// with [`ManifestDocument::to_xml_string`](crate::manifest::ManifestDocument::to_xml_string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    declaration: Option<Declaration>,
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
}

impl ManifestDocument {
    /// Create a document consisting of a single root element
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a document from XML content
    pub fn parse(xml: &str) -> std::result::Result<Self, SyntaxError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        let mut builder = TreeBuilder::default();

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(SyntaxError {
                        message: e.to_string(),
                        position: reader.buffer_position() as u64,
                    });
                }
            };
            let position = reader.buffer_position() as u64;
            let fail = |message: String| SyntaxError { message, position };

            match event {
                Event::Decl(ref e) => {
                    builder.declaration = Some(Declaration::from_event(e));
                }
                Event::Start(ref e) => {
                    let element = element_from_start(e).map_err(fail)?;
                    builder.open(element).map_err(fail)?;
                }
                Event::Empty(ref e) => {
                    let element = element_from_start(e).map_err(fail)?;
                    builder.open(element).map_err(fail)?;
                    builder.close().map_err(fail)?;
                }
                Event::End(_) => {
                    builder.close().map_err(fail)?;
                }
                Event::Text(ref e) => {
                    let text = e
                        .decode()
                        .map_err(|e| fail(format!("Invalid text: {}", e)))?;
                    builder.text(&text).map_err(fail)?;
                }
                Event::GeneralRef(ref e) => {
                    let name = e
                        .decode()
                        .map_err(|e| fail(format!("Invalid entity reference: {}", e)))?;
                    match resolve_reference(&name).map_err(fail)? {
                        Some(resolved) => builder.text(&resolved).map_err(fail)?,
                        None => builder
                            .content(Node::EntityRef(name.into_owned()))
                            .map_err(fail)?,
                    }
                }
                Event::CData(ref e) => {
                    let data = e
                        .decode()
                        .map_err(|e| fail(format!("Invalid CDATA section: {}", e)))?;
                    builder.content(Node::CData(data.into_owned())).map_err(fail)?;
                }
                Event::Comment(ref e) => {
                    let comment = e
                        .decode()
                        .map_err(|e| fail(format!("Invalid comment: {}", e)))?;
                    builder.misc(Node::Comment(comment.into_owned()));
                }
                Event::PI(ref e) => {
                    builder.misc(Node::ProcessingInstruction {
                        target: String::from_utf8_lossy(e.target()).into_owned(),
                        content: String::from_utf8_lossy(e.content()).trim().to_string(),
                    });
                }
                Event::DocType(ref e) => {
                    let doctype = e
                        .decode()
                        .map_err(|e| fail(format!("Invalid DOCTYPE: {}", e)))?;
                    builder.misc(Node::DocType(doctype.trim().to_string()));
                }
                Event::Eof => break,
            }
        }

        let position = reader.buffer_position() as u64;
        builder
            .finish()
            .map_err(|message| SyntaxError { message, position })
    }

    /// Read and parse a manifest file
    ///
    /// Unreadable files surface as I/O errors; content that is not UTF-8 or
    /// not well-formed XML as `MalformedManifest` naming the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let content = String::from_utf8(bytes)
            .map_err(|e| PatcherError::malformed(path, format!("not valid UTF-8: {}", e)))?;

        Self::parse(&content).map_err(|e| PatcherError::malformed(path, e.to_string()))
    }

    /// The root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Mutable access to the root element
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Whether the root element has the given tag name
    pub fn has_root(&self, name: &str) -> bool {
        self.root.name == name
    }

    /// XML declaration from the source, if any
    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    /// Nodes before the root element (comments, processing instructions, DOCTYPE)
    pub fn prolog(&self) -> &[Node] {
        &self.prolog
    }

    /// Nodes after the root element
    pub fn epilog(&self) -> &[Node] {
        &self.epilog
    }
}

#[derive(Default)]
struct TreeBuilder {
    declaration: Option<Declaration>,
    prolog: Vec<Node>,
    stack: Vec<Element>,
    root: Option<Element>,
    epilog: Vec<Node>,
}

impl TreeBuilder {
    fn open(&mut self, element: Element) -> std::result::Result<(), String> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(format!(
                "Unexpected element <{}> after the root element",
                element.name
            ));
        }
        self.stack.push(element);
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), String> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| "Closing tag without matching opening tag".to_string())?;

        match self.stack.last_mut() {
            Some(parent) => parent.push_node(Node::Element(element)),
            None => self.root = Some(element),
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> std::result::Result<(), String> {
        match self.stack.last_mut() {
            Some(current) => {
                current.push_node(Node::Text(text.to_string()));
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(format!(
                "Text outside of the root element: {:?}",
                text.trim()
            )),
        }
    }

    fn content(&mut self, node: Node) -> std::result::Result<(), String> {
        match self.stack.last_mut() {
            Some(current) => {
                current.push_node(node);
                Ok(())
            }
            None => Err("Character data outside of the root element".to_string()),
        }
    }

    fn misc(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(current) => current.push_node(node),
            None if self.root.is_none() => self.prolog.push(node),
            None => self.epilog.push(node),
        }
    }

    fn finish(self) -> std::result::Result<ManifestDocument, String> {
        if let Some(open) = self.stack.last() {
            return Err(format!("Unclosed element <{}>", open.name));
        }
        let root = self
            .root
            .ok_or_else(|| "Document has no root element".to_string())?;

        Ok(ManifestDocument {
            declaration: self.declaration,
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }
}

fn element_from_start(start: &BytesStart) -> std::result::Result<Element, String> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());

    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("Invalid attribute: {}", e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| format!("Invalid attribute value: {}", e))?;
        element.attributes.push((key, value.into_owned()));
    }

    Ok(element)
}

/// Resolve a predefined entity or character reference
///
/// `Ok(None)` means the reference names some other entity, which is kept as-is.
fn resolve_reference(name: &str) -> std::result::Result<Option<String>, String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse(),
        };
        return code
            .ok()
            .and_then(char::from_u32)
            .map(|c| Some(c.to_string()))
            .ok_or_else(|| format!("Invalid character reference: &{};", name));
    }

    Ok(resolve_predefined_entity(name).map(str::to_string))
}
