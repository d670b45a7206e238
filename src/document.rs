//! In-memory XML document tree.
//!
//! Parsed with `quick-xml` into a mutable tree that keeps enough raw detail
//! to round-trip untouched content byte-for-byte: text and CDATA nodes are
//! stored in their escaped source form, attribute order is kept, comments
//! and processing instructions are carried through, and self-closing tags
//! stay self-closing.

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// A node in the document tree.
///
/// Text, CDATA, comment, processing-instruction and declaration content is
/// stored exactly as it appeared in the source (escaped form) and re-emitted
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
    Decl(String),
}

/// An element with its tag name, ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// Whether the element was written as `<tag/>` in the source
    self_closing: bool,
    /// Raw source of the start tag (name + attributes, quoting and spacing
    /// included). Re-emitted verbatim on serialization; cleared by
    /// `set_attr`/`remove_attr`, after which the tag is rebuilt from
    /// `attributes`.
    raw_start: Option<String>,
}

/// An attribute. The value is stored in its escaped source form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Element {
    /// Create an empty element (used by tests and programmatic construction).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: vec![],
            children: vec![],
            self_closing: false,
            raw_start: None,
        }
    }

    /// Get an attribute value (escaped form), if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Whether the attribute is present.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set an attribute, escaping the value. An existing attribute keeps
    /// its position; a new one is appended.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let escaped = escape(value).into_owned();
        if let Some(attr) = self.attributes.iter_mut().find(|a| a.name == name) {
            attr.value = escaped;
        } else {
            self.attributes.push(Attribute {
                name: name.to_string(),
                value: escaped,
            });
        }
        self.raw_start = None;
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.name != name);
        let removed = self.attributes.len() != before;
        if removed {
            self.raw_start = None;
        }
        removed
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Top-level nodes: declaration, prolog, the root element, trailing
    /// comments/whitespace
    pub nodes: Vec<Node>,
}

impl Document {
    /// Parse a document from a string.
    pub fn parse_str(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    stack.push(element_from_start(&e)?);
                }
                Event::End(_) => {
                    // Name pairing is checked by the reader.
                    if let Some(el) = stack.pop() {
                        append(&mut stack, &mut nodes, Node::Element(el));
                    }
                }
                Event::Empty(e) => {
                    let mut el = element_from_start(&e)?;
                    el.self_closing = true;
                    append(&mut stack, &mut nodes, Node::Element(el));
                }
                Event::Text(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    append(&mut stack, &mut nodes, Node::Text(raw));
                }
                Event::CData(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    append(&mut stack, &mut nodes, Node::CData(raw));
                }
                Event::Comment(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    append(&mut stack, &mut nodes, Node::Comment(raw));
                }
                Event::PI(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    append(&mut stack, &mut nodes, Node::ProcessingInstruction(raw));
                }
                Event::DocType(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    append(&mut stack, &mut nodes, Node::DocType(raw));
                }
                Event::Decl(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    append(&mut stack, &mut nodes, Node::Decl(raw));
                }
                Event::Eof => {
                    if let Some(el) = stack.last() {
                        return Err(DocumentError::UnexpectedEof(el.name.clone()));
                    }
                    break;
                }
            }
        }

        Ok(Self { nodes })
    }

    /// Parse a document from a file.
    pub fn parse_file(path: &Path) -> Result<Self, DocumentError> {
        let xml = fs::read_to_string(path)?;
        Self::parse_str(&xml)
    }

    /// Serialize the document to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        Ok(writer.into_inner())
    }

    /// Serialize the document and write it to a file.
    ///
    /// Serialization happens fully in memory before the destination is
    /// touched, so a failure never leaves a partially-written output.
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// The root element, if the document has one.
    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }
}

fn append(stack: &mut [Element], nodes: &mut Vec<Node>, node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        nodes.push(node);
    }
}

fn element_from_start(e: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        attributes.push(Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            // Raw value, kept in escaped form
            value: String::from_utf8_lossy(&attr.value).into_owned(),
        });
    }
    Ok(Element {
        name,
        attributes,
        children: vec![],
        self_closing: false,
        // Full start-tag source (quoting and spacing included)
        raw_start: Some(String::from_utf8_lossy(e).into_owned()),
    })
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), DocumentError> {
    match node {
        Node::Element(el) => write_element(writer, el)?,
        Node::Text(raw) => writer.write_event(Event::Text(BytesText::from_escaped(raw)))?,
        Node::CData(raw) => writer.write_event(Event::CData(BytesCData::new(raw)))?,
        Node::Comment(raw) => writer.write_event(Event::Comment(BytesText::from_escaped(raw)))?,
        Node::ProcessingInstruction(raw) => {
            writer.write_event(Event::PI(BytesPI::new(raw.as_str())))?
        }
        Node::DocType(raw) => writer.write_event(Event::DocType(BytesText::from_escaped(raw)))?,
        Node::Decl(raw) => writer.write_event(Event::Decl(BytesDecl::from_start(
            BytesStart::from_content(raw.as_str(), "xml".len()),
        )))?,
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), DocumentError> {
    // An undirtied element re-emits its start tag exactly as read; only
    // elements touched through set_attr/remove_attr are rebuilt.
    let start = match &el.raw_start {
        Some(raw) => BytesStart::from_content(raw.as_str(), el.name.len()),
        None => {
            let mut start = BytesStart::new(el.name.as_str());
            for attr in &el.attributes {
                start.push_attribute(XmlAttribute {
                    key: QName(attr.name.as_bytes()),
                    value: Cow::Borrowed(attr.value.as_bytes()),
                });
            }
            start
        }
    };

    if el.self_closing && el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &el.children {
            write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    }
    Ok(())
}

/// Errors from parsing or serializing a document.
///
/// These are per-file: the batch loop logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("unexpected end of document inside element `{0}`")]
    UnexpectedEof(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(xml: &str) -> String {
        let doc = Document::parse_str(xml).unwrap();
        String::from_utf8(doc.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_roundtrip_simple() {
        let xml = r#"<root><a name="x"/><b>text</b></root>"#;
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_roundtrip_preserves_whitespace() {
        let xml = "<root>\n  <a/>\n\t<b>  spaced  </b>\n</root>";
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_roundtrip_preserves_attribute_order() {
        let xml = r#"<root><a zeta="1" alpha="2" name="3"/></root>"#;
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_roundtrip_preserves_escapes() {
        let xml = r#"<root attr="a &amp; b">x &lt; y &amp; z</root>"#;
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_roundtrip_decl_comment_cdata_pi() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- a comment -->\n<root><![CDATA[raw <stuff>]]><?target data?></root>";
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_roundtrip_preserves_single_quoted_attributes() {
        let xml = "<root a='1'><b c='d &amp; e'  f = \"g\"/></root>";
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_roundtrip_preserves_single_quoted_decl() {
        let xml = "<?xml version='1.0' encoding='UTF-8'?>\n<root/>";
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_set_attr_rebuilds_start_tag() {
        let mut doc = Document::parse_str("<root a='1' name='x'/>").unwrap();
        let Some(Node::Element(el)) = doc.nodes.first_mut() else {
            panic!("no root element");
        };
        el.set_attr("name", "y");
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        // The dirtied tag is rebuilt with normalized quoting; order is kept.
        assert_eq!(out, r#"<root a="1" name="y"/>"#);
    }

    #[test]
    fn test_roundtrip_keeps_explicit_empty_element() {
        // <a></a> must not collapse to <a/> (and vice versa)
        let xml = "<root><a></a><b/></root>";
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_parse_error_on_mismatched_end() {
        let err = Document::parse_str("<root><a></root>").unwrap_err();
        assert!(matches!(err, DocumentError::Xml(_)));
    }

    #[test]
    fn test_parse_error_on_unclosed_root() {
        let err = Document::parse_str("<root><a/>").unwrap_err();
        assert!(matches!(
            err,
            DocumentError::UnexpectedEof(_) | DocumentError::Xml(_)
        ));
    }

    #[test]
    fn test_attribute_accessors() {
        let doc = Document::parse_str(r#"<root name="x" other="y"/>"#).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.attr("name"), Some("x"));
        assert!(root.has_attr("other"));
        assert_eq!(root.attr("missing"), None);
    }

    #[test]
    fn test_set_attr_keeps_position_and_escapes() {
        let mut el = Element::new("a");
        el.set_attr("name", "x");
        el.set_attr("other", "y");
        el.set_attr("name", "a & b");
        assert_eq!(el.attributes[0].name, "name");
        assert_eq!(el.attributes[0].value, "a &amp; b");
        assert_eq!(el.attributes[1].name, "other");
    }

    #[test]
    fn test_remove_attr() {
        let mut el = Element::new("a");
        el.set_attr("name", "x");
        assert!(el.remove_attr("name"));
        assert!(!el.has_attr("name"));
        assert!(!el.remove_attr("name"));
    }

    #[test]
    fn test_save_and_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        let doc = Document::parse_str("<root><a name=\"x\"/></root>").unwrap();
        doc.save(&path).unwrap();
        let reread = Document::parse_file(&path).unwrap();
        assert_eq!(reread, doc);
    }
}
