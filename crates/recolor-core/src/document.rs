//! Lossless XML document model.
//!
//! Elements keep the exact text of their start tag, and every other node keeps
//! its raw markup, so a document without edits serializes back byte-for-byte.
//! Attribute edits patch the value in place inside the stored tag text; only
//! attributes that did not exist before change the surrounding layout.

use std::borrow::Cow;
use std::ops::Range;

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};

/// Namespace of the `type` attribute that discriminates element shapes.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

const UTF8_BOM: &str = "\u{feff}";

/// Error raised when a document cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("XML syntax error near line {line}: {message}")]
    Syntax { line: u32, message: String },

    #[error("Malformed attribute on line {line}: {message}")]
    Attribute { line: u32, message: String },

    #[error("Element <{name}> opened on line {line} is never closed")]
    UnclosedElement { name: String, line: u32 },

    #[error("Unexpected end tag </{name}> on line {line}")]
    UnexpectedEndTag { name: String, line: u32 },

    #[error("Document has no root element")]
    NoRootElement,

    #[error("Second root element on line {line}")]
    MultipleRootElements { line: u32 },

    #[error("Text outside the root element on line {line}")]
    TextOutsideRoot { line: u32 },
}

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Attribute with its value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attributes: Vec<Attribute>,
    /// Start tag text between `<` and `>` (or `/>` when self-closing).
    tag: String,
    self_closing: bool,
    children: Vec<NodeId>,
    line: u32,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element(Element),
    /// Character data exactly as written, entities still escaped.
    Text(String),
    CData(String),
    Comment(String),
    Decl(String),
    Pi(String),
    /// The whole `<!DOCTYPE ...>` markup as written.
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Parsed document. Owns every node; callers hold [`NodeId`]s.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    /// Prolog, root element and epilog in document order.
    top_level: Vec<NodeId>,
    root: NodeId,
    bom: bool,
}

impl Document {
    /// Parses UTF-8 bytes into a document.
    pub fn parse(bytes: &[u8]) -> Result<Self, LoadError> {
        let text = std::str::from_utf8(bytes)?;
        Self::parse_str(text)
    }

    /// Parses a string into a document. A leading byte-order mark is kept.
    pub fn parse_str(text: &str) -> Result<Self, LoadError> {
        let (bom, text) = match text.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let mut reader = Reader::from_str(text);
        let mut lines = LineCounter::new(text);
        let mut builder = Builder::default();

        loop {
            let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
            let line = lines.line_at(offset);
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    return Err(LoadError::Syntax {
                        line,
                        message: err.to_string(),
                    });
                }
            };

            match event {
                Event::Start(start) => {
                    let element = element_from_start(&start, false, line)?;
                    let id = builder.append_element(element, line)?;
                    builder.stack.push(id);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, true, line)?;
                    builder.append_element(element, line)?;
                }
                Event::End(end) => {
                    if builder.stack.pop().is_none() {
                        return Err(LoadError::UnexpectedEndTag {
                            name: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                            line,
                        });
                    }
                }
                Event::Text(content) => {
                    let raw = String::from_utf8_lossy(&content).into_owned();
                    if builder.stack.is_empty() && !raw.trim().is_empty() {
                        return Err(LoadError::TextOutsideRoot { line });
                    }
                    builder.append(NodeKind::Text(raw));
                }
                Event::CData(content) => {
                    if builder.stack.is_empty() {
                        return Err(LoadError::TextOutsideRoot { line });
                    }
                    builder.append(NodeKind::CData(
                        String::from_utf8_lossy(&content).into_owned(),
                    ));
                }
                Event::Comment(content) => {
                    builder.append(NodeKind::Comment(
                        String::from_utf8_lossy(&content).into_owned(),
                    ));
                }
                Event::Decl(decl) => {
                    builder.append(NodeKind::Decl(String::from_utf8_lossy(&decl).into_owned()));
                }
                Event::PI(pi) => {
                    builder.append(NodeKind::Pi(String::from_utf8_lossy(&pi).into_owned()));
                }
                Event::DocType(content) => {
                    // The tokenizer drops the whitespace after the keyword.
                    let end = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
                    let markup = match text.get(offset..end) {
                        Some(raw) if raw.starts_with("<!") => raw.to_owned(),
                        _ => format!("<!DOCTYPE {}>", String::from_utf8_lossy(&content)),
                    };
                    builder.append(NodeKind::DocType(markup));
                }
                Event::Eof => break,
            }
        }

        builder.finish(bom)
    }

    /// The single root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Qualified element name (`prefix:local` when prefixed).
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.name.as_str())
    }

    /// 1-based line of the element's start tag, `0` for non-elements.
    pub fn line(&self, id: NodeId) -> u32 {
        self.element(id).map_or(0, |element| element.line)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id)
            .map_or(&[], |element| element.attributes.as_slice())
    }

    /// Unescaped value of the attribute with this exact qualified name.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Namespace URI bound to `prefix` at this element, searching ancestors.
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        let declaration = format!("xmlns:{prefix}");
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(uri) = self.attribute(node, &declaration) {
                return Some(uri);
            }
            current = self.parent(node);
        }
        None
    }

    /// Value of the attribute `local` whose prefix is bound to `namespace`.
    pub fn attribute_ns(&self, id: NodeId, namespace: &str, local: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| match attr.name.split_once(':') {
                Some((prefix, name)) => {
                    prefix != "xmlns"
                        && name == local
                        && self.lookup_namespace(id, prefix) == Some(namespace)
                }
                None => false,
            })
            .map(|attr| attr.value.as_str())
    }

    /// The schema-instance `type` attribute that names an element's shape.
    pub fn type_discriminator(&self, id: NodeId) -> Option<&str> {
        self.attribute_ns(id, XSI_NAMESPACE, "type")
    }

    /// Child elements in document order.
    pub fn child_elements(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.element(id)
            .map_or(&[][..], |element| element.children.as_slice())
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
    }

    /// First child element called `name`.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id)
            .find(|child| self.name(*child) == Some(name))
    }

    /// All descendant elements in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut pending: Vec<NodeId> = self.child_elements(id).rev().collect();
        while let Some(next) = pending.pop() {
            found.push(next);
            pending.extend(self.child_elements(next).rev());
        }
        found
    }

    /// Descendant elements called `name`, in document order.
    pub fn descendants_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.name(*node) == Some(name))
            .collect()
    }

    /// Every element called `name`, the root included, in document order.
    pub fn elements_named(&self, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        if self.name(self.root) == Some(name) {
            found.push(self.root);
        }
        found.extend(self.descendants_named(self.root, name));
        found
    }

    /// Concatenated, unescaped text of the element and its descendants.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(element) = self.element(id) else {
            return;
        };
        for &child in &element.children {
            match &self.nodes[child.0].kind {
                NodeKind::Text(raw) => {
                    out.push_str(&unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str())));
                }
                NodeKind::CData(data) => out.push_str(data),
                NodeKind::Element(_) => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    /// Sets an attribute, patching only its value inside the original tag.
    /// A missing attribute is appended after the existing ones.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let escaped = escape(value);

        if let Some(attr) = element.attributes.iter_mut().find(|attr| attr.name == name) {
            attr.value = value.to_owned();
            match attribute_value_span(&element.tag, name) {
                Some(span) => element.tag.replace_range(span, &escaped),
                None => element.tag = render_tag(&element.name, &element.attributes),
            }
        } else {
            element.attributes.push(Attribute {
                name: name.to_owned(),
                value: value.to_owned(),
            });
            let end = element.tag.trim_end().len();
            element.tag.insert_str(end, &format!(" {name}=\"{escaped}\""));
        }
    }

    /// Replaces the element's content with a single text node.
    pub fn set_text(&mut self, id: NodeId, value: &str) {
        if self.element(id).is_none() {
            return;
        }
        let text = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(id),
            kind: NodeKind::Text(partial_escape(value).into_owned()),
        });
        if let Some(element) = self.element_mut(id) {
            // Replaced children stay in the arena but are no longer reachable.
            element.children = vec![text];
            element.self_closing = false;
        }
    }

    /// Serializes the whole document.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push_str(UTF8_BOM);
        }
        for &id in &self.top_level {
            self.write_node(id, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                if element.self_closing {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in &element.children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
            NodeKind::Text(raw) => out.push_str(raw),
            NodeKind::CData(data) => {
                out.push_str("<![CDATA[");
                out.push_str(data);
                out.push_str("]]>");
            }
            NodeKind::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            NodeKind::Decl(content) | NodeKind::Pi(content) => {
                out.push_str("<?");
                out.push_str(content);
                out.push_str("?>");
            }
            NodeKind::DocType(markup) => out.push_str(markup),
        }
    }
}

#[derive(Default)]
struct Builder {
    nodes: Vec<Node>,
    top_level: Vec<NodeId>,
    stack: Vec<NodeId>,
    root: Option<NodeId>,
}

impl Builder {
    fn append(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.stack.last().copied();
        self.nodes.push(Node { parent, kind });
        match parent {
            Some(parent) => {
                if let NodeKind::Element(element) = &mut self.nodes[parent.0].kind {
                    element.children.push(id);
                }
            }
            None => self.top_level.push(id),
        }
        id
    }

    fn append_element(&mut self, element: Element, line: u32) -> Result<NodeId, LoadError> {
        let top_level = self.stack.is_empty();
        if top_level && self.root.is_some() {
            return Err(LoadError::MultipleRootElements { line });
        }
        let id = self.append(NodeKind::Element(element));
        if top_level {
            self.root = Some(id);
        }
        Ok(id)
    }

    fn finish(self, bom: bool) -> Result<Document, LoadError> {
        if let Some(open) = self.stack.last() {
            if let NodeKind::Element(element) = &self.nodes[open.0].kind {
                return Err(LoadError::UnclosedElement {
                    name: element.name.clone(),
                    line: element.line,
                });
            }
        }
        let root = self.root.ok_or(LoadError::NoRootElement)?;
        Ok(Document {
            nodes: self.nodes,
            top_level: self.top_level,
            root,
            bom,
        })
    }
}

fn element_from_start(
    start: &BytesStart<'_>,
    self_closing: bool,
    line: u32,
) -> Result<Element, LoadError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| LoadError::Attribute {
            line,
            message: err.to_string(),
        })?;
        let value = attr.unescape_value().map_err(|err| LoadError::Attribute {
            line,
            message: err.to_string(),
        })?;
        attributes.push(Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    Ok(Element {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        tag: String::from_utf8_lossy(start).into_owned(),
        self_closing,
        children: Vec::new(),
        line,
    })
}

/// Byte range of the value of attribute `name` inside raw start-tag text.
fn attribute_value_span(tag: &str, name: &str) -> Option<Range<usize>> {
    let bytes = tag.as_bytes();
    let skip_whitespace = |mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    };

    // Past the element name.
    let mut pos = bytes.iter().position(u8::is_ascii_whitespace)?;
    loop {
        pos = skip_whitespace(pos);
        if pos >= bytes.len() {
            return None;
        }
        let key_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let key = &tag[key_start..pos];
        pos = skip_whitespace(pos);
        if bytes.get(pos) != Some(&b'=') {
            return None;
        }
        pos = skip_whitespace(pos + 1);
        let quote = *bytes.get(pos)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = pos + 1;
        let value_end = value_start + bytes[value_start..].iter().position(|&b| b == quote)?;
        if key == name {
            return Some(value_start..value_end);
        }
        pos = value_end + 1;
    }
}

fn render_tag(name: &str, attributes: &[Attribute]) -> String {
    let mut tag = name.to_owned();
    for attr in attributes {
        tag.push(' ');
        tag.push_str(&attr.name);
        tag.push_str("=\"");
        tag.push_str(&escape(attr.value.as_str()));
        tag.push('"');
    }
    tag
}

/// Maps byte offsets to 1-based line numbers. Offsets must not decrease.
struct LineCounter<'a> {
    text: &'a [u8],
    offset: usize,
    line: u32,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> u32 {
        let offset = offset.min(self.text.len());
        if offset > self.offset {
            let newlines = self.text[self.offset..offset]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.line = self
                .line
                .saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
            self.offset = offset;
        }
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../fixtures/sample_ffx.xml");

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let doc = Document::parse_str(FIXTURE).unwrap();
        assert_eq!(doc.serialize(), FIXTURE);
    }

    #[test]
    fn test_roundtrip_keeps_bom_and_odd_markup() {
        let source = "\u{feff}<?xml version='1.0'?>\r\n<!DOCTYPE root>\n<root  a='x'\tb=\"y &amp; z\" >\
                      <![CDATA[<raw>]]><?pi data?><!-- c --><e/><f /></root>\n";
        let doc = Document::parse_str(source).unwrap();
        assert_eq!(doc.serialize(), source);
        assert_eq!(doc.attribute(doc.root(), "b"), Some("y & z"));
    }

    #[test]
    fn test_roundtrip_keeps_doctype_spacing() {
        for source in [
            "<!DOCTYPE  root>\n<root/>",
            "<!DOCTYPE\troot [\n  <!ENTITY e \"x\">\n]>\n<root/>",
        ] {
            let doc = Document::parse_str(source).unwrap();
            assert_eq!(doc.serialize(), source);
        }
    }

    #[test]
    fn test_line_numbers() {
        let doc = Document::parse_str("<a>\n  <b/>\n\n  <c>\n    <d/>\n  </c>\n</a>").unwrap();
        let root = doc.root();
        assert_eq!(doc.line(root), 1);
        let names: Vec<_> = doc
            .descendants(root)
            .into_iter()
            .map(|id| (doc.name(id).unwrap().to_owned(), doc.line(id)))
            .collect();
        assert_eq!(
            names,
            vec![
                ("b".to_owned(), 2),
                ("c".to_owned(), 4),
                ("d".to_owned(), 5)
            ]
        );
    }

    #[test]
    fn test_type_discriminator_resolves_prefix() {
        let doc = Document::parse_str(
            r#"<r xmlns:i="http://www.w3.org/2001/XMLSchema-instance" xmlns:o="urn:other">
                 <a i:type="FloatSequence"/>
                 <b o:type="FloatSequence"/>
                 <c type="FloatSequence"/>
               </r>"#,
        )
        .unwrap();
        let children: Vec<_> = doc.child_elements(doc.root()).collect();
        assert_eq!(doc.type_discriminator(children[0]), Some("FloatSequence"));
        assert_eq!(doc.type_discriminator(children[1]), None);
        assert_eq!(doc.type_discriminator(children[2]), None);
    }

    #[test]
    fn test_set_attribute_patches_in_place() {
        let source = "<r><t Time=\"0.5\"   Value='1' Other=\"Value\"/></r>";
        let mut doc = Document::parse_str(source).unwrap();
        let tick = doc.child(doc.root(), "t").unwrap();
        doc.set_attribute(tick, "Value", "0.2500");
        assert_eq!(
            doc.serialize(),
            "<r><t Time=\"0.5\"   Value='0.2500' Other=\"Value\"/></r>"
        );
        assert_eq!(doc.attribute(tick, "Value"), Some("0.2500"));
    }

    #[test]
    fn test_set_attribute_appends_missing() {
        let mut doc = Document::parse_str("<r><c Kind=\"x\" /></r>").unwrap();
        let c = doc.child(doc.root(), "c").unwrap();
        doc.set_attribute(c, "Value", "1.0000");
        assert_eq!(doc.serialize(), "<r><c Kind=\"x\" Value=\"1.0000\" /></r>");
    }

    #[test]
    fn test_set_attribute_escapes() {
        let mut doc = Document::parse_str("<r a=\"1\"/>").unwrap();
        let root = doc.root();
        doc.set_attribute(root, "a", "x<\"y\"");
        assert_eq!(doc.attribute(root, "a"), Some("x<\"y\""));
        let reparsed = Document::parse_str(&doc.serialize()).unwrap();
        assert_eq!(reparsed.attribute(reparsed.root(), "a"), Some("x<\"y\""));
    }

    #[test]
    fn test_text_and_set_text() {
        let mut doc = Document::parse_str("<r><n> -1 </n><e/></r>").unwrap();
        let n = doc.child(doc.root(), "n").unwrap();
        let e = doc.child(doc.root(), "e").unwrap();
        assert_eq!(doc.text(n), " -1 ");
        doc.set_text(n, "-2");
        doc.set_text(e, "a&b");
        assert_eq!(doc.text(n), "-2");
        assert_eq!(doc.text(e), "a&b");
        assert_eq!(doc.serialize(), "<r><n>-2</n><e>a&amp;b</e></r>");
    }

    #[test]
    fn test_elements_named_in_document_order() {
        let doc = Document::parse_str(FIXTURE).unwrap();
        let actions = doc.elements_named("ActionData");
        assert_eq!(actions.len(), 6);
        let lines: Vec<_> = actions.iter().map(|id| doc.line(*id)).collect();
        assert!(lines.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            Document::parse(b"\xff\xfe<a/>"),
            Err(LoadError::Encoding(_))
        ));
        assert!(matches!(
            Document::parse_str("<a><b></a>"),
            Err(LoadError::Syntax { .. })
        ));
        assert!(matches!(
            Document::parse_str("<a>\n<b>"),
            Err(LoadError::UnclosedElement { .. } | LoadError::Syntax { .. })
        ));
        assert!(matches!(
            Document::parse_str("<!-- only -->"),
            Err(LoadError::NoRootElement)
        ));
        assert!(matches!(
            Document::parse_str("<a/>\n<b/>"),
            Err(LoadError::MultipleRootElements { line: 2 })
        ));
        assert!(matches!(
            Document::parse_str("<a/>junk"),
            Err(LoadError::TextOutsideRoot { .. })
        ));
    }
}
