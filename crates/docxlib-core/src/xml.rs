//! Lossless element tree for OOXML parts.
//!
//! Parts are parsed with `quick-xml` into a small owned tree that keeps
//! qualified names, attribute order and whitespace, so a part that is read and
//! written back without edits comes out equivalent to what went in.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{DocxError, Result};

/// A node inside an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Comments, CDATA sections and processing instructions, kept verbatim.
    Raw(String),
}

/// An XML element with its qualified name (e.g. `w:tc`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A parsed XML part: the root element plus whether it carried a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlPart {
    pub declaration: bool,
    pub root: Element,
}

impl XmlPart {
    pub fn parse(xml: &str) -> Result<Self> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut declaration = false;

        loop {
            match reader.read_event()? {
                Event::Decl(_) => declaration = true,
                Event::Start(e) => stack.push(start_element(&e)?),
                Event::Empty(e) => {
                    let el = start_element(&e)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| DocxError::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(t) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = t.unescape()?;
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = format!("<![CDATA[{}]]>", String::from_utf8_lossy(&c));
                        parent.children.push(Node::Raw(raw));
                    }
                }
                Event::Comment(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = format!("<!--{}-->", String::from_utf8_lossy(&c));
                        parent.children.push(Node::Raw(raw));
                    }
                }
                Event::PI(p) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = format!("<?{}?>", String::from_utf8_lossy(&p));
                        parent.children.push(Node::Raw(raw));
                    }
                }
                Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(DocxError::Xml(format!(
                "unclosed element <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }
        let root = root.ok_or_else(|| DocxError::Xml("document has no root element".to_string()))?;
        Ok(Self { declaration, root })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| DocxError::Xml(format!("part is not valid UTF-8: {}", e)))?;
        Self::parse(xml)
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.declaration {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n");
        }
        self.root.write_to(&mut out);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml_string().into_bytes()
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| DocxError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(DocxError::Xml("multiple root elements".to_string()));
    }
    *root = Some(el);
    Ok(())
}

fn escape_into(out: &mut String, s: &str, in_attr: bool) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            '\n' if in_attr => out.push_str("&#10;"),
            '\t' if in_attr => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Parses a standalone fragment. Prefixes do not need to be declared.
    pub fn parse_fragment(xml: &str) -> Result<Self> {
        Ok(XmlPart::parse(xml)?.root)
    }

    /// Local part of the qualified name (`tc` for `w:tc`).
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Element children, skipping text and raw nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// The `n`-th (0-based) child element called `name`.
    pub fn nth_child(&self, name: &str, n: usize) -> Option<&Element> {
        self.elements().filter(|e| e.name == name).nth(n)
    }

    pub fn nth_child_mut(&mut self, name: &str, n: usize) -> Option<&mut Element> {
        self.elements_mut().filter(|e| e.name == name).nth(n)
    }

    pub fn count_children(&self, name: &str) -> usize {
        self.children_named(name).count()
    }

    pub fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        let idx = self.children.len() - 1;
        self.element_at_mut(idx)
    }

    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.name == name));
        before - self.children.len()
    }

    /// Inserts `child` respecting a schema sequence.
    ///
    /// `order` lists sibling names in schema order. The child goes before the
    /// first existing sibling that ranks after it or is not listed at all.
    pub fn insert_ordered(&mut self, child: Element, order: &[&str]) -> &mut Element {
        let rank = |name: &str| order.iter().position(|n| *n == name);
        let mine = rank(&child.name);
        let pos = self
            .children
            .iter()
            .position(|n| match n {
                Node::Element(e) => match (rank(&e.name), mine) {
                    (None, _) => true,
                    (Some(theirs), Some(mine)) => theirs > mine,
                    (Some(_), None) => false,
                },
                _ => false,
            })
            .unwrap_or(self.children.len());
        self.children.insert(pos, Node::Element(child));
        self.element_at_mut(pos)
    }

    /// Returns the child called `name`, inserting an empty one in schema order
    /// when absent.
    pub fn child_or_insert(&mut self, name: &str, order: &[&str]) -> &mut Element {
        let existing = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.name == name));
        match existing {
            Some(idx) => self.element_at_mut(idx),
            None => self.insert_ordered(Element::new(name), order),
        }
    }

    /// Replaces (or inserts) the child called `child.name` in schema order.
    pub fn replace_child(&mut self, child: Element, order: &[&str]) -> &mut Element {
        self.remove_children(&child.name);
        self.insert_ordered(child, order)
    }

    fn element_at_mut(&mut self, idx: usize) -> &mut Element {
        match &mut self.children[idx] {
            Node::Element(e) => e,
            _ => unreachable!("index {} was just resolved to an element", idx),
        }
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_text(&mut self, text: &str) {
        self.children.retain(|n| !matches!(n, Node::Text(_)));
        if !text.is_empty() {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Depth-first visit of this element and every descendant element.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        f(self);
        for child in self.elements() {
            child.walk(f);
        }
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in self.elements_mut() {
            child.walk_mut(f);
        }
    }

    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_into(out, v, true);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(out),
                Node::Text(t) => escape_into(out, t, false),
                Node::Raw(r) => out.push_str(r),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nth_child_outlives_name() {
        let tbl = Element::parse_fragment("<w:tbl><w:tr/><w:gridCol/><w:tr><w:tc/></w:tr></w:tbl>")
            .unwrap();
        let second = {
            let name = format!("w:{}", "tr");
            tbl.nth_child(&name, 1)
        };
        assert_eq!(second.map(|tr| tr.count_children("w:tc")), Some(1));
        assert!(tbl.nth_child("w:tr", 2).is_none());
    }

    #[test]
    fn test_round_trip_keeps_prefixes_and_whitespace() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
                   <w:document xmlns:w=\"urn:w\"><w:body>\n  <w:p><w:r><w:t xml:space=\"preserve\"> a &amp; b </w:t></w:r></w:p>\n</w:body></w:document>";
        let part = XmlPart::parse(xml).unwrap();
        assert!(part.declaration);
        assert_eq!(part.root.name, "w:document");
        assert_eq!(part.to_xml_string(), xml);
    }

    #[test]
    fn test_attribute_escaping() {
        let el = Element::new("w:t").with_attr("val", "a\"<b>&");
        assert_eq!(el.to_xml_string(), "<w:t val=\"a&quot;&lt;b&gt;&amp;\"/>");
        let parsed = Element::parse_fragment(&el.to_xml_string()).unwrap();
        assert_eq!(parsed.attr("val"), Some("a\"<b>&"));
    }

    #[test]
    fn test_insert_ordered() {
        let order = ["w:rFonts", "w:b", "w:color", "w:sz"];
        let mut rpr = Element::new("w:rPr");
        rpr.insert_ordered(Element::new("w:sz"), &order);
        rpr.insert_ordered(Element::new("w:rFonts"), &order);
        rpr.insert_ordered(Element::new("w:color"), &order);
        let names: Vec<_> = rpr.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w:rFonts", "w:color", "w:sz"]);
    }

    #[test]
    fn test_properties_element_goes_first() {
        let mut p = Element::parse_fragment("<w:p><w:r/><w:r/></w:p>").unwrap();
        p.child_or_insert("w:pPr", &["w:pPr"]);
        assert_eq!(p.elements().next().map(|e| e.name.as_str()), Some("w:pPr"));
        assert_eq!(p.count_children("w:r"), 2);
    }

    #[test]
    fn test_unbalanced_document_is_rejected() {
        assert!(XmlPart::parse("<a><b></a>").is_err());
        assert!(XmlPart::parse("").is_err());
    }
}
