//! Thin views over the WordprocessingML elements the library edits.

use crate::xml::{Element, Node};

pub(crate) const W_BODY: &str = "w:body";
pub(crate) const W_P: &str = "w:p";
pub(crate) const W_PPR: &str = "w:pPr";
pub(crate) const W_SECTPR: &str = "w:sectPr";
pub(crate) const W_TBL: &str = "w:tbl";
pub(crate) const W_TR: &str = "w:tr";
pub(crate) const W_TC: &str = "w:tc";
pub(crate) const W_TCPR: &str = "w:tcPr";
pub(crate) const W_R: &str = "w:r";
pub(crate) const W_RPR: &str = "w:rPr";
pub(crate) const W_T: &str = "w:t";
pub(crate) const W_TAB: &str = "w:tab";
pub(crate) const W_BR: &str = "w:br";
pub(crate) const W_CR: &str = "w:cr";

/// Subtrees that never contribute to a paragraph's visible text.
const TEXT_OPAQUE: &[&str] = &[
    W_PPR,
    W_RPR,
    W_P,
    "w:drawing",
    "w:pict",
    "w:object",
    "w:delText",
    "w:instrText",
    "mc:AlternateContent",
];

// Schema sequences used for ordered insertion.
pub(crate) const P_ORDER: &[&str] = &[W_PPR];
pub(crate) const R_ORDER: &[&str] = &[W_RPR];
pub(crate) const TC_ORDER: &[&str] = &[W_TCPR];

pub(crate) const PPR_ORDER: &[&str] = &[
    "w:pStyle", "w:keepNext", "w:keepLines", "w:pageBreakBefore", "w:framePr",
    "w:widowControl", "w:numPr", "w:suppressLineNumbers", "w:pBdr", "w:shd",
    "w:tabs", "w:suppressAutoHyphens", "w:kinsoku", "w:wordWrap",
    "w:overflowPunct", "w:topLinePunct", "w:autoSpaceDE", "w:autoSpaceDN",
    "w:bidi", "w:adjustRightInd", "w:snapToGrid", "w:spacing", "w:ind",
    "w:contextualSpacing", "w:mirrorIndents", "w:suppressOverlap", "w:jc",
    "w:textDirection", "w:textAlignment", "w:textboxTightWrap", "w:outlineLvl",
    "w:divId", "w:cnfStyle", "w:rPr", "w:sectPr", "w:pPrChange",
];

pub(crate) const RPR_ORDER: &[&str] = &[
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps",
    "w:smallCaps", "w:strike", "w:dstrike", "w:outline", "w:shadow", "w:emboss",
    "w:imprint", "w:noProof", "w:snapToGrid", "w:vanish", "w:webHidden",
    "w:color", "w:spacing", "w:w", "w:kern", "w:position", "w:sz", "w:szCs",
    "w:highlight", "w:u", "w:effect", "w:bdr", "w:shd", "w:fitText",
    "w:vertAlign", "w:rtl", "w:cs", "w:em", "w:lang", "w:eastAsianLayout",
    "w:specVanish", "w:oMath",
];

pub(crate) const TCPR_ORDER: &[&str] = &[
    "w:cnfStyle", "w:tcW", "w:gridSpan", "w:hMerge", "w:vMerge", "w:tcBorders",
    "w:shd", "w:noWrap", "w:tcMar", "w:textDirection", "w:tcFitText", "w:vAlign",
    "w:hideMark",
];

pub(crate) const TC_BORDERS_ORDER: &[&str] = &[
    "w:top", "w:start", "w:left", "w:bottom", "w:end", "w:right", "w:insideH",
    "w:insideV", "w:tl2br", "w:tr2bl",
];

/// Visible text of a paragraph.
pub fn paragraph_text(p: &Element) -> String {
    let mut out = String::new();
    collect_text(p, &mut out);
    out
}

fn collect_text(el: &Element, out: &mut String) {
    for child in el.elements() {
        match child.name.as_str() {
            W_T => out.push_str(&child.text()),
            W_TAB => out.push('\t'),
            W_BR | W_CR => out.push('\n'),
            name if TEXT_OPAQUE.contains(&name) => {}
            _ => collect_text(child, out),
        }
    }
}

/// One piece of a paragraph's text, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub text: String,
    /// `w:t` content. Tabs and breaks are read as `\t` / `\n` but cannot be rewritten.
    pub writable: bool,
}

/// The paragraph's text split into `w:t` contents and tab/break markers.
/// Joining the segments gives exactly [`paragraph_text`].
pub(crate) fn text_segments(p: &Element) -> Vec<Segment> {
    let mut out = Vec::new();
    collect_segments(p, &mut out);
    out
}

fn collect_segments(el: &Element, out: &mut Vec<Segment>) {
    for child in el.elements() {
        let marker = match child.name.as_str() {
            W_T => {
                out.push(Segment {
                    text: child.text(),
                    writable: true,
                });
                continue;
            }
            W_TAB => "\t",
            W_BR | W_CR => "\n",
            name if TEXT_OPAQUE.contains(&name) => continue,
            _ => {
                collect_segments(child, out);
                continue;
            }
        };
        out.push(Segment {
            text: marker.to_string(),
            writable: false,
        });
    }
}

/// Overwrites each `w:t` of a paragraph, consuming one value per segment
/// in the order [`text_segments`] read them. Values for markers are ignored.
pub(crate) fn write_text_segments(p: &mut Element, segments: &mut impl Iterator<Item = String>) {
    for child in p.elements_mut() {
        match child.name.as_str() {
            W_T => {
                if let Some(text) = segments.next() {
                    child.set_text(&text);
                    child.set_attr("xml:space", "preserve");
                }
            }
            W_TAB | W_BR | W_CR => {
                segments.next();
            }
            name if TEXT_OPAQUE.contains(&name) => {}
            _ => write_text_segments(child, segments),
        }
    }
}

fn text_element(text: &str) -> Element {
    let mut t = Element::new(W_T).with_attr("xml:space", "preserve");
    t.set_text(text);
    t
}

/// Read-only view of a table cell.
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    el: &'a Element,
}

impl<'a> Cell<'a> {
    pub(crate) fn new(el: &'a Element) -> Self {
        Self { el }
    }

    /// Concatenation of every paragraph's text, each trimmed.
    pub fn text(&self) -> String {
        self.el
            .children_named(W_P)
            .map(|p| paragraph_text(p).trim().to_string())
            .collect()
    }

    /// Untrimmed text of each direct paragraph.
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.el.children_named(W_P).map(paragraph_text).collect()
    }

    pub fn paragraph_count(&self) -> usize {
        self.el.count_children(W_P)
    }

    pub fn element(&self) -> &'a Element {
        self.el
    }
}

/// Mutable view of a table cell.
#[derive(Debug)]
pub struct CellMut<'a> {
    el: &'a mut Element,
}

impl<'a> CellMut<'a> {
    pub(crate) fn new(el: &'a mut Element) -> Self {
        Self { el }
    }

    pub fn as_cell(&self) -> Cell<'_> {
        Cell::new(self.el)
    }

    /// Removes every direct paragraph of the cell.
    pub fn clear_paragraphs(&mut self) {
        self.el.remove_children(W_P);
    }

    pub fn add_paragraph(&mut self) -> ParagraphMut<'_> {
        ParagraphMut::new(self.el.push(Element::new(W_P)))
    }

    /// The cell's `w:tcPr`, created when missing.
    pub(crate) fn properties(&mut self) -> &mut Element {
        self.el.child_or_insert(W_TCPR, TC_ORDER)
    }
}

/// Mutable view of a paragraph.
#[derive(Debug)]
pub struct ParagraphMut<'a> {
    el: &'a mut Element,
}

impl<'a> ParagraphMut<'a> {
    pub(crate) fn new(el: &'a mut Element) -> Self {
        Self { el }
    }

    pub fn text(&self) -> String {
        paragraph_text(self.el)
    }

    /// Appends a run holding `text`; line feeds become `w:br` breaks.
    pub fn append_text(&mut self, text: &str) -> RunMut<'_> {
        let mut run = Element::new(W_R);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                run.push(Element::new(W_BR));
            }
            if !line.is_empty() {
                run.push(text_element(line));
            }
        }
        RunMut::new(self.el.push(run))
    }

    /// Appends an already-built run (e.g. one holding a drawing).
    pub(crate) fn append_run(&mut self, run: Element) -> RunMut<'_> {
        RunMut::new(self.el.push(run))
    }

    pub(crate) fn properties(&mut self) -> &mut Element {
        self.el.child_or_insert(W_PPR, P_ORDER)
    }
}

/// Mutable view of a run.
#[derive(Debug)]
pub struct RunMut<'a> {
    el: &'a mut Element,
}

impl<'a> RunMut<'a> {
    pub(crate) fn new(el: &'a mut Element) -> Self {
        Self { el }
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self.el, &mut out);
        out
    }

    pub(crate) fn properties(&mut self) -> &mut Element {
        self.el.child_or_insert(W_RPR, R_ORDER)
    }

    pub fn element(&self) -> &Element {
        self.el
    }
}

/// Whether a top-level paragraph closes a section.
pub(crate) fn ends_section(node: &Node) -> bool {
    match node {
        Node::Element(el) if el.name == W_P => el
            .child(W_PPR)
            .and_then(|ppr| ppr.child(W_SECTPR))
            .is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(xml: &str) -> Element {
        Element::parse_fragment(xml).unwrap()
    }

    #[test]
    fn test_paragraph_text_skips_properties_and_drawings() {
        let para = p("<w:p><w:pPr><w:tabs><w:tab w:val=\"left\"/></w:tabs></w:pPr>\
                      <w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/></w:r>\
                      <w:r><w:drawing><w:t>hidden</w:t></w:drawing></w:r>\
                      <w:hyperlink><w:r><w:t>c</w:t></w:r></w:hyperlink></w:p>");
        assert_eq!(paragraph_text(&para), "a\tb\nc");
    }

    #[test]
    fn test_cell_text_trims_each_paragraph() {
        let tc = p("<w:tc><w:p><w:r><w:t xml:space=\"preserve\"> 姓名 </w:t></w:r></w:p>\
                    <w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc>");
        let cell = Cell::new(&tc);
        assert_eq!(cell.text(), "姓名x");
        assert_eq!(cell.paragraph_texts(), vec![" 姓名 ".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_append_text_with_newlines() {
        let mut tc = p("<w:tc><w:tcPr/><w:p/></w:tc>");
        let mut cell = CellMut::new(&mut tc);
        cell.clear_paragraphs();
        let mut para = cell.add_paragraph();
        let run = para.append_text("one\ntwo");
        assert_eq!(run.text(), "one\ntwo");
        assert_eq!(
            tc.to_xml_string(),
            "<w:tc><w:tcPr/><w:p><w:r><w:t xml:space=\"preserve\">one</w:t><w:br/>\
             <w:t xml:space=\"preserve\">two</w:t></w:r></w:p></w:tc>"
        );
    }

    #[test]
    fn test_segments_rewrite_in_order() {
        let mut para = p("<w:p><w:r><w:t>ab</w:t></w:r><w:r><w:tab/><w:t>cd</w:t></w:r></w:p>");
        let segments = text_segments(&para);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", "\t", "cd"]);
        assert_eq!(segments.iter().filter(|s| !s.writable).count(), 1);
        assert_eq!(texts.concat(), paragraph_text(&para));

        let mut new = vec!["x".to_string(), "ignored".to_string(), String::new()].into_iter();
        write_text_segments(&mut para, &mut new);
        assert_eq!(paragraph_text(&para), "x\t");
    }
}
