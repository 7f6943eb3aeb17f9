//! Document lifecycle: load, save, merge and copy.
//!
//! A [`Document`] owns the whole OPC package plus the parsed tree of its main
//! part. Every other part stays as raw bytes until an operation needs it.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::{DocxError, Result};
use crate::package::{
    extension_of, relative_target, resolve_target, Package, Relationships, CONTENT_TYPES_PART,
};
use crate::wml::{ends_section, W_BODY, W_P, W_PPR, W_SECTPR};
use crate::xml::{Element, Node, XmlPart};

static EMPTY_BODY: Element = Element {
    name: String::new(),
    attrs: Vec::new(),
    children: Vec::new(),
};

/// A loaded Word document.
#[derive(Debug, Clone)]
pub struct Document {
    package: Package,
    main_part: String,
    main: XmlPart,
    /// Highest `wp:docPr` id in use; new drawings count up from here.
    drawing_id: u32,
}

impl Document {
    /// Opens a document from the bytes of a .docx file.
    ///
    /// A container that is not a zip, or lacks the content-types or main
    /// document part, is a [`DocxError::Validation`]. A main part that does not
    /// parse is a [`DocxError::Document`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)
            .map_err(|e| DocxError::Validation(format!("not a valid docx package: {}", e)))?;
        if !package.contains(CONTENT_TYPES_PART) {
            return Err(DocxError::Validation(format!(
                "not a valid docx package: missing {}",
                CONTENT_TYPES_PART
            )));
        }
        let main_part = package
            .main_document_name()
            .map_err(|e| DocxError::Document(format!("unreadable package relationships: {}", e)))?;
        let main_bytes = package.part(&main_part).ok_or_else(|| {
            DocxError::Validation(format!("not a valid docx package: missing {}", main_part))
        })?;
        let mut main = XmlPart::from_bytes(main_bytes)
            .map_err(|e| DocxError::Document(format!("failed to parse {}: {}", main_part, e)))?;

        if main.root.child(W_BODY).is_none() {
            main.root.push(Element::new(W_BODY));
        }
        let drawing_id = max_drawing_id(&main.root);

        debug!("Loaded document with main part {}", main_part);
        Ok(Self {
            package,
            main_part,
            main,
            drawing_id,
        })
    }

    /// Serialises the document back into .docx bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut package = self.package.clone();
        package.set_part(&self.main_part, self.main.to_bytes());
        package.to_bytes()
    }

    /// The `w:body` element of the main part.
    pub fn body(&self) -> &Element {
        self.main.root.child(W_BODY).unwrap_or(&EMPTY_BODY)
    }

    pub(crate) fn body_mut(&mut self) -> &mut Element {
        self.main.root.child_or_insert(W_BODY, &[])
    }

    pub(crate) fn root_mut(&mut self) -> &mut Element {
        &mut self.main.root
    }

    pub fn section_count(&self) -> usize {
        self.section_spans().len()
    }

    /// Ranges of body child indices making up each section.
    pub(crate) fn section_spans(&self) -> Vec<Range<usize>> {
        let children = &self.body().children;
        let mut spans = Vec::new();
        let mut start = 0;
        for (i, node) in children.iter().enumerate() {
            if ends_section(node) {
                spans.push(start..i + 1);
                start = i + 1;
            }
        }
        if start < children.len() || spans.is_empty() {
            spans.push(start..children.len());
        }
        spans
    }

    /// The underlying package, with the main part as it was last loaded.
    pub fn package(&self) -> &Package {
        &self.package
    }

    pub(crate) fn package_mut(&mut self) -> &mut Package {
        &mut self.package
    }

    pub fn main_part_name(&self) -> &str {
        &self.main_part
    }

    pub(crate) fn next_drawing_id(&mut self) -> u32 {
        self.drawing_id += 1;
        self.drawing_id
    }

    /// Appends the content of `other` as new sections.
    fn append_document(&mut self, other: &Document) -> Result<()> {
        let body = self.body_mut();
        if let Some(idx) = body
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.name == W_SECTPR))
        {
            // The final section's properties must live in a paragraph once
            // other content follows it.
            if let Node::Element(sect) = body.children.remove(idx) {
                let para = Element::new(W_P).with_child(Element::new(W_PPR).with_child(sect));
                body.children.push(Node::Element(para));
            }
        }

        let mut content = other.body().clone();
        let dest_part = self.main_part.clone();
        let mut importer = PartImporter::new(&other.package);
        importer.import_tree(&mut content, &other.main_part, &mut self.package, &dest_part)?;

        content.walk_mut(&mut |el| {
            if el.name == "wp:docPr" {
                self.drawing_id += 1;
                el.set_attr("id", self.drawing_id.to_string());
            }
        });
        let appended = content.children.len();
        self.body_mut().children.extend(content.children);
        debug!(
            "Appended {} body nodes and {} parts",
            appended,
            importer.part_map.len()
        );
        Ok(())
    }
}

fn max_drawing_id(root: &Element) -> u32 {
    let mut max = 0;
    root.walk(&mut |el| {
        if el.name == "wp:docPr" {
            if let Some(id) = el.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                max = max.max(id);
            }
        }
    });
    max
}

/// Copies relationship-referenced parts from one package into another.
struct PartImporter<'a> {
    src: &'a Package,
    /// Source part name -> name given to it in the destination.
    part_map: HashMap<String, String>,
}

impl<'a> PartImporter<'a> {
    fn new(src: &'a Package) -> Self {
        Self {
            src,
            part_map: HashMap::new(),
        }
    }

    /// Rewrites the relationship ids referenced by `tree` (owned by
    /// `src_part`) so they resolve from `dest_part` in `dest`.
    fn import_tree(
        &mut self,
        tree: &mut Element,
        src_part: &str,
        dest: &mut Package,
        dest_part: &str,
    ) -> Result<()> {
        let mut referenced = BTreeSet::new();
        tree.walk(&mut |el| {
            for (key, value) in &el.attrs {
                if key.starts_with("r:") {
                    referenced.insert(value.clone());
                }
            }
        });
        if referenced.is_empty() {
            return Ok(());
        }

        let src_rels = self.src.relationships(src_part)?;
        let mut dest_rels = dest.relationships(dest_part)?;
        let mut id_map = HashMap::new();
        for old_id in referenced {
            let Some(rel) = src_rels.get(&old_id) else {
                continue;
            };
            let new_id = if rel.external {
                dest_rels.add(&rel.rel_type, &rel.target, true)
            } else {
                let part = resolve_target(src_part, &rel.target);
                let new_part = self.import_part(&part, dest)?;
                dest_rels.add(&rel.rel_type, &relative_target(dest_part, &new_part), false)
            };
            id_map.insert(old_id, new_id);
        }
        dest.set_relationships(dest_part, &dest_rels);

        tree.walk_mut(&mut |el| {
            for (key, value) in el.attrs.iter_mut() {
                if key.starts_with("r:") {
                    if let Some(new_id) = id_map.get(value.as_str()) {
                        *value = new_id.clone();
                    }
                }
            }
        });
        Ok(())
    }

    /// Copies `part` (and, recursively, what it references) into `dest`.
    fn import_part(&mut self, part: &str, dest: &mut Package) -> Result<String> {
        if let Some(done) = self.part_map.get(part) {
            return Ok(done.clone());
        }
        let Some(data) = self.src.part(part) else {
            return Err(DocxError::Document(format!(
                "relationship target {} is missing from the package",
                part
            )));
        };
        let new_part = fresh_part_name(dest, part);
        self.part_map.insert(part.to_string(), new_part.clone());

        let has_rels = !self.src.relationships(part)?.is_empty();
        let data = if has_rels && data.starts_with(b"<") {
            let mut xml = XmlPart::from_bytes(data)?;
            self.import_tree(&mut xml.root, part, dest, &new_part)?;
            xml.to_bytes()
        } else {
            data.to_vec()
        };
        dest.set_part(&new_part, data);

        let ext = extension_of(part).to_ascii_lowercase();
        if let Some(ct) = self.src.content_type_of(part)? {
            if dest.content_type_of(&new_part)?.as_deref() != Some(ct.as_str()) {
                if ext.is_empty() || is_xml_extension(&ext) {
                    dest.set_override_content_type(&new_part, &ct)?;
                } else {
                    dest.ensure_default_content_type(&ext, &ct)?;
                }
            }
        }
        Ok(new_part)
    }
}

fn is_xml_extension(ext: &str) -> bool {
    ext == "xml"
}

fn fresh_part_name(dest: &Package, wanted: &str) -> String {
    if !dest.contains(wanted) {
        return wanted.to_string();
    }
    let (stem, ext) = match wanted.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => (stem, Some(ext)),
        _ => (wanted, None),
    };
    (2..)
        .map(|i| match ext {
            Some(ext) => format!("{}_{}.{}", stem, i, ext),
            None => format!("{}_{}", stem, i),
        })
        .find(|candidate| !dest.contains(candidate))
        .unwrap_or_else(|| wanted.to_string())
}

/// Loads a .docx (or .dotx) file from disk.
#[instrument(skip_all, fields(path = %path.as_ref().display()), level = "debug")]
pub fn load_docx(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DocxError::Document(format!(
            "file not found: {}",
            path.display()
        )));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ext != "docx" && ext != "dotx" {
        return Err(DocxError::Validation(format!(
            "not a .docx file: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| DocxError::Document(format!("failed to read {}: {}", path.display(), e)))?;
    let doc = Document::from_bytes(&bytes)?;
    info!("Loaded {} ({} sections)", path.display(), doc.section_count());
    Ok(doc)
}

/// Loads a document from in-memory .docx bytes.
pub fn load_docx_bytes(bytes: &[u8]) -> Result<Document> {
    Document::from_bytes(bytes)
}

/// Writes `doc` to `path`, creating missing parent directories.
#[instrument(skip_all, fields(path = %path.as_ref().display()), level = "debug")]
pub fn save_docx(doc: &Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DocxError::Document(format!(
                "failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    let bytes = doc.to_bytes()?;
    std::fs::write(path, bytes)
        .map_err(|e| DocxError::Document(format!("failed to save {}: {}", path.display(), e)))?;
    info!("Saved {}", path.display());
    Ok(())
}

/// Concatenates documents; every following document starts a new section.
#[instrument(skip_all, fields(count = docs.len()), level = "debug")]
pub fn merge_docs(docs: &[Document]) -> Result<Document> {
    let (first, rest) = docs
        .split_first()
        .ok_or_else(|| DocxError::Document("no documents to merge".to_string()))?;
    let mut merged = first.clone();
    for other in rest {
        merged.append_document(other)?;
    }
    Ok(merged)
}

/// Deep copy of a document.
pub fn copy_doc(doc: &Document) -> Document {
    doc.clone()
}

/// Relationships of the main part, for callers that add media.
pub(crate) fn main_relationships(doc: &Document) -> Result<Relationships> {
    doc.package().relationships(doc.main_part_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{docx_from_body, docx_with_sections};

    #[test]
    fn test_single_section_without_break() {
        let doc = Document::from_bytes(&docx_from_body("<w:p/><w:sectPr/>")).unwrap();
        assert_eq!(doc.section_count(), 1);
    }

    #[test]
    fn test_empty_body_still_has_a_section() {
        let doc = Document::from_bytes(&docx_from_body("")).unwrap();
        assert_eq!(doc.section_count(), 1);
    }

    #[test]
    fn test_section_breaks_split_body() {
        let doc = Document::from_bytes(&docx_with_sections(&[&["a"], &["b"], &["c"]])).unwrap();
        assert_eq!(doc.section_count(), 3);
    }

    #[test]
    fn test_not_a_zip_is_validation_error() {
        let err = Document::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, DocxError::Validation(_)));
    }

    #[test]
    fn test_fresh_part_name() {
        let mut pkg = Package::default();
        pkg.set_part("word/header1.xml", Vec::new());
        pkg.set_part("word/header1_2.xml", Vec::new());
        assert_eq!(fresh_part_name(&pkg, "word/header1.xml"), "word/header1_3.xml");
        assert_eq!(fresh_part_name(&pkg, "word/header2.xml"), "word/header2.xml");
    }

    #[test]
    fn test_merge_moves_final_section_properties() {
        let a = Document::from_bytes(&docx_with_sections(&[&["a"]])).unwrap();
        let b = Document::from_bytes(&docx_with_sections(&[&["b"], &["c"]])).unwrap();
        let merged = merge_docs(&[a, b]).unwrap();
        assert_eq!(merged.section_count(), 3);
        let body_level = merged.body().count_children(W_SECTPR);
        assert_eq!(body_level, 1);
    }

    #[test]
    fn test_merge_of_nothing_fails() {
        assert!(matches!(merge_docs(&[]), Err(DocxError::Document(_))));
    }
}
