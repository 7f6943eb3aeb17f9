//! OPC package handling: the zip container, relationships and content types.

use std::io::{Cursor, Read, Write};

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::constants::{NS_PKG_RELS, REL_OFFICE_DOCUMENT, REL_TARGET_MODE_EXTERNAL};
use crate::error::Result;
use crate::xml::{Element, XmlPart};

pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub(crate) const DEFAULT_MAIN_PART: &str = "word/document.xml";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Every part of a .docx package, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Reads all entries of a zip archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            parts.push((name, contents));
        }
        debug!("Read package with {} parts", parts.len());
        Ok(Self { parts })
    }

    /// Writes the package back into a zip archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.parts {
            // Media is already compressed; deflating it again only costs time.
            let method = if name.starts_with("word/media/") {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = FileOptions::default().compression_method(method);
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    pub fn xml_part(&self, name: &str) -> Result<Option<XmlPart>> {
        self.part(name).map(XmlPart::from_bytes).transpose()
    }

    /// Name of the main document part, taken from the package relationships.
    pub fn main_document_name(&self) -> Result<String> {
        let rels = self.relationships("")?;
        let name = rels
            .iter()
            .find(|r| r.rel_type == REL_OFFICE_DOCUMENT)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
        Ok(name)
    }

    /// Relationships of `source` (`""` for the package itself).
    pub fn relationships(&self, source: &str) -> Result<Relationships> {
        match self.xml_part(&rels_path_for(source))? {
            Some(part) => Ok(Relationships::from_element(&part.root)),
            None => Ok(Relationships::default()),
        }
    }

    pub fn set_relationships(&mut self, source: &str, rels: &Relationships) {
        let part = XmlPart {
            declaration: true,
            root: rels.to_element(),
        };
        self.set_part(&rels_path_for(source), part.to_bytes());
    }

    fn content_types(&self) -> Result<XmlPart> {
        match self.xml_part(CONTENT_TYPES_PART)? {
            Some(part) => Ok(part),
            None => Ok(XmlPart {
                declaration: true,
                root: Element::new("Types").with_attr("xmlns", NS_CONTENT_TYPES),
            }),
        }
    }

    /// Content type of a part, from its override or its extension default.
    pub fn content_type_of(&self, part_name: &str) -> Result<Option<String>> {
        let types = self.content_types()?;
        let wanted = format!("/{}", part_name);
        let over = types
            .root
            .children_named("Override")
            .find(|o| o.attr("PartName").is_some_and(|p| p.eq_ignore_ascii_case(&wanted)))
            .and_then(|o| o.attr("ContentType"));
        if let Some(ct) = over {
            return Ok(Some(ct.to_string()));
        }
        let ext = extension_of(part_name);
        let default = types
            .root
            .children_named("Default")
            .find(|d| d.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(ext)))
            .and_then(|d| d.attr("ContentType"))
            .map(str::to_string);
        Ok(default)
    }

    pub fn ensure_default_content_type(
        &mut self,
        extension: &str,
        content_type: &str,
    ) -> Result<()> {
        let mut types = self.content_types()?;
        let present = types
            .root
            .children_named("Default")
            .any(|d| d.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(extension)));
        if !present {
            let default = Element::new("Default")
                .with_attr("Extension", extension)
                .with_attr("ContentType", content_type);
            types.root.insert_ordered(default, &["Default", "Override"]);
            self.set_part(CONTENT_TYPES_PART, types.to_bytes());
        }
        Ok(())
    }

    pub fn set_override_content_type(&mut self, part_name: &str, content_type: &str) -> Result<()> {
        let mut types = self.content_types()?;
        let wanted = format!("/{}", part_name);
        types.root.children.retain(|n| match n {
            crate::xml::Node::Element(e) => {
                !(e.name == "Override" && e.attr("PartName") == Some(wanted.as_str()))
            }
            _ => true,
        });
        types.root.push(
            Element::new("Override")
                .with_attr("PartName", wanted)
                .with_attr("ContentType", content_type),
        );
        self.set_part(CONTENT_TYPES_PART, types.to_bytes());
        Ok(())
    }
}

/// A single package relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The contents of a `.rels` part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    fn from_element(root: &Element) -> Self {
        let items = root
            .children_named("Relationship")
            .map(|r| Relationship {
                id: r.attr("Id").unwrap_or_default().to_string(),
                rel_type: r.attr("Type").unwrap_or_default().to_string(),
                target: r.attr("Target").unwrap_or_default().to_string(),
                external: r.attr("TargetMode") == Some(REL_TARGET_MODE_EXTERNAL),
            })
            .collect();
        Self { items }
    }

    fn to_element(&self) -> Element {
        let mut root = Element::new("Relationships").with_attr("xmlns", NS_PKG_RELS);
        for rel in &self.items {
            let mut el = Element::new("Relationship")
                .with_attr("Id", rel.id.as_str())
                .with_attr("Type", rel.rel_type.as_str())
                .with_attr("Target", rel.target.as_str());
            if rel.external {
                el.set_attr("TargetMode", REL_TARGET_MODE_EXTERNAL);
            }
            root.push(el);
        }
        root
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Target of the first relationship of `rel_type` pointing at `target`.
    pub fn find_target(&self, rel_type: &str, target: &str) -> Option<&Relationship> {
        self.items
            .iter()
            .find(|r| r.rel_type == rel_type && r.target == target && !r.external)
    }

    /// Adds a relationship and returns its fresh `rIdN` id.
    pub fn add(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        let next = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{}", next);
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            external,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`; `""` -> `_rels/.rels`.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{}.rels", part),
    }
}

fn directory_of(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

pub(crate) fn extension_of(part: &str) -> &str {
    let file = part.rsplit('/').next().unwrap_or(part);
    file.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Resolves a relationship target against the part that owns it.
pub(crate) fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = directory_of(source)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Target string to reach `part` from `source`.
pub(crate) fn relative_target(source: &str, part: &str) -> String {
    let dir = directory_of(source);
    if dir.is_empty() {
        return part.to_string();
    }
    match part.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(rest) => rest.to_string(),
        None => format!("/{}", part),
    }
}
