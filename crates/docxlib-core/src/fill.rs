//! Writing text, images and dates into table cells.
//!
//! Every fill takes a [`FillTarget`]: an explicit address (wildcards allowed)
//! or an anchor text whose right or lower neighbour receives the content.
//! All target cells are resolved before any of them is modified.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::constants::{DATE_SEPARATOR_FONT, DEFAULT_COLOR, DEFAULT_FONT, DEFAULT_FONT_SIZE};
use crate::date::{parse_date_string, validate_date_string};
use crate::document::{main_relationships, Document};
use crate::error::{DocxError, Result};
use crate::media::{embed_image, inline_drawing};
use crate::package::resolve_target;
use crate::style::{
    apply_cell_alignment, apply_font_style, apply_paragraph_alignment, FontStyle,
    HorizontalAlignment, VerticalAlignment,
};
use crate::table::{find_text, get_cell, get_cell_addresses, get_cell_mut, CellAddress};
use crate::wml::{text_segments, write_text_segments, CellMut, W_P, W_R};
use crate::xml::Element;

const REL_HEADER_SUFFIX: &str = "/relationships/header";
const REL_FOOTER_SUFFIX: &str = "/relationships/footer";
const MC_FALLBACK: &str = "mc:Fallback";

/// Which cell(s) a fill writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillTarget {
    /// An explicit address; `0` on any axis matches every index.
    At(CellAddress),
    /// The cell right of every cell whose text equals the anchor.
    RightOf(String),
    /// The cell below every cell whose text equals the anchor.
    Below(String),
}

impl FillTarget {
    pub fn at(addr: impl Into<CellAddress>) -> Self {
        FillTarget::At(addr.into())
    }

    pub fn right_of(anchor: impl Into<String>) -> Self {
        FillTarget::RightOf(anchor.into())
    }

    pub fn below(anchor: impl Into<String>) -> Self {
        FillTarget::Below(anchor.into())
    }
}

impl From<CellAddress> for FillTarget {
    fn from(addr: CellAddress) -> Self {
        FillTarget::At(addr)
    }
}

/// How many anchor matches an anchor fill uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    First,
}

/// Options for [`fill_text`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextStyle {
    pub font: FontStyle,
    pub h_align: Option<HorizontalAlignment>,
    pub v_align: Option<VerticalAlignment>,
    pub match_mode: MatchMode,
}

/// Options for [`fill_image`]. Sizes are in points.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Derive the missing dimension from the image's aspect ratio.
    pub maintain_ratio: bool,
    pub h_align: Option<HorizontalAlignment>,
    pub v_align: Option<VerticalAlignment>,
    pub match_mode: MatchMode,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            maintain_ratio: true,
            h_align: None,
            v_align: None,
            match_mode: MatchMode::All,
        }
    }
}

/// Options for [`fill_date`].
#[derive(Debug, Clone, PartialEq)]
pub struct DateStyle {
    /// Font of the numeric runs; separators always use the date separator font.
    pub font_name: String,
    pub font_size: f64,
    pub h_align: Option<HorizontalAlignment>,
    pub v_align: Option<VerticalAlignment>,
    pub match_mode: MatchMode,
}

impl Default for DateStyle {
    fn default() -> Self {
        Self {
            font_name: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            h_align: None,
            v_align: None,
            match_mode: MatchMode::All,
        }
    }
}

/// Where an image comes from.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

/// Resolves a target to concrete, existing cell addresses.
pub fn resolve_target_cells(
    doc: &Document,
    target: &FillTarget,
    mode: MatchMode,
) -> Result<Vec<CellAddress>> {
    match target {
        FillTarget::At(addr) if addr.is_wildcard() => {
            let cells = get_cell_addresses(doc, *addr);
            if cells.is_empty() {
                return Err(DocxError::Position(format!("no cells match {}", addr)));
            }
            Ok(cells)
        }
        FillTarget::At(addr) => {
            get_cell(doc, *addr)?;
            Ok(vec![*addr])
        }
        FillTarget::RightOf(anchor) | FillTarget::Below(anchor) => {
            let mut found = find_text(doc, anchor);
            if found.is_empty() {
                return Err(DocxError::Position(format!("text not found: {}", anchor)));
            }
            if mode == MatchMode::First {
                found.truncate(1);
            }
            let right = matches!(target, FillTarget::RightOf(_));
            found
                .into_iter()
                .map(|addr| {
                    let neighbour = if right { addr.right() } else { addr.below() };
                    get_cell(doc, neighbour).map(|_| neighbour).map_err(|_| {
                        DocxError::Position(format!(
                            "no cell {} of '{}' at {}: cell {} does not exist",
                            if right { "right" } else { "below" },
                            anchor,
                            addr,
                            neighbour
                        ))
                    })
                })
                .collect()
        }
    }
}

fn write_styled_text(cell: &mut CellMut<'_>, value: &str, style: &TextStyle) {
    cell.clear_paragraphs();
    let mut para = cell.add_paragraph();
    apply_font_style(&mut para.append_text(value), &style.font);
    if let Some(h) = style.h_align {
        apply_paragraph_alignment(&mut para, h);
    }
    if let Some(v) = style.v_align {
        apply_cell_alignment(cell, v);
    }
}

/// Replaces the content of the target cell(s) with one styled run of `value`.
#[instrument(skip(doc, style), level = "debug")]
pub fn fill_text(
    doc: &mut Document,
    target: &FillTarget,
    value: &str,
    style: &TextStyle,
) -> Result<usize> {
    let cells = resolve_target_cells(doc, target, style.match_mode)?;
    for addr in &cells {
        write_styled_text(&mut get_cell_mut(doc, *addr)?, value, style);
    }
    debug!("Filled text into {} cells", cells.len());
    Ok(cells.len())
}

/// Final size in points for an image with the given natural size.
pub(crate) fn image_size(natural: (f64, f64), opts: &ImageOptions) -> (f64, f64) {
    let (ow, oh) = natural;
    let scalable = opts.maintain_ratio && ow > 0.0 && oh > 0.0;
    match (opts.width, opts.height) {
        (Some(w), Some(h)) => (w, h),
        (None, Some(h)) => (if scalable { ow * h / oh } else { ow }, h),
        (Some(w), None) => (w, if scalable { oh * w / ow } else { oh }),
        (None, None) => (ow, oh),
    }
}

/// Replaces the content of the target cell(s) with an inline picture.
#[instrument(skip(doc, source, opts), level = "debug")]
pub fn fill_image(
    doc: &mut Document,
    target: &FillTarget,
    source: ImageSource<'_>,
    opts: &ImageOptions,
) -> Result<usize> {
    let owned;
    let bytes = match source {
        ImageSource::Path(path) => {
            if !path.exists() {
                return Err(DocxError::Fill(format!(
                    "image file not found: {}",
                    path.display()
                )));
            }
            owned = std::fs::read(path).map_err(|e| {
                DocxError::Fill(format!("failed to read image {}: {}", path.display(), e))
            })?;
            owned.as_slice()
        }
        ImageSource::Bytes(bytes) => bytes,
    };

    let cells = resolve_target_cells(doc, target, opts.match_mode)?;
    let image = embed_image(doc, bytes)?;
    let (width, height) = image_size(image.info.natural_size_pt(), opts);

    for addr in &cells {
        let id = doc.next_drawing_id();
        let drawing = inline_drawing(&image, width, height, id)?;
        let mut cell = get_cell_mut(doc, *addr)?;
        cell.clear_paragraphs();
        let mut para = cell.add_paragraph();
        para.append_run(Element::new(W_R).with_child(drawing));
        if let Some(h) = opts.h_align {
            apply_paragraph_alignment(&mut para, h);
        }
        if let Some(v) = opts.v_align {
            apply_cell_alignment(&mut cell, v);
        }
    }
    info!(
        "Filled image {} ({:.1}x{:.1}pt) into {} cells",
        image.file_name,
        width,
        height,
        cells.len()
    );
    Ok(cells.len())
}

/// Writes a `Y年M月D日` date: numbers in the configured font, separators in
/// the date separator font.
#[instrument(skip(doc, style), level = "debug")]
pub fn fill_date(
    doc: &mut Document,
    target: &FillTarget,
    date: &str,
    style: &DateStyle,
) -> Result<usize> {
    validate_date_string(date)?;
    let (numbers, separators) = parse_date_string(date);
    let cells = resolve_target_cells(doc, target, style.match_mode)?;

    let number_font = FontStyle {
        name: style.font_name.clone(),
        size: style.font_size,
        color: DEFAULT_COLOR.to_string(),
        ..FontStyle::default()
    };
    let separator_font = FontStyle {
        name: DATE_SEPARATOR_FONT.to_string(),
        ..number_font.clone()
    };

    for addr in &cells {
        let mut cell = get_cell_mut(doc, *addr)?;
        cell.clear_paragraphs();
        let mut para = cell.add_paragraph();
        for (num, sep) in numbers.iter().zip(&separators) {
            apply_font_style(&mut para.append_text(num), &number_font);
            apply_font_style(&mut para.append_text(sep), &separator_font);
        }
        if let Some(h) = style.h_align {
            apply_paragraph_alignment(&mut para, h);
        }
        if let Some(v) = style.v_align {
            apply_cell_alignment(&mut cell, v);
        }
    }
    Ok(cells.len())
}

/// Writes `data[i][j]` as plain text to `(s, t, r + i, c + j)`.
///
/// Cells are written in row-major order; hitting a cell outside the table
/// stops with a position error.
#[instrument(skip(doc, data), level = "debug")]
pub fn fill_grid<S: AsRef<str>>(
    doc: &mut Document,
    data: &[Vec<S>],
    origin: CellAddress,
) -> Result<()> {
    for (i, row) in data.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let addr = origin.offset(i, j);
            let mut cell = get_cell_mut(doc, addr).map_err(|_| {
                DocxError::Position(format!("data exceeds table bounds: cannot fill {}", addr))
            })?;
            cell.clear_paragraphs();
            cell.add_paragraph().append_text(value.as_ref());
        }
    }
    Ok(())
}

/// Replaces every occurrence of `old` with `new` in the body, headers and
/// footers. Matches may span several runs; the run holding the start of a
/// match receives the replacement. Returns the number of occurrences.
#[instrument(skip(doc), level = "debug")]
pub fn replace_all(doc: &mut Document, old: &str, new: &str) -> Result<usize> {
    if old.is_empty() {
        return Err(DocxError::Fill("text to replace must not be empty".to_string()));
    }
    let mut count = replace_in_tree(doc.body_mut(), old, new, true);

    let main_part = doc.main_part_name().to_string();
    let rels = main_relationships(doc)?;
    for rel in rels.iter().filter(|r| {
        !r.external
            && (r.rel_type.ends_with(REL_HEADER_SUFFIX) || r.rel_type.ends_with(REL_FOOTER_SUFFIX))
    }) {
        let part = resolve_target(&main_part, &rel.target);
        let Some(mut xml) = doc.package().xml_part(&part)? else {
            continue;
        };
        let replaced = replace_in_tree(&mut xml.root, old, new, true);
        if replaced > 0 {
            doc.package_mut().set_part(&part, xml.to_bytes());
            count += replaced;
        }
    }
    debug!("Replaced {} occurrences", count);
    Ok(count)
}

/// Replaces in every paragraph under `el`. Paragraphs inside `mc:Fallback`
/// are rewritten to stay in sync with their `mc:Choice` rendition but are
/// not counted.
fn replace_in_tree(el: &mut Element, old: &str, new: &str, counted: bool) -> usize {
    let mut count = 0;
    if el.name == W_P {
        let replaced = replace_in_paragraph(el, old, new);
        if counted {
            count += replaced;
        }
    }
    for child in el.elements_mut() {
        let counted = counted && child.name != MC_FALLBACK;
        count += replace_in_tree(child, old, new, counted);
    }
    count
}

/// Start offsets of non-overlapping occurrences of `old` that lie entirely
/// inside writable segments.
fn writable_matches(joined: &str, bounds: &[(usize, usize, bool)], old: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut pos = 0;
    while let Some(found) = joined[pos..].find(old) {
        let start = pos + found;
        let end = start + old.len();
        let crosses_marker = bounds
            .iter()
            .any(|&(s, e, writable)| !writable && s < end && start < e);
        if crosses_marker {
            pos = start + joined[start..].chars().next().map_or(1, char::len_utf8);
        } else {
            starts.push(start);
            pos = end;
        }
    }
    starts
}

fn replace_in_paragraph(p: &mut Element, old: &str, new: &str) -> usize {
    let segments = text_segments(p);
    let joined: String = segments.iter().map(|s| s.text.as_str()).collect();

    let mut bounds = Vec::with_capacity(segments.len());
    let mut pos = 0;
    for s in &segments {
        bounds.push((pos, pos + s.text.len(), s.writable));
        pos += s.text.len();
    }

    let starts = writable_matches(&joined, &bounds, old);
    if starts.is_empty() {
        return 0;
    }

    let mut out = vec![String::new(); segments.len()];
    let copy = |out: &mut Vec<String>, from: usize, to: usize| {
        for (i, &(s, e, _)) in bounds.iter().enumerate() {
            let (lo, hi) = (from.max(s), to.min(e));
            if lo < hi {
                out[i].push_str(&joined[lo..hi]);
            }
        }
    };

    let mut cursor = 0;
    for &start in &starts {
        copy(&mut out, cursor, start);
        if let Some(seg) = bounds.iter().position(|&(s, e, _)| start >= s && start < e) {
            out[seg].push_str(new);
        }
        cursor = start + old.len();
    }
    copy(&mut out, cursor, joined.len());

    write_text_segments(p, &mut out.into_iter());
    starts.len()
}

/// Empties a cell, leaving a single empty paragraph.
#[instrument(skip(doc), level = "debug")]
pub fn clear_cell(doc: &mut Document, addr: CellAddress) -> Result<()> {
    let mut cell = get_cell_mut(doc, addr)
        .map_err(|e| DocxError::Fill(format!("failed to clear cell: {}", e)))?;
    cell.clear_paragraphs();
    cell.add_paragraph();
    Ok(())
}
