//! Colour parsing and run/paragraph/cell formatting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{COLOR_MAP, DEFAULT_COLOR, DEFAULT_FONT, DEFAULT_FONT_SIZE};
use crate::error::DocxError;
use crate::wml::{CellMut, ParagraphMut, RunMut, PPR_ORDER, RPR_ORDER, TCPR_ORDER, TC_BORDERS_ORDER};
use crate::xml::Element;

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// `RRGGBB`, the form WordprocessingML stores colours in.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Parses a colour name (`"red"`) or hex string (`"#FF0000"`, `"ff0000"`).
///
/// Anything unrecognised falls back to black.
pub fn parse_color(s: &str) -> Rgb {
    let s = s.trim().to_lowercase();
    let hex = COLOR_MAP.get(s.as_str()).copied().unwrap_or(s.as_str());
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Rgb::BLACK;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    Rgb {
        r: channel(0),
        g: channel(2),
        b: channel(4),
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl HorizontalAlignment {
    fn jc_value(self) -> &'static str {
        match self {
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Justify => "both",
        }
    }
}

impl FromStr for HorizontalAlignment {
    type Err = DocxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            "justify" => Ok(Self::Justify),
            other => Err(DocxError::Validation(format!(
                "unknown horizontal alignment: {}",
                other
            ))),
        }
    }
}

/// Cell content alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

impl VerticalAlignment {
    fn val(self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }
}

impl FromStr for VerticalAlignment {
    type Err = DocxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" | "middle" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            other => Err(DocxError::Validation(format!(
                "unknown vertical alignment: {}",
                other
            ))),
        }
    }
}

/// Character formatting applied to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontStyle {
    /// Font family; empty leaves the run's font untouched.
    pub name: String,
    /// Size in points; non-positive leaves the size untouched.
    pub size: f64,
    /// Colour name or hex; empty leaves the colour untouched.
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            name: DEFAULT_FONT.to_string(),
            size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR.to_string(),
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

fn val(name: &str, value: impl Into<String>) -> Element {
    Element::new(name).with_attr("w:val", value)
}

/// Writes `font` into the run's `w:rPr`.
pub fn apply_font_style(run: &mut RunMut<'_>, font: &FontStyle) {
    let rpr = run.properties();

    if !font.name.is_empty() {
        let fonts = Element::new("w:rFonts")
            .with_attr("w:ascii", font.name.as_str())
            .with_attr("w:hAnsi", font.name.as_str())
            .with_attr("w:eastAsia", font.name.as_str())
            .with_attr("w:cs", font.name.as_str());
        rpr.replace_child(fonts, RPR_ORDER);
    }

    if font.size > 0.0 {
        let half_points = (font.size * 2.0).round() as u32;
        rpr.replace_child(val("w:sz", half_points.to_string()), RPR_ORDER);
        rpr.replace_child(val("w:szCs", half_points.to_string()), RPR_ORDER);
    }

    if !font.color.is_empty() {
        rpr.replace_child(val("w:color", parse_color(&font.color).to_hex()), RPR_ORDER);
    }

    rpr.remove_children("w:b");
    rpr.remove_children("w:bCs");
    if font.bold {
        rpr.insert_ordered(Element::new("w:b"), RPR_ORDER);
        rpr.insert_ordered(Element::new("w:bCs"), RPR_ORDER);
    }

    rpr.remove_children("w:i");
    rpr.remove_children("w:iCs");
    if font.italic {
        rpr.insert_ordered(Element::new("w:i"), RPR_ORDER);
        rpr.insert_ordered(Element::new("w:iCs"), RPR_ORDER);
    }

    if font.underline {
        rpr.replace_child(val("w:u", "single"), RPR_ORDER);
    }
}

pub fn apply_paragraph_alignment(paragraph: &mut ParagraphMut<'_>, align: HorizontalAlignment) {
    paragraph
        .properties()
        .replace_child(val("w:jc", align.jc_value()), PPR_ORDER);
}

pub fn apply_cell_alignment(cell: &mut CellMut<'_>, align: VerticalAlignment) {
    cell.properties()
        .replace_child(val("w:vAlign", align.val()), TCPR_ORDER);
}

/// Border settings for the four outer edges of a cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BorderStyle {
    /// Colour name or hex.
    pub color: Option<String>,
    /// Line width in points.
    pub width: Option<f64>,
}

const CELL_EDGES: [&str; 4] = ["w:left", "w:right", "w:top", "w:bottom"];

/// Sets colour and/or width on the top, left, bottom and right cell borders.
pub fn set_cell_border(cell: &mut CellMut<'_>, border: &BorderStyle) {
    if border.color.is_none() && border.width.is_none() {
        return;
    }
    let borders = cell
        .properties()
        .child_or_insert("w:tcBorders", TCPR_ORDER);
    for edge in CELL_EDGES {
        let el = borders.child_or_insert(edge, TC_BORDERS_ORDER);
        if el.attr("w:val").is_none() {
            el.set_attr("w:val", "single");
        }
        if let Some(color) = &border.color {
            el.set_attr("w:color", parse_color(color).to_hex());
        }
        if let Some(width) = border.width {
            // Border widths are stored in eighths of a point.
            el.set_attr("w:sz", ((width * 8.0).round() as u32).to_string());
        }
        if el.attr("w:space").is_none() {
            el.set_attr("w:space", "0");
        }
    }
}
