//! Defaults, supported formats and lookup tables shared across the crate.

use phf::phf_map;

/// Font used for filled text when the caller does not pick one.
pub const DEFAULT_FONT: &str = "仿宋_GB2312";

/// Font size in points.
pub const DEFAULT_FONT_SIZE: f64 = 10.5;

pub const DEFAULT_COLOR: &str = "black";

/// Font used for the 年/月/日 separators written by date fills.
pub const DATE_SEPARATOR_FONT: &str = "宋体";

pub const SUPPORTED_IMAGE_FORMATS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".bmp"];

pub const DEFAULT_VAR_PREFIX: &str = "${";
pub const DEFAULT_VAR_SUFFIX: &str = "}";

/// Data key reserved for style overrides; never treated as a template variable.
pub const RESERVED_STYLES_KEY: &str = "__styles__";

/// Named colours accepted by [`crate::style::parse_color`].
pub static COLOR_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "black" => "#000000",
    "red" => "#FF0000",
    "blue" => "#0000FF",
    "green" => "#008000",
    "yellow" => "#FFFF00",
    "white" => "#FFFFFF",
    "gray" => "#808080",
    "silver" => "#C0C0C0",
    "maroon" => "#800000",
    "purple" => "#800080",
    "orange" => "#FFA500",
    "pink" => "#FFC0CB",
};

/// File formats the library reads or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Doc,
    Docx,
    Pdf,
    Png,
    Jpeg,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Doc => ".doc",
            FileFormat::Docx => ".docx",
            FileFormat::Pdf => ".pdf",
            FileFormat::Png => ".png",
            FileFormat::Jpeg => ".jpeg",
        }
    }
}

/// Human-readable names of the fill modes, as reported by the CLI.
pub const FILL_MODES: &[&str] = &["position", "match_right", "match_down"];

// WordprocessingML namespaces and relationship types.
pub(crate) const NS_R: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_WP: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(crate) const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
pub(crate) const NS_PKG_RELS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub(crate) const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub(crate) const REL_TARGET_MODE_EXTERNAL: &str = "External";
