//! Fill Word (.docx) templates by table position, anchor text or placeholder.
//!
//! This crate provides:
//! - `Document`: load/save/merge/copy of .docx packages, keeping every part intact
//! - Cell addressing by 1-indexed `(section, table, row, col)` with `0` as "all"
//! - Text, image, date and grid fills, either at an address or next to an anchor
//! - `${name}` / `${name|default}` template substitution
//! - PDF and page-image conversion through a pluggable `Renderer`
//!
//! ```no_run
//! use docxlib_core::{fill_text, load_docx, save_docx, FillTarget, TextStyle};
//!
//! let mut doc = load_docx("form.docx")?;
//! fill_text(&mut doc, &FillTarget::right_of("姓名"), "张三", &TextStyle::default())?;
//! save_docx(&doc, "out/form_filled.docx")?;
//! # Ok::<(), docxlib_core::DocxError>(())
//! ```

pub mod constants;
pub mod convert;
pub mod date;
pub mod document;
pub mod error;
pub mod fill;
mod media;
pub mod package;
pub mod style;
pub mod table;
pub mod template;
pub mod utils;
pub mod wml;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_support;

pub use constants::FileFormat;
pub use convert::{to_images, to_pdf, to_pdf_file, LibreOfficeRenderer, RenderConfig, Renderer};
pub use date::{parse_date_string, validate_date_string};
pub use document::{copy_doc, load_docx, load_docx_bytes, merge_docs, save_docx, Document};
pub use error::{DocxError, Result};
pub use fill::{
    clear_cell, fill_date, fill_grid, fill_image, fill_text, replace_all, resolve_target_cells,
    DateStyle, FillTarget, ImageOptions, ImageSource, MatchMode, TextStyle,
};
pub use style::{
    apply_cell_alignment, apply_font_style, apply_paragraph_alignment, parse_color,
    set_cell_border, BorderStyle, FontStyle, HorizontalAlignment, Rgb, VerticalAlignment,
};
pub use table::{
    find_text, get_cell, get_cell_addresses, get_cell_mut, get_cell_text, get_cells,
    get_section_count, get_section_table_count, get_table_column_text, get_table_dimensions,
    get_table_row_text, get_table_text, iterate_cells, CellAddress,
};
pub use template::{
    extract_template_vars, fill_template, validate_template_data, MissingVarAction,
    TemplateOptions, TemplateStats, TemplateValidation,
};
pub use utils::{
    ensure_directory, is_valid_docx_bytes, is_valid_docx_path, parse_csv, parse_json,
    validate_docx_bytes, validate_docx_path,
};
pub use wml::{Cell, CellMut, ParagraphMut, RunMut};

/// Library version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
