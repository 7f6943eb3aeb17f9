//! Implementations of the CLI subcommands.
//!
//! Each command writes its report to `out` and returns the process exit code.
//! Expected failures (missing files, invalid input) are reported on `out`
//! with exit code 1; unexpected ones propagate as errors.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use docxlib_core::constants::{
    DEFAULT_COLOR, DEFAULT_FONT, DEFAULT_FONT_SIZE, FILL_MODES, SUPPORTED_IMAGE_FORMATS,
};
use docxlib_core::{
    ensure_directory, extract_template_vars, fill_template, get_section_count,
    get_section_table_count, get_table_dimensions, is_valid_docx_path, load_docx, parse_json,
    save_docx, to_pdf_file, FileFormat, LibreOfficeRenderer, MissingVarAction, TemplateOptions,
    VERSION,
};
use serde_json::json;
use tracing::{debug, info};

use crate::config::RenderArgs;

const RULE: &str = "==================================================";

fn file_missing(out: &mut dyn Write, label: &str, path: &Path) -> Result<ExitCode> {
    writeln!(out, "Error: {} not found: {}", label, path.display())?;
    Ok(ExitCode::FAILURE)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn version(out: &mut dyn Write) -> Result<ExitCode> {
    writeln!(out, "docxlib version {}", VERSION)?;
    Ok(ExitCode::SUCCESS)
}

pub fn info(out: &mut dyn Write) -> Result<ExitCode> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "docxlib Information")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Version: {}", VERSION)?;
    writeln!(out, "Default Font: {}", DEFAULT_FONT)?;
    writeln!(out, "Default Font Size: {}", DEFAULT_FONT_SIZE)?;
    writeln!(out, "Default Color: {}", DEFAULT_COLOR)?;
    writeln!(
        out,
        "Supported Image Formats: {}",
        SUPPORTED_IMAGE_FORMATS.join(", ")
    )?;
    writeln!(out, "Fill Modes: {}", FILL_MODES.join(", "))?;
    writeln!(out, "{}", RULE)?;
    Ok(ExitCode::SUCCESS)
}

pub fn validate(out: &mut dyn Write, file: &Path) -> Result<ExitCode> {
    if !file.exists() {
        return file_missing(out, "File", file);
    }
    if is_valid_docx_path(file) {
        writeln!(out, "[OK] {} is a valid DOCX file", file.display())?;
        Ok(ExitCode::SUCCESS)
    } else {
        writeln!(out, "[FAIL] {} is NOT a valid DOCX file", file.display())?;
        Ok(ExitCode::FAILURE)
    }
}

pub fn inspect(out: &mut dyn Write, file: &Path) -> Result<ExitCode> {
    if !file.exists() {
        return file_missing(out, "File", file);
    }
    let doc = load_docx(file).with_context(|| format!("Failed to load {}", file.display()))?;

    writeln!(out, "{}", RULE)?;
    writeln!(out, "Document: {}", file_name(file))?;
    writeln!(out, "{}", RULE)?;
    let sections = get_section_count(&doc);
    writeln!(out, "Sections: {}", sections)?;
    for s in 1..=sections {
        writeln!(out, "\nSection {}:", s)?;
        writeln!(out, "------------------------------")?;
        let tables = get_section_table_count(&doc, s)?;
        writeln!(out, "  Tables: {}", tables)?;
        for t in 1..=tables {
            let (rows, cols) = get_table_dimensions(&doc, s, t)?;
            writeln!(out, "    Table {}: {} rows x {} cols", t, rows, cols)?;
        }
    }
    writeln!(out, "{}", RULE)?;
    Ok(ExitCode::SUCCESS)
}

pub fn extract_vars(out: &mut dyn Write, file: &Path, output: Option<&Path>) -> Result<ExitCode> {
    if !file.exists() {
        return file_missing(out, "File", file);
    }
    let doc = load_docx(file).with_context(|| format!("Failed to load {}", file.display()))?;
    let vars = extract_template_vars(&doc, &TemplateOptions::default(), true)?;

    writeln!(out, "{}", RULE)?;
    writeln!(out, "Template: {}", file_name(file))?;
    writeln!(out, "Found {} variables:", vars.len())?;
    writeln!(out, "{}", RULE)?;
    for var in &vars {
        writeln!(out, "  - {}", var)?;
    }
    writeln!(out, "{}", RULE)?;

    if let Some(path) = output {
        ensure_directory(path)?;
        let body = serde_json::to_string_pretty(&json!({ "variables": vars }))?;
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writeln!(out, "Variables saved to: {}", path.display())?;
    }
    Ok(ExitCode::SUCCESS)
}

/// `<dir>/<stem>_filled.<ext>` next to the template.
fn default_fill_output(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = template
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "docx".to_string());
    template.with_file_name(format!("{}_filled.{}", stem, ext))
}

pub fn fill(
    out: &mut dyn Write,
    template: &Path,
    data: &Path,
    output: Option<&Path>,
    missing: MissingVarAction,
) -> Result<ExitCode> {
    if !template.exists() {
        return file_missing(out, "Template file", template);
    }
    if !data.exists() {
        return file_missing(out, "Data file", data);
    }
    let is_json = data
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        writeln!(
            out,
            "Error: Unsupported data format: {}",
            data.extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default()
        )?;
        return Ok(ExitCode::FAILURE);
    }

    let mut doc =
        load_docx(template).with_context(|| format!("Failed to load {}", template.display()))?;
    let values = parse_json(data)?;
    let opts = TemplateOptions {
        missing,
        ..TemplateOptions::default()
    };
    let stats = fill_template(&mut doc, &values, &opts)?;
    debug!("Fill stats: {:?}", stats);

    writeln!(out, "{}", RULE)?;
    writeln!(out, "Template Fill Result:")?;
    writeln!(out, "  Total variables: {}", stats.total)?;
    writeln!(out, "  Replaced: {}", stats.replaced)?;
    if !stats.missing.is_empty() {
        writeln!(out, "  Missing: {}", stats.missing.join(", "))?;
    }
    writeln!(out, "{}", RULE)?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_fill_output(template));
    save_docx(&doc, &output)?;
    writeln!(out, "Document saved to: {}", output.display())?;
    Ok(ExitCode::SUCCESS)
}

pub fn convert(
    out: &mut dyn Write,
    input: &Path,
    format: Option<&str>,
    output: Option<&Path>,
    render: &RenderArgs,
) -> Result<ExitCode> {
    if !input.exists() {
        return file_missing(out, "Input file", input);
    }

    let format = match (format, output) {
        (Some(f), _) => f.to_lowercase(),
        (None, Some(path)) => path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default(),
        (None, None) => {
            writeln!(out, "Error: Must specify either --format or --output")?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let pdf_ext = FileFormat::Pdf.extension().trim_start_matches('.');
    if format != pdf_ext {
        writeln!(out, "Error: Unsupported format: {}", format)?;
        return Ok(ExitCode::FAILURE);
    }

    let doc = load_docx(input).with_context(|| format!("Failed to load {}", input.display()))?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension(pdf_ext));

    writeln!(out, "Converting {} to {}...", file_name(input), format.to_uppercase())?;
    let renderer = LibreOfficeRenderer::new(render.render_config());
    info!("Rendering with {}", render.soffice.display());
    to_pdf_file(&doc, &output, &renderer)?;
    writeln!(out, "Document saved to: {}", output.display())?;
    Ok(ExitCode::SUCCESS)
}
