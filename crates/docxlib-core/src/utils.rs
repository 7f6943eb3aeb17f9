//! File checks and data loading helpers.

use std::io::Cursor;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{DocxError, Result};

const REQUIRED_ENTRIES: [&str; 2] = ["[Content_Types].xml", "word/document.xml"];

/// Whether `bytes` is a zip archive holding a content-types or main document entry.
pub fn is_valid_docx_bytes(bytes: &[u8]) -> bool {
    let Ok(archive) = ZipArchive::new(Cursor::new(bytes)) else {
        return false;
    };
    let mut names = archive.file_names();
    names.any(|name| REQUIRED_ENTRIES.contains(&name))
}

/// Like [`is_valid_docx_bytes`], additionally requiring a `.docx`/`.dotx` extension.
pub fn is_valid_docx_path(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx") || e.eq_ignore_ascii_case("dotx"));
    if !ext_ok || !path.is_file() {
        return false;
    }
    std::fs::read(path)
        .map(|bytes| is_valid_docx_bytes(&bytes))
        .unwrap_or(false)
}

pub fn validate_docx_path(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if is_valid_docx_path(path) {
        Ok(())
    } else {
        Err(DocxError::Validation(format!(
            "'{}' is not a valid DOCX file",
            path.display()
        )))
    }
}

pub fn validate_docx_bytes(bytes: &[u8]) -> Result<()> {
    if is_valid_docx_bytes(bytes) {
        Ok(())
    } else {
        Err(DocxError::Validation(
            "byte data is not a valid DOCX file".to_string(),
        ))
    }
}

/// Reads a UTF-8 CSV file (BOM tolerated) into rows of strings.
///
/// No header row is assumed and rows may have different lengths.
pub fn parse_csv(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let content = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            DocxError::Validation(format!("malformed CSV in {}: {}", path.display(), e))
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!("Parsed {} CSV rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Reads a JSON file whose top level is an object.
pub fn parse_json(path: impl AsRef<Path>) -> Result<Map<String, Value>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        DocxError::Validation(format!("malformed JSON in {}: {}", path.display(), e))
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DocxError::Validation(format!(
            "{} does not contain a JSON object",
            path.display()
        ))),
    }
}

/// Creates the parent of a file path (one with an extension), or the
/// directory itself otherwise.
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dir = if path.extension().is_some() {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(()),
        }
    } else {
        path
    };
    std::fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::docx_from_body;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_docx_validity() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("a.docx");
        std::fs::write(&good, docx_from_body("")).unwrap();
        let wrong_ext = dir.path().join("a.txt");
        std::fs::write(&wrong_ext, docx_from_body("")).unwrap();
        let not_zip = dir.path().join("b.docx");
        std::fs::write(&not_zip, b"hello").unwrap();

        assert!(is_valid_docx_path(&good));
        assert!(!is_valid_docx_path(&wrong_ext));
        assert!(!is_valid_docx_path(&not_zip));
        assert!(!is_valid_docx_path(dir.path().join("missing.docx")));
        assert!(matches!(validate_docx_path(&not_zip), Err(DocxError::Validation(_))));
        assert!(validate_docx_bytes(&docx_from_body("")).is_ok());
        assert!(validate_docx_bytes(b"").is_err());
    }

    #[test]
    fn test_parse_csv_with_bom_and_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "\u{feff}序号,项目,金额\n1,\"设备费, 含税\",50000\n2\n").unwrap();
        let rows = parse_csv(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["序号", "项目", "金额"],
                vec!["1", "设备费, 含税", "50000"],
                vec!["2"],
            ]
        );
    }

    #[test]
    fn test_parse_csv_missing_file() {
        assert!(matches!(parse_csv("/nonexistent/data.csv"), Err(DocxError::Io(_))));
    }

    #[test]
    fn test_parse_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"title": "文档标题", "n": 1}"#).unwrap();
        let map = parse_json(&path).unwrap();
        assert_eq!(map["title"], "文档标题");

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(parse_json(&path), Err(DocxError::Validation(_))));
        std::fs::write(&path, "{broken").unwrap();
        assert!(matches!(parse_json(&path), Err(DocxError::Validation(_))));
        assert!(matches!(parse_json(dir.path().join("none.json")), Err(DocxError::Io(_))));
    }

    #[test]
    fn test_ensure_directory() {
        let dir = TempDir::new().unwrap();
        ensure_directory(dir.path().join("out/docs/report.docx")).unwrap();
        assert!(dir.path().join("out/docs").is_dir());
        assert!(!dir.path().join("out/docs/report.docx").exists());
        ensure_directory(dir.path().join("plain/dir")).unwrap();
        assert!(dir.path().join("plain/dir").is_dir());
    }
}
