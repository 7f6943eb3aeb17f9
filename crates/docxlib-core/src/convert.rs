//! PDF and page-image conversion through an external renderer.
//!
//! Layout is never computed here. A [`Renderer`] takes serialised .docx bytes
//! and hands back PDF bytes or one PNG per page; [`LibreOfficeRenderer`] does
//! this with `soffice` and poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::document::Document;
use crate::error::{DocxError, Result};

/// Turns .docx bytes into rendered output.
pub trait Renderer {
    fn render_pdf(&self, docx: &[u8]) -> Result<Vec<u8>>;

    /// One PNG per page, in page order.
    fn render_pages(&self, docx: &[u8]) -> Result<Vec<Vec<u8>>>;
}

/// Locations of the external tools and the rasterisation resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub soffice_path: PathBuf,
    pub pdftoppm_path: PathBuf,
    pub dpi: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            soffice_path: PathBuf::from("soffice"),
            pdftoppm_path: PathBuf::from("pdftoppm"),
            dpi: 150,
        }
    }
}

/// Renders with a headless LibreOffice.
#[derive(Debug, Clone, Default)]
pub struct LibreOfficeRenderer {
    config: RenderConfig,
}

impl LibreOfficeRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Writes the document into `dir` and converts it; returns the PDF path.
    fn convert_in(&self, dir: &Path, docx: &[u8]) -> Result<PathBuf> {
        let input = dir.join("document.docx");
        std::fs::write(&input, docx)?;

        let output = run(
            Command::new(&self.config.soffice_path)
                .arg("--headless")
                .arg("--convert-to")
                .arg("pdf")
                .arg("--outdir")
                .arg(dir)
                .arg(&input),
            &self.config.soffice_path,
        )?;
        debug!("soffice: {}", String::from_utf8_lossy(&output.stdout).trim());

        let pdf = dir.join("document.pdf");
        if !pdf.exists() {
            return Err(DocxError::Document(format!(
                "PDF conversion produced no output: {}",
                failure_detail(&output)
            )));
        }
        Ok(pdf)
    }
}

fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = stderr.trim();
    if detail.is_empty() {
        stdout.trim().to_string()
    } else {
        detail.to_string()
    }
}

fn run(cmd: &mut Command, program: &Path) -> Result<Output> {
    let output = cmd.output().map_err(|e| {
        DocxError::Document(format!("failed to run {}: {}", program.display(), e))
    })?;
    if !output.status.success() {
        return Err(DocxError::Document(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            failure_detail(&output)
        )));
    }
    Ok(output)
}

/// Page number of a `page-<n>.png` file written by pdftoppm.
fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit('-').next()?.parse().ok()
}

impl Renderer for LibreOfficeRenderer {
    #[instrument(skip_all, level = "debug")]
    fn render_pdf(&self, docx: &[u8]) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let pdf = self.convert_in(dir.path(), docx)?;
        Ok(std::fs::read(pdf)?)
    }

    #[instrument(skip_all, level = "debug")]
    fn render_pages(&self, docx: &[u8]) -> Result<Vec<Vec<u8>>> {
        let dir = tempfile::tempdir()?;
        let pdf = self.convert_in(dir.path(), docx)?;
        let prefix = dir.path().join("page");
        run(
            Command::new(&self.config.pdftoppm_path)
                .arg("-png")
                .arg("-r")
                .arg(self.config.dpi.to_string())
                .arg(&pdf)
                .arg(&prefix),
            &self.config.pdftoppm_path,
        )?;

        let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .filter_map(|p| page_number(&p).map(|n| (n, p)))
            .collect();
        pages.sort_by_key(|(n, _)| *n);
        if pages.is_empty() {
            return Err(DocxError::Document(
                "page rendering produced no images".to_string(),
            ));
        }
        pages
            .into_iter()
            .map(|(_, path)| std::fs::read(path).map_err(DocxError::from))
            .collect()
    }
}

/// Renders `doc` to PDF bytes.
pub fn to_pdf(doc: &Document, renderer: &dyn Renderer) -> Result<Vec<u8>> {
    let pdf = renderer.render_pdf(&doc.to_bytes()?)?;
    debug!("Rendered PDF ({} bytes)", pdf.len());
    Ok(pdf)
}

/// Renders `doc` to a PDF file, creating missing parent directories.
#[instrument(skip_all, fields(path = %path.as_ref().display()), level = "debug")]
pub fn to_pdf_file(doc: &Document, path: impl AsRef<Path>, renderer: &dyn Renderer) -> Result<()> {
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
    let pdf = to_pdf(doc, renderer)?;
    std::fs::write(path, pdf)
        .map_err(|e| DocxError::Document(format!("failed to write {}: {}", path.display(), e)))?;
    info!("Wrote PDF {}", path.display());
    Ok(())
}

/// Renders every page of `doc` as a PNG image.
pub fn to_images(doc: &Document, renderer: &dyn Renderer) -> Result<Vec<Vec<u8>>> {
    let pages = renderer.render_pages(&doc.to_bytes()?)?;
    debug!("Rendered {} pages", pages.len());
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::docx_from_body;
    use std::cell::RefCell;

    /// Records what it was given and answers with canned output.
    #[derive(Default)]
    struct FakeRenderer {
        seen: RefCell<Vec<usize>>,
    }

    impl Renderer for FakeRenderer {
        fn render_pdf(&self, docx: &[u8]) -> Result<Vec<u8>> {
            self.seen.borrow_mut().push(docx.len());
            Ok(b"%PDF-1.7 fake".to_vec())
        }

        fn render_pages(&self, docx: &[u8]) -> Result<Vec<Vec<u8>>> {
            self.seen.borrow_mut().push(docx.len());
            Ok(vec![b"page1".to_vec(), b"page2".to_vec()])
        }
    }

    #[test]
    fn test_to_pdf_file_creates_directories() {
        let doc = Document::from_bytes(&docx_from_body("<w:sectPr/>")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/report.pdf");
        let renderer = FakeRenderer::default();

        to_pdf_file(&doc, &target, &renderer).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.7 fake");
        assert_eq!(renderer.seen.borrow().len(), 1);
        assert!(renderer.seen.borrow()[0] > 0);
    }

    #[test]
    fn test_to_images_keeps_page_order() {
        let doc = Document::from_bytes(&docx_from_body("<w:sectPr/>")).unwrap();
        let pages = to_images(&doc, &FakeRenderer::default()).unwrap();
        assert_eq!(pages, vec![b"page1".to_vec(), b"page2".to_vec()]);
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(Path::new("/tmp/x/page-01.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-12.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/document.png")), None);
    }

    #[test]
    fn test_missing_binary_is_document_error() {
        let renderer = LibreOfficeRenderer::new(RenderConfig {
            soffice_path: PathBuf::from("/nonexistent/soffice"),
            ..RenderConfig::default()
        });
        let err = renderer.render_pdf(b"PK").unwrap_err();
        assert!(matches!(err, DocxError::Document(ref m) if m.contains("/nonexistent/soffice")));
    }
}
