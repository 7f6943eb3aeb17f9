//! Error types for docxlib operations.

/// Errors raised by document, table, fill and template operations.
#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    /// Loading, saving, merging or converting a document failed.
    #[error("Document error: {0}")]
    Document(String),

    /// A cell/table/section address is out of range or invalid.
    #[error("Position error: {0}")]
    Position(String),

    /// A fill operation could not be carried out.
    #[error("Fill error: {0}")]
    Fill(String),

    /// Input data failed validation (file format, date string, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A template placeholder has no value, no default, and the policy is `Error`.
    #[error("Template variable not found: {name} (available: {})", available.join(", "))]
    VariableNotFound { name: String, available: Vec<String> },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for DocxError {
    fn from(e: quick_xml::Error) -> Self {
        DocxError::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocxError>;
