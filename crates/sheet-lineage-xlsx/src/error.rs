//! XLSX error types

use std::io;
use std::path::Path;

use sheet_lineage_core::ReadError;
use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] sheet_lineage_core::Error),
}

impl XlsxError {
    /// Convert into the store-level error for `workbook`
    pub fn into_read_error(self, workbook: &Path) -> ReadError {
        match self {
            XlsxError::Io(e) if e.kind() == io::ErrorKind::NotFound => {
                ReadError::WorkbookNotFound(workbook.to_path_buf())
            }
            XlsxError::Io(e) => ReadError::Io(e.to_string()),
            other => ReadError::InvalidWorkbook {
                workbook: workbook.to_path_buf(),
                message: other.to_string(),
            },
        }
    }
}
