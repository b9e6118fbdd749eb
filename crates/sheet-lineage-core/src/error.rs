//! Error types for sheet-lineage-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sheet-lineage-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),
}

/// Failure to read a cell from a workbook.
///
/// Returned by [`CellStore`](crate::store::CellStore) implementations when the
/// workbook cannot be opened or the requested sheet/cell is not available.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReadError {
    /// The workbook file does not exist
    #[error("Workbook not found: {}", .0.display())]
    WorkbookNotFound(PathBuf),

    /// The workbook exists but has no sheet with this name
    #[error("Sheet '{sheet}' not found in {}", .workbook.display())]
    SheetNotFound { workbook: PathBuf, sheet: String },

    /// The workbook could not be opened or parsed
    #[error("Cannot open {}: {message}", .workbook.display())]
    InvalidWorkbook { workbook: PathBuf, message: String },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        ReadError::Io(e.to_string())
    }
}
