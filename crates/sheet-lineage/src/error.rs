//! Error types for sheet-lineage

use sheet_lineage_core::{CellKey, ReadError};
use thiserror::Error;

/// Result type alias using [`ExplodeError`]
pub type Result<T> = std::result::Result<T, ExplodeError>;

/// Failures that abort a whole explosion.
///
/// Everything that goes wrong below the root (unreadable cells, cycles, the
/// depth limit, unknown link indices) is recorded in the tree instead.
#[derive(Debug, Error)]
pub enum ExplodeError {
    /// The root cell address could not be parsed
    #[error(transparent)]
    Core(#[from] sheet_lineage_core::Error),

    /// The root cell itself could not be read
    #[error("Cannot read root cell {cell}: {source}")]
    RootUnreadable {
        cell: CellKey,
        #[source]
        source: ReadError,
    },
}
