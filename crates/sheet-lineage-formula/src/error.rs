//! Formula error types

use sheet_lineage_core::ReadError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula scanning, parsing or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Text ended before the parenthesis opened before `offset` was closed
    #[error("Unbalanced brackets: no closing parenthesis for group starting at byte {offset}")]
    UnbalancedBrackets { offset: usize },

    /// A reference could not be taken apart
    #[error("Malformed reference: {0}")]
    Extraction(String),

    /// Reading a referenced cell failed
    #[error(transparent)]
    Read(#[from] ReadError),
}
