//! # sheet-lineage
//!
//! Trace where a spreadsheet cell's value comes from.
//!
//! Starting from one cell, sheet-lineage reads its formula, finds every
//! cell it references (on the same sheet, other sheets, or other workbook
//! files) and repeats for each of them, producing a dependency tree.
//!
//! ## Features
//!
//! - Relative, sheet-qualified and external (`[Book.xlsx]Sheet!A1`,
//!   `[1]Sheet!A1`) references
//! - `INDIRECT(...)` addresses built from literals, cells, `ROW()`,
//!   `COLUMN()`, `SUM` and `VLOOKUP`
//! - Path-scoped cycle detection and a depth limit
//! - XLSX files on disk (`xlsx` feature) or in-memory workbooks
//! - Serializable trees and summaries (`serde` feature)
//!
//! ## Example
//!
//! ```rust
//! use sheet_lineage::prelude::*;
//! use std::path::Path;
//!
//! let mut workbook = Workbook::new();
//! workbook.add_worksheet_with_name("Rates").unwrap();
//! let sheet = workbook.worksheet_by_name_mut("Sheet1").unwrap();
//! sheet.set_cell_formula("A1", "=Rates!B2*C1").unwrap();
//! sheet.set_cell_value("C1", 100.0).unwrap();
//!
//! let mut store = MemoryStore::new();
//! store.insert("/books/Main.xlsx", workbook);
//!
//! let (tree, summary) =
//!     explode_dependencies(&store, &store, Path::new("/books/Main.xlsx"), "Sheet1", "A1", 10)
//!         .unwrap();
//! let children: Vec<&str> = tree.children.iter().map(|c| c.address.as_str()).collect();
//! assert_eq!(children, vec!["Rates!B2", "Sheet1!C1"]);
//! assert_eq!(summary.total_nodes, 3);
//! ```

pub mod display;
pub mod error;
pub mod explode;
pub mod links;
pub mod node;
pub mod options;
pub mod prelude;
pub mod summary;

pub use display::{display_address, display_formula, DisplayAddress};
pub use error::{ExplodeError, Result};
pub use explode::{explode_dependencies, Exploder, Explosion};
pub use links::ExternalLinkTable;
pub use node::{DependencyNode, NodeKind, NodeType};
pub use options::{ExplodeOptions, DEFAULT_LINK_CANDIDATES};
pub use summary::{CircularReference, ExplosionSummary, UnresolvedIndirect};

// Re-export core types
pub use sheet_lineage_core::{
    CellAddress, CellError, CellKey, CellRecord, CellStore, CellType, CellValue, ExternalLink,
    ExternalLinkSource, MemoryStore, ReadError, Workbook, Worksheet,
};

// Re-export formula types
pub use sheet_lineage_formula::{
    extract_balanced, extract_references, resolve_indirect, split_ampersand,
    EvaluationContext, FormulaValue, IndirectComponent, IndirectResolution, Reference,
    ReferenceKind,
};

#[cfg(feature = "xlsx")]
pub use sheet_lineage_xlsx::{XlsxReader, XlsxStore};

/// Explode a cell of an `.xlsx` file on disk.
///
/// Opens a fresh [`XlsxStore`] for the call, so every workbook touched by
/// the explosion is parsed at most once.
#[cfg(feature = "xlsx")]
pub fn explode_file(
    workbook: &std::path::Path,
    sheet: &str,
    cell: &str,
    options: ExplodeOptions,
) -> Result<Explosion> {
    let cell = CellAddress::parse(cell)?;
    let store = XlsxStore::new();
    Exploder::with_options(&store, &store, options).explode(workbook, sheet, cell)
}
