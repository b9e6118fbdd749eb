//! # sheet-lineage-core
//!
//! Core data structures for the sheet-lineage dependency tracer.
//!
//! This crate provides the fundamental types used throughout sheet-lineage:
//! - [`CellValue`] - Represents cell values (numbers, strings, booleans, errors, formulas)
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`Workbook`], [`Worksheet`] - In-memory workbook structures
//! - [`CellStore`], [`ExternalLinkSource`] - How the tracer reads workbooks
//!
//! ## Example
//!
//! ```rust
//! use sheet_lineage_core::{CellAddress, CellStore, CellType, MemoryStore, Workbook};
//! use std::path::Path;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_by_name_mut("Sheet1").unwrap();
//! sheet.set_cell_value("A1", 2.0).unwrap();
//! sheet.set_cell_formula("B1", "=A1*10").unwrap();
//!
//! let mut store = MemoryStore::new();
//! store.insert("/books/Main.xlsx", workbook);
//!
//! let record = store
//!     .read_cell(Path::new("/books/Main.xlsx"), "Sheet1", CellAddress::parse("B1").unwrap())
//!     .unwrap();
//! assert_eq!(record.cell_type, CellType::Formula);
//! ```

pub mod cell;
pub mod error;
pub mod path;
pub mod store;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellError, CellRange, CellValue};
pub use error::{Error, ReadError, Result};
pub use store::{
    CellKey, CellRecord, CellStore, CellType, ExternalLink, ExternalLinkSource, MemoryStore,
};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
