//! # sheet-lineage-xlsx
//!
//! XLSX (Office Open XML) reading for sheet-lineage.
//!
//! [`XlsxReader`] loads a package into a [`sheet_lineage_core::Workbook`];
//! [`XlsxStore`] serves cells and external link tables from files on disk.

pub mod error;
pub mod reader;
pub mod store;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use store::XlsxStore;
