//! # sheet-lineage-formula
//!
//! Formula text handling for sheet-lineage.
//!
//! This crate provides:
//! - Quote-aware scanning: balanced-parenthesis extraction, `&` splitting
//! - Reference extraction from raw formula text
//! - A small evaluator (`ROW`, `COLUMN`, `SUM`, `VLOOKUP`, operators)
//! - INDIRECT argument resolution built on the two
//!
//! ## Example
//!
//! ```rust
//! use sheet_lineage_formula::{extract_references, ReferenceKind};
//! use std::path::Path;
//!
//! let refs = extract_references("=Sheet2!A1+B2", Path::new("/books/Main.xlsx"), "Sheet1");
//! assert_eq!(refs.len(), 2);
//! assert_eq!(refs[0].kind, ReferenceKind::LocalAbsolute);
//! assert_eq!(refs[1].sheet, "Sheet1");
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod indirect;
pub mod parser;
pub mod references;
pub mod scan;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_text, Evaluation, EvaluationContext, FormulaValue};
pub use functions::{builtin, FunctionDef};
pub use indirect::{indirect_arguments, resolve_indirect, IndirectComponent, IndirectResolution};
pub use parser::parse_formula;
pub use references::{extract_references, shift_relative_references, Reference, ReferenceKind};
pub use scan::{extract_balanced, split_ampersand};
