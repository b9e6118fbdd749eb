//! Built-in functions
//!
//! Only what address-building expressions need: `ROW()`, `COLUMN()`, `SUM`
//! and `VLOOKUP`. Any other name is an unknown function.

pub mod lookup;
pub mod math;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

/// Function implementation signature.
///
/// The context carries the cell holding the formula, which `ROW()` and
/// `COLUMN()` report on.
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions
    pub max_args: Option<usize>,
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Reject a call with too few or too many arguments
    pub fn check_arity(&self, given: usize) -> FormulaResult<()> {
        let expected = if given < self.min_args {
            format!("at least {}", self.min_args)
        } else {
            match self.max_args {
                Some(max) if given > max => format!("at most {}", max),
                _ => return Ok(()),
            }
        };
        Err(FormulaError::ArgumentCount {
            function: self.name.to_string(),
            expected,
            actual: given,
        })
    }
}

static BUILTINS: [FunctionDef; 4] = [
    FunctionDef {
        name: "SUM",
        min_args: 1,
        max_args: None,
        implementation: math::fn_sum,
    },
    // ROW() and COLUMN() only answer for the context cell
    FunctionDef {
        name: "ROW",
        min_args: 0,
        max_args: Some(0),
        implementation: lookup::fn_row,
    },
    FunctionDef {
        name: "COLUMN",
        min_args: 0,
        max_args: Some(0),
        implementation: lookup::fn_column,
    },
    // range_lookup is accepted; matching is always exact
    FunctionDef {
        name: "VLOOKUP",
        min_args: 3,
        max_args: Some(4),
        implementation: lookup::fn_vlookup,
    },
];

/// Find a built-in by name, ignoring case
pub fn builtin(name: &str) -> Option<&'static FunctionDef> {
    BUILTINS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}
