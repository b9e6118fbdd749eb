//! Expression tree produced by [`crate::parse_formula`]

use sheet_lineage_core::{CellAddress, CellError, CellRange};

#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    Cell(CellReference),
    Range(RangeReference),
    /// A bare word that is neither a cell nor a call; defined names end up
    /// here and cannot be evaluated
    Name(String),
    Binary {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    Negate(Box<FormulaExpr>),
    /// Postfix `%`
    Percent(Box<FormulaExpr>),
    /// Function call; `name` is upper-cased
    Call {
        name: String,
        args: Vec<FormulaExpr>,
    },
}

impl FormulaExpr {
    pub(crate) fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> Self {
        FormulaExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// A single cell, optionally sheet-qualified.
///
/// The sheet is kept as written with quotes removed. A sheet part that
/// carries a `[book]` prefix points into another workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub sheet: Option<String>,
    pub address: CellAddress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub sheet: Option<String>,
    pub range: CellRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
}

impl BinaryOperator {
    /// Binding strength, higher binds tighter: comparison, `&`, `+ -`,
    /// `* /`, `^`
    pub fn precedence(self) -> u8 {
        use BinaryOperator::*;
        match self {
            Eq | Ne | Lt | Le | Gt | Ge => 1,
            Concat => 2,
            Add | Sub => 3,
            Mul | Div => 4,
            Pow => 5,
        }
    }

    pub fn is_right_associative(self) -> bool {
        self == BinaryOperator::Pow
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 1
    }
}
