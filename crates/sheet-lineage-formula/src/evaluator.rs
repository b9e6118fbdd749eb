//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`CellStore`]. Only the small function
//! set in [`crate::functions`] is known; anything else fails evaluation and
//! surfaces as [`Evaluation::Unresolved`] through [`evaluate_text`].

use std::cmp::Ordering;
use std::path::Path;

use sheet_lineage_core::{CellAddress, CellError, CellRange, CellStore, CellValue};

use crate::ast::{BinaryOperator, FormulaExpr};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::builtin;
use crate::parser::parse_formula;

/// How many formula cells deep a single evaluation may follow
const MAX_NESTING: usize = 8;

/// Largest range materialized for SUM/VLOOKUP
const MAX_RANGE_CELLS: u64 = 10_000;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Rows of a range
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Numeric coercion: booleans are 1/0, blanks 0, numeric text parses
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(b) => Some(f64::from(u8::from(*b))),
            FormulaValue::String(s) => s.trim().parse().ok(),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Error(_) | FormulaValue::Array(_) => None,
        }
    }

    /// Text coercion, as `&` joins values. Integral numbers print
    /// without a fraction.
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                (*n as i64).to_string()
            }
            FormulaValue::Number(n) => n.to_string(),
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Sort rank across types: numbers, then text, then booleans
    fn type_rank(&self) -> u8 {
        match self {
            FormulaValue::Number(_) | FormulaValue::Empty => 0,
            FormulaValue::String(_) => 1,
            FormulaValue::Boolean(_) => 2,
            FormulaValue::Error(_) => 3,
            FormulaValue::Array(_) => 4,
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::String(s) => FormulaValue::String(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
            CellValue::Formula { cached_value, .. } => {
                cached_value.map_or(FormulaValue::Empty, |v| (*v).into())
            }
        }
    }
}

/// Outcome of evaluating formula text
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Resolved(FormulaValue),
    /// The text could not be evaluated; carries it back unchanged
    Unresolved(String),
}

/// Where an expression is evaluated.
///
/// `cell` is the cell the formula lives in. `ROW()` and `COLUMN()` answer
/// for it and unqualified references resolve on `sheet` of `workbook`.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub store: &'a dyn CellStore,
    pub workbook: &'a Path,
    pub sheet: &'a str,
    pub cell: CellAddress,
    depth: usize,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        store: &'a dyn CellStore,
        workbook: &'a Path,
        sheet: &'a str,
        cell: CellAddress,
    ) -> Self {
        Self {
            store,
            workbook,
            sheet,
            cell,
            depth: 0,
        }
    }

    /// Sheet a reference points at; `[book]` prefixes are not followed
    fn target_sheet<'s>(&'s self, sheet: Option<&'s str>) -> FormulaResult<&'s str> {
        match sheet {
            Some(name) if name.contains('[') => Err(FormulaError::Evaluation(format!(
                "external reference '{}' cannot be evaluated",
                name
            ))),
            Some(name) => Ok(name),
            None => Ok(self.sheet),
        }
    }

    /// Value of one cell.
    ///
    /// A formula cell is evaluated in its own context; if that fails the
    /// result saved with the formula is used instead.
    pub fn get_cell_value(
        &self,
        sheet: Option<&str>,
        addr: CellAddress,
    ) -> FormulaResult<FormulaValue> {
        let sheet = self.target_sheet(sheet)?;
        let record = self.store.read_cell(self.workbook, sheet, addr)?;

        let computed = record
            .formula_text()
            .filter(|_| self.depth < MAX_NESTING)
            .and_then(|formula| {
                let inner = EvaluationContext {
                    sheet,
                    cell: addr,
                    depth: self.depth + 1,
                    ..*self
                };
                match evaluate_text(formula, &inner) {
                    Evaluation::Resolved(value) => Some(value),
                    Evaluation::Unresolved(_) => None,
                }
            });

        Ok(computed.unwrap_or_else(|| record.calculated_value.into()))
    }

    /// Values of a range as rows
    pub fn get_range_values(
        &self,
        sheet: Option<&str>,
        range: &CellRange,
    ) -> FormulaResult<FormulaValue> {
        if range.cell_count() > MAX_RANGE_CELLS {
            return Err(FormulaError::Evaluation(format!(
                "range {} is too large to evaluate",
                range
            )));
        }

        let rows = range
            .rows()
            .map(|row| {
                row.map(|addr| self.get_cell_value(sheet, addr))
                    .collect::<FormulaResult<Vec<_>>>()
            })
            .collect::<FormulaResult<Vec<_>>>()?;

        Ok(FormulaValue::Array(rows))
    }
}

/// Parse and evaluate `text` in `ctx`.
///
/// Never fails: text that does not parse, names an unknown function or hits
/// an unreadable cell comes back as [`Evaluation::Unresolved`].
pub fn evaluate_text(text: &str, ctx: &EvaluationContext) -> Evaluation {
    match parse_formula(text).and_then(|ast| evaluate(&ast, ctx)) {
        Ok(value) => Evaluation::Resolved(value),
        Err(e) => {
            tracing::debug!(text, error = %e, "expression left unresolved");
            Evaluation::Unresolved(text.to_string())
        }
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = match expr {
        FormulaExpr::Number(n) => FormulaValue::Number(*n),
        FormulaExpr::Text(s) => FormulaValue::String(s.clone()),
        FormulaExpr::Boolean(b) => FormulaValue::Boolean(*b),
        FormulaExpr::Error(e) => FormulaValue::Error(*e),
        FormulaExpr::Cell(cell) => ctx.get_cell_value(cell.sheet.as_deref(), cell.address)?,
        FormulaExpr::Range(range) => ctx.get_range_values(range.sheet.as_deref(), &range.range)?,
        FormulaExpr::Name(name) => {
            return Err(FormulaError::Evaluation(format!(
                "defined name '{}' cannot be evaluated",
                name
            )))
        }
        FormulaExpr::Binary { op, left, right } => {
            apply_binary(*op, evaluate(left, ctx)?, evaluate(right, ctx)?)?
        }
        FormulaExpr::Negate(operand) => map_number(evaluate(operand, ctx)?, |n| -n)?,
        FormulaExpr::Percent(operand) => map_number(evaluate(operand, ctx)?, |n| n / 100.0)?,
        FormulaExpr::Call { name, args } => {
            let def = builtin(name).ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
            def.check_arity(args.len())?;
            let values = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<FormulaResult<Vec<_>>>()?;
            (def.implementation)(&values, ctx)?
        }
    };
    Ok(value)
}

fn number_of(value: &FormulaValue) -> FormulaResult<f64> {
    value
        .as_number()
        .ok_or_else(|| FormulaError::Evaluation(format!("expected a number, got {:?}", value)))
}

/// Apply a numeric unary operation; errors pass through
fn map_number(value: FormulaValue, f: impl Fn(f64) -> f64) -> FormulaResult<FormulaValue> {
    match value {
        FormulaValue::Error(e) => Ok(FormulaValue::Error(e)),
        other => Ok(FormulaValue::Number(f(number_of(&other)?))),
    }
}

fn apply_binary(
    op: BinaryOperator,
    left: FormulaValue,
    right: FormulaValue,
) -> FormulaResult<FormulaValue> {
    if let Some(e) = left.get_error().or_else(|| right.get_error()) {
        return Ok(FormulaValue::Error(e));
    }

    if op == BinaryOperator::Concat {
        return Ok(FormulaValue::String(left.as_string() + &right.as_string()));
    }

    if op.is_comparison() {
        let ord = compare_values(&left, &right);
        let holds = match op {
            BinaryOperator::Eq => ord.is_eq(),
            BinaryOperator::Ne => ord.is_ne(),
            BinaryOperator::Lt => ord.is_lt(),
            BinaryOperator::Le => ord.is_le(),
            BinaryOperator::Gt => ord.is_gt(),
            _ => ord.is_ge(),
        };
        return Ok(FormulaValue::Boolean(holds));
    }

    let (x, y) = (number_of(&left)?, number_of(&right)?);
    let value = match op {
        BinaryOperator::Add => FormulaValue::Number(x + y),
        BinaryOperator::Sub => FormulaValue::Number(x - y),
        BinaryOperator::Mul => FormulaValue::Number(x * y),
        BinaryOperator::Div if y == 0.0 => FormulaValue::Error(CellError::Div0),
        BinaryOperator::Div => FormulaValue::Number(x / y),
        _ => match x.powf(y) {
            p if p.is_finite() => FormulaValue::Number(p),
            _ => FormulaValue::Error(CellError::Num),
        },
    };
    Ok(value)
}

/// Order two values: numbers < text < booleans; text ignores case and a
/// blank counts as 0
fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    let as_num = |v: &FormulaValue| match v {
        FormulaValue::Empty => 0.0,
        FormulaValue::Number(n) => *n,
        _ => f64::NAN,
    };
    match (left, right) {
        _ if left.type_rank() != right.type_rank() => left.type_rank().cmp(&right.type_rank()),
        (FormulaValue::String(l), FormulaValue::String(r)) => {
            l.to_lowercase().cmp(&r.to_lowercase())
        }
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => l.cmp(r),
        (FormulaValue::Error(l), FormulaValue::Error(r)) => l.as_str().cmp(r.as_str()),
        (FormulaValue::Array(_), _) => Ordering::Equal,
        _ => as_num(left)
            .partial_cmp(&as_num(right))
            .unwrap_or(Ordering::Equal),
    }
}
