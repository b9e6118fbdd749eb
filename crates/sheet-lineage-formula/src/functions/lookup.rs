//! Lookup and reference functions

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use sheet_lineage_core::CellError;

fn to_i64_trunc(v: &FormulaValue) -> Option<i64> {
    v.as_number().map(|n| n.trunc() as i64)
}

/// Exact-match equality for VLOOKUP keys.
///
/// Numbers compare numerically; anything else compares as trimmed,
/// case-insensitive text. Blank cells never match.
fn values_equal(needle: &FormulaValue, key: &FormulaValue) -> bool {
    match (needle, key) {
        (FormulaValue::Empty, _) | (_, FormulaValue::Empty) => false,
        (FormulaValue::Array(_), _) | (_, FormulaValue::Array(_)) => false,
        (FormulaValue::Number(x), FormulaValue::Number(y)) => x == y,
        _ => needle
            .as_string()
            .trim()
            .eq_ignore_ascii_case(key.as_string().trim()),
    }
}

/// ROW() - 1-based row of the context cell
pub fn fn_row(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(ctx.cell.row_number() as f64))
}

/// COLUMN() - 1-based column of the context cell (A=1)
pub fn fn_column(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(ctx.cell.column_number() as f64))
}

/// VLOOKUP(lookup_value, table, col_index, [range_lookup])
///
/// Scans the first column of `table` top to bottom. No match yields `#N/A`
/// as a value.
pub fn fn_vlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    for v in args {
        if let FormulaValue::Error(e) = v {
            return Ok(FormulaValue::Error(*e));
        }
    }

    let lookup_value = &args[0];
    if matches!(lookup_value, FormulaValue::Array(_)) {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    let single;
    let table: &[Vec<FormulaValue>] = match &args[1] {
        FormulaValue::Array(rows) => rows,
        other => {
            single = [vec![other.clone()]];
            &single
        }
    };
    let cols = table.iter().map(Vec::len).max().unwrap_or(0);
    if table.is_empty() || cols == 0 {
        return Ok(FormulaValue::Error(CellError::Na));
    }

    let col_index = to_i64_trunc(&args[2]).unwrap_or(0);
    if col_index < 1 {
        return Ok(FormulaValue::Error(CellError::Value));
    }
    let col_index0 = (col_index - 1) as usize;
    if col_index0 >= cols {
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    for row in table {
        let key = row.first().unwrap_or(&FormulaValue::Empty);
        if values_equal(lookup_value, key) {
            return Ok(row.get(col_index0).cloned().unwrap_or(FormulaValue::Empty));
        }
    }

    Ok(FormulaValue::Error(CellError::Na))
}
