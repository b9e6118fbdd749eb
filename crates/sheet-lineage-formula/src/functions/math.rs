//! Math functions

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};

/// SUM - numbers and numeric cells of ranges; text, blanks and errors
/// inside ranges are skipped
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut sum = 0.0;

    for arg in args {
        match arg {
            FormulaValue::Number(n) => sum += n,
            FormulaValue::Boolean(b) => sum += if *b { 1.0 } else { 0.0 },
            FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
            FormulaValue::Array(arr) => {
                for cell in arr.iter().flatten() {
                    if let FormulaValue::Number(n) = cell {
                        sum += n;
                    }
                }
            }
            _ => {}
        }
    }

    Ok(FormulaValue::Number(sum))
}
