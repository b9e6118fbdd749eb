//! INDIRECT expression resolution
//!
//! The argument of `INDIRECT(...)` builds an address out of text. It is
//! split on `&` into components, each component is classified and resolved
//! on its own, and the resolved texts are concatenated in order:
//!
//! ```text
//! "Sheet" & B5 & "!A1"   with B5 = 2   ->   Sheet2!A1
//! ```

use std::borrow::Cow;

use lazy_regex::{lazy_regex, Lazy, Regex};
use sheet_lineage_core::CellAddress;

use crate::evaluator::{evaluate_text, Evaluation, EvaluationContext, FormulaValue};
use crate::scan::{extract_balanced, find_calls, split_ampersand};

static CELL_REF: Lazy<Regex> = lazy_regex!(r"^\$?[A-Z]{1,3}\$?[0-9]{1,7}$");

static FUNCTION_CALL: Lazy<Regex> = lazy_regex!(r"(?i)^[A-Z][A-Z0-9.]*\s*\(");

/// One `&`-separated piece of an INDIRECT argument
#[derive(Debug, Clone, PartialEq)]
pub enum IndirectComponent {
    /// Quoted text, already unescaped
    StringLiteral(String),
    /// A bare cell reference and the text it resolved to
    CellRef {
        address: CellAddress,
        value: Option<String>,
    },
    /// A function call (full balanced span) and the text it evaluated to
    FunctionCall { text: String, value: Option<String> },
    /// Anything else; never resolved
    RawExpression(String),
}

impl IndirectComponent {
    /// Resolved text, or `None` if this component could not be resolved
    pub fn resolved(&self) -> Option<&str> {
        match self {
            IndirectComponent::StringLiteral(s) => Some(s),
            IndirectComponent::CellRef { value, .. } => value.as_deref(),
            IndirectComponent::FunctionCall { value, .. } => value.as_deref(),
            IndirectComponent::RawExpression(_) => None,
        }
    }

    /// Text contributed to the address: resolved text, or the raw source
    fn rendered(&self) -> Cow<'_, str> {
        if let Some(text) = self.resolved() {
            return Cow::Borrowed(text);
        }
        match self {
            IndirectComponent::CellRef { address, .. } => Cow::Owned(address.to_a1_string()),
            IndirectComponent::FunctionCall { text, .. } => Cow::Borrowed(text),
            IndirectComponent::RawExpression(text) => Cow::Borrowed(text),
            IndirectComponent::StringLiteral(text) => Cow::Borrowed(text),
        }
    }
}

/// Result of resolving one INDIRECT argument
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectResolution {
    /// The argument text as written
    pub expression: String,
    pub components: Vec<IndirectComponent>,
    /// Concatenation of every component; unresolved ones contribute their
    /// source text
    pub address: String,
}

impl IndirectResolution {
    /// Whether every component resolved
    pub fn is_complete(&self) -> bool {
        !self.components.is_empty() && self.components.iter().all(|c| c.resolved().is_some())
    }
}

/// Unescape a quoted literal: `"a""b"` -> `a"b`, `'it''s'` -> `it's`
fn string_literal(part: &str) -> Option<String> {
    for quote in ['"', '\''] {
        if part.len() >= 2 && part.starts_with(quote) && part.ends_with(quote) {
            let inner = &part[1..part.len() - 1];
            let doubled: String = [quote, quote].iter().collect();
            return Some(inner.replace(&doubled, &quote.to_string()));
        }
    }
    None
}

/// Text a resolved value contributes; blanks and errors do not resolve
fn value_text(value: FormulaValue) -> Option<String> {
    match value {
        FormulaValue::Empty | FormulaValue::Error(_) | FormulaValue::Array(_) => None,
        other => Some(other.as_string()),
    }
}

/// Split `text` into unresolved components.
///
/// A function call whose argument list contains `&` is split apart by the
/// naive split; such a call is re-read from `text` as one balanced span and
/// the pieces it swallowed are dropped.
pub fn split_components(text: &str) -> Vec<IndirectComponent> {
    let parts = split_ampersand(text);
    let mut components = Vec::with_capacity(parts.len());
    let mut covered_to = 0;

    for part in &parts {
        if part.start < covered_to {
            continue;
        }

        if let Some(literal) = string_literal(part.text) {
            components.push(IndirectComponent::StringLiteral(literal));
        } else if CELL_REF.is_match(part.text) {
            match CellAddress::parse(part.text) {
                Ok(address) => components.push(IndirectComponent::CellRef {
                    address,
                    value: None,
                }),
                Err(_) => components.push(IndirectComponent::RawExpression(part.text.to_string())),
            }
        } else if let Some(m) = FUNCTION_CALL.find(part.text) {
            let open = part.start + m.end();
            let end = match extract_balanced(text, open) {
                Ok(args) => (open + args.len() + 1).max(part.end()),
                Err(e) => {
                    tracing::warn!(
                        call = part.text,
                        error = %e,
                        "unbalanced call in INDIRECT argument"
                    );
                    part.end()
                }
            };
            // Extend over any piece the call ends inside of
            let end = parts
                .iter()
                .filter(|p| p.start > part.start && p.start < end)
                .map(|p| p.end())
                .fold(end, usize::max);
            covered_to = end;
            components.push(IndirectComponent::FunctionCall {
                text: text[part.start..end].to_string(),
                value: None,
            });
        } else {
            components.push(IndirectComponent::RawExpression(part.text.to_string()));
        }
    }

    components
}

/// Resolve the text inside an `INDIRECT(...)` call.
///
/// `ctx` is the cell holding the INDIRECT formula: bare cell components
/// read from its sheet and `ROW()`/`COLUMN()` answer for it. Resolution
/// never fails; check [`IndirectResolution::is_complete`].
pub fn resolve_indirect(text: &str, ctx: &EvaluationContext) -> IndirectResolution {
    let mut components = split_components(text);

    for component in &mut components {
        match component {
            IndirectComponent::CellRef { address, value } => {
                *value = match ctx.get_cell_value(None, *address) {
                    Ok(v) => value_text(v),
                    Err(e) => {
                        tracing::debug!(cell = %address, error = %e, "INDIRECT cell unreadable");
                        None
                    }
                };
            }
            IndirectComponent::FunctionCall { text, value } => {
                *value = match evaluate_text(text, ctx) {
                    Evaluation::Resolved(v) => value_text(v),
                    Evaluation::Unresolved(_) => None,
                };
            }
            IndirectComponent::StringLiteral(_) | IndirectComponent::RawExpression(_) => {}
        }
    }

    let address: String = components.iter().map(|c| c.rendered()).collect();
    let resolution = IndirectResolution {
        expression: text.to_string(),
        components,
        address,
    };

    if resolution.is_complete() {
        tracing::debug!(
            expression = text,
            address = %resolution.address,
            "resolved INDIRECT"
        );
    } else {
        tracing::warn!(
            expression = text,
            partial = %resolution.address,
            "INDIRECT only partly resolved"
        );
    }
    resolution
}

/// Argument texts of every `INDIRECT(...)` call in `formula`, in order.
///
/// Calls inside string literals are ignored; a call with no closing
/// parenthesis is skipped.
pub fn indirect_arguments(formula: &str) -> Vec<&str> {
    find_calls(formula, "INDIRECT")
        .into_iter()
        .filter_map(|offset| match extract_balanced(formula, offset) {
            Ok(args) => Some(args),
            Err(e) => {
                tracing::warn!(formula, error = %e, "skipping INDIRECT call");
                None
            }
        })
        .collect()
}
