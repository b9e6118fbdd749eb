//! Quote-aware text scanning over raw formula text
//!
//! These helpers work on the formula string itself rather than on a parsed
//! tree, because they must cope with text the parser would reject (partial
//! expressions, unbalanced calls, unresolved external paths).

use crate::error::{FormulaError, FormulaResult};

/// Tracks whether the scan is inside a `'...'` or `"..."` span.
///
/// Only the character that opened the span can close it, so a `'` inside a
/// double-quoted string is ordinary text.
#[derive(Debug, Default, Clone, Copy)]
struct QuoteState {
    open: Option<char>,
}

impl QuoteState {
    /// Feed one character; returns `true` if it is outside any quoted span
    /// and is not itself a quote delimiter.
    fn feed(&mut self, c: char) -> bool {
        match self.open {
            Some(q) if q == c => {
                self.open = None;
                false
            }
            Some(_) => false,
            None if c == '"' || c == '\'' => {
                self.open = Some(c);
                false
            }
            None => true,
        }
    }
}

/// Return the text between an opening parenthesis and its matching close.
///
/// `offset` is the byte offset just past the opening `(`. Parentheses inside
/// quoted spans are ignored.
///
/// ```
/// use sheet_lineage_formula::scan::extract_balanced;
///
/// let f = r#"=INDIRECT("Sheet"&ROW()&"!A1")+1"#;
/// let start = f.find('(').unwrap() + 1;
/// assert_eq!(extract_balanced(f, start).unwrap(), r#""Sheet"&ROW()&"!A1""#);
/// ```
pub fn extract_balanced(text: &str, offset: usize) -> FormulaResult<&str> {
    let tail = text
        .get(offset..)
        .ok_or(FormulaError::UnbalancedBrackets { offset })?;

    let mut depth = 1usize;
    let mut quotes = QuoteState::default();
    for (i, c) in tail.char_indices() {
        if !quotes.feed(c) {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&tail[..i]);
                }
            }
            _ => {}
        }
    }

    Err(FormulaError::UnbalancedBrackets { offset })
}

/// One piece of an `&`-separated expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part<'a> {
    /// The trimmed text of the piece
    pub text: &'a str,
    /// Byte offset of `text` within the split input
    pub start: usize,
}

impl Part<'_> {
    /// Byte offset just past the end of `text`
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Split on `&` outside quoted spans.
///
/// Pieces are trimmed and empty pieces are dropped, so `"a&b"&C1` gives
/// exactly two parts.
pub fn split_ampersand(text: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut quotes = QuoteState::default();
    let mut piece_start = 0;

    for (i, c) in text.char_indices() {
        if quotes.feed(c) && c == '&' {
            push_trimmed(&mut parts, text, piece_start, i);
            piece_start = i + 1;
        }
    }
    push_trimmed(&mut parts, text, piece_start, text.len());

    parts
}

fn push_trimmed<'a>(parts: &mut Vec<Part<'a>>, text: &'a str, start: usize, end: usize) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    parts.push(Part {
        text: trimmed,
        start: start + lead,
    });
}

/// Blank out the contents of double-quoted string literals.
///
/// The result has the same byte length as `formula`, with every byte between
/// a pair of `"` replaced by a space, so offsets found in the masked text are
/// valid in the original. `""` inside a literal stays masked.
pub fn mask_string_literals(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut in_string = false;
    let mut in_sheet_quote = false;

    for c in formula.chars() {
        if in_string {
            if c == '"' {
                in_string = false;
                out.push('"');
            } else {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            continue;
        }
        match c {
            '\'' => in_sheet_quote = !in_sheet_quote,
            '"' if !in_sheet_quote => in_string = true,
            _ => {}
        }
        out.push(c);
    }

    out
}

/// Byte offsets of every `NAME(` call outside string literals.
///
/// Each returned offset points just past the opening parenthesis, ready for
/// [`extract_balanced`]. Matching is case-insensitive and requires that the
/// name is not the tail of a longer identifier.
pub fn find_calls(formula: &str, name: &str) -> Vec<usize> {
    let masked = mask_string_literals(formula);
    let upper = masked.to_ascii_uppercase();
    let needle = format!("{}(", name.to_ascii_uppercase());

    let mut offsets = Vec::new();
    let mut from = 0;
    while let Some(pos) = upper[from..].find(&needle) {
        let at = from + pos;
        let preceded_by_ident = upper[..at]
            .chars()
            .next_back()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !preceded_by_ident {
            offsets.push(at + needle.len());
        }
        from = at + needle.len();
    }

    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_balanced_nested() {
        let text = "VLOOKUP(A1,B1:C3,MATCH(\"x\",D1:D3,0))&\"!A1\"";
        assert_eq!(
            extract_balanced(text, 8).unwrap(),
            "A1,B1:C3,MATCH(\"x\",D1:D3,0)"
        );
    }

    #[test]
    fn test_extract_balanced_ignores_quoted_parens() {
        let text = "INDIRECT(\"a)b\"&'x(y'!A1)";
        assert_eq!(extract_balanced(text, 9).unwrap(), "\"a)b\"&'x(y'!A1");
    }

    #[test]
    fn test_extract_balanced_unbalanced() {
        let err = extract_balanced("SUM(A1,(B1", 4).unwrap_err();
        assert!(matches!(
            err,
            FormulaError::UnbalancedBrackets { offset: 4 }
        ));
        assert!(extract_balanced("SUM(", 10).is_err());
    }

    #[test]
    fn test_split_keeps_quoted_ampersand() {
        let parts: Vec<&str> = split_ampersand("\"a&b\"&C1")
            .iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(parts, vec!["\"a&b\"", "C1"]);
    }

    #[test]
    fn test_split_offsets_and_trimming() {
        let text = " \"Sheet\" & B5 &\"!A1\"";
        let parts = split_ampersand(text);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].text, "B5");
        assert_eq!(&text[parts[1].start..parts[1].end()], "B5");
        assert!(split_ampersand(" & ").is_empty());
    }

    #[test]
    fn test_split_single_quotes_protect_ampersand() {
        let parts = split_ampersand("'R&D'!A1&B2");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text, "'R&D'!A1");
    }

    #[test]
    fn test_mask_string_literals() {
        let f = "=A1&\"B2\"&'It''s'!C3";
        let masked = mask_string_literals(f);
        assert_eq!(masked.len(), f.len());
        assert_eq!(masked, "=A1&\"  \"&'It''s'!C3");
    }

    #[test]
    fn test_mask_keeps_double_quote_inside_sheet_name() {
        let f = "='a\"b'!A1+\"x\"";
        assert_eq!(mask_string_literals(f), "='a\"b'!A1+\" \"");
    }

    #[test]
    fn test_find_calls() {
        let f = "=INDIRECT(A1)+MYINDIRECT(B1)+\"INDIRECT(C1)\"+indirect(D1)";
        let offsets = find_calls(f, "INDIRECT");
        assert_eq!(offsets.len(), 2);
        assert_eq!(extract_balanced(f, offsets[0]).unwrap(), "A1");
        assert_eq!(extract_balanced(f, offsets[1]).unwrap(), "D1");
    }
}
