//! Reference extraction from raw formula text
//!
//! Two regex passes over the formula with string literals masked out:
//!
//! 1. *Anchored* references, `<sheet part>!<cell>` with an optional
//!    `:<cell>` range tail. The sheet part is bare (`Sheet2`), quoted
//!    (`'My Sheet'`), doubled-quoted (`''C:\x\[b.xlsx]S''`) or carries an
//!    external `[book]` prefix.
//! 2. *Bare* references, `<col><row>` anywhere not already claimed by pass 1.
//!
//! Ranges are not expanded; both endpoints are reported.

use std::ops::Range;
use std::path::{Path, PathBuf};

use lazy_regex::{lazy_regex, Lazy, Regex};
use percent_encoding::percent_decode_str;
use sheet_lineage_core::path::{is_absolute, join_workbook_path, workbook_dir};
use sheet_lineage_core::CellAddress;

use crate::error::{FormulaError, FormulaResult};
use crate::scan::mask_string_literals;

static ANCHORED: Lazy<Regex> = lazy_regex!(
    r#"((?:''[^']*''|'(?:[^']|'')+'|[^'!,=+\-*/^&()<>:;{}" ]+)!)(\$?[A-Z]{1,3}\$?[0-9]{1,7})(?::(\$?[A-Z]{1,3}\$?[0-9]{1,7}))?"#
);

static BARE: Lazy<Regex> = lazy_regex!(r"\$?[A-Z]{1,3}\$?[0-9]{1,7}");

/// How a reference was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `A1` - bound to the formula's own sheet
    Relative,
    /// `Sheet2!A1` - another sheet of the same workbook
    LocalAbsolute,
    /// `[Book.xlsx]Sheet1!A1` or `[1]Sheet1!A1` - another workbook
    External,
}

/// A reference found in a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Workbook the reference points into.
    ///
    /// For bracket-index references (`[3]Sheet1!A1`) this is only the index
    /// text; resolve it through the workbook's link table using
    /// [`Reference::link_index`].
    pub workbook: PathBuf,
    pub sheet: String,
    pub cell: CellAddress,
    pub kind: ReferenceKind,
    /// Set for `[n]` references whose target comes from the link table
    pub link_index: Option<u32>,
}

impl Reference {
    fn local(workbook: &Path, sheet: &str, cell: CellAddress, kind: ReferenceKind) -> Self {
        Self {
            workbook: workbook.to_path_buf(),
            sheet: sheet.to_string(),
            cell,
            kind,
            link_index: None,
        }
    }
}

/// Span information for one anchored match
struct AnchoredMatch {
    full: Range<usize>,
    sheet_part: Range<usize>,
    first: Range<usize>,
    tail: Option<Range<usize>>,
}

fn anchored_matches(masked: &str) -> Vec<AnchoredMatch> {
    ANCHORED
        .captures_iter(masked)
        .filter_map(|caps| {
            let full = caps.get(0)?.range();
            let sheet_part = caps.get(1)?.range();
            let first = caps.get(2)?.range();
            let tail = caps.get(3).map(|m| m.range());
            Some(AnchoredMatch {
                full,
                sheet_part,
                first,
                tail,
            })
        })
        .collect()
}

/// Spans of bare `A1` tokens outside `claimed` spans.
fn bare_matches(masked: &str, claimed: &[Range<usize>]) -> Vec<Range<usize>> {
    BARE.find_iter(masked)
        .map(|m| m.range())
        .filter(|span| {
            let before = masked[..span.start].chars().next_back();
            let after = masked[span.end..].chars().next();
            // Part of a longer identifier (SHEET1A1, x.A1)
            if before.map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
                return false;
            }
            // LOG10(...) is a function, A1B is not a cell
            if after.map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '(') {
                return false;
            }
            !claimed
                .iter()
                .any(|c| span.start < c.end && span.end > c.start)
        })
        .collect()
}

/// Extract every cell reference from `formula`.
///
/// `workbook` and `sheet` identify where the formula lives; relative and
/// local references bind to them, and relative external file names resolve
/// against the workbook's directory. Text that does not start with `=`
/// yields nothing. A malformed anchored match is skipped on its own; the
/// rest of the formula is still extracted.
///
/// Anchored references come first, in formula order, followed by the bare
/// ones.
pub fn extract_references(formula: &str, workbook: &Path, sheet: &str) -> Vec<Reference> {
    if !formula.trim_start().starts_with('=') {
        return Vec::new();
    }

    let masked = mask_string_literals(formula);
    let anchored = anchored_matches(&masked);
    let mut refs = Vec::new();

    for m in &anchored {
        let sheet_part = &formula[m.sheet_part.clone()];
        let mut cells = vec![&formula[m.first.clone()]];
        if let Some(tail) = &m.tail {
            cells.push(&formula[tail.clone()]);
        }

        match anchored_target(sheet_part, workbook) {
            Ok(target) => {
                for cell_text in cells {
                    match CellAddress::parse(cell_text) {
                        Ok(cell) => refs.push(Reference {
                            workbook: target.workbook.clone(),
                            sheet: target.sheet.clone(),
                            cell,
                            kind: target.kind,
                            link_index: target.link_index,
                        }),
                        Err(e) => {
                            tracing::warn!(
                                reference = cell_text,
                                error = %e,
                                "skipping cell outside sheet bounds"
                            )
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(sheet_part, error = %e, "skipping malformed reference");
            }
        }
    }

    let claimed: Vec<Range<usize>> = anchored.iter().map(|m| m.full.clone()).collect();
    for span in bare_matches(&masked, &claimed) {
        let text = &formula[span];
        if let Ok(cell) = CellAddress::parse(text) {
            let kind = ReferenceKind::Relative;
            refs.push(Reference::local(workbook, sheet, cell, kind));
        }
    }

    refs
}

/// Where an anchored sheet part points
#[derive(Debug, Clone, PartialEq)]
struct AnchoredTarget {
    workbook: PathBuf,
    sheet: String,
    kind: ReferenceKind,
    link_index: Option<u32>,
}

fn anchored_target(sheet_part: &str, current: &Path) -> FormulaResult<AnchoredTarget> {
    if sheet_part.contains('[') && sheet_part.contains(']') {
        let (dir, file, sheet) = split_external_sheet_part(sheet_part)?;
        let (workbook, link_index) = match file.parse::<u32>() {
            Ok(n) if dir.is_empty() => (PathBuf::from(&file), Some(n)),
            _ => (resolve_external_path(&dir, &file, current), None),
        };
        Ok(AnchoredTarget {
            workbook,
            sheet,
            kind: ReferenceKind::External,
            link_index,
        })
    } else {
        Ok(AnchoredTarget {
            workbook: current.to_path_buf(),
            sheet: unquote_sheet_name(sheet_part),
            kind: ReferenceKind::LocalAbsolute,
            link_index: None,
        })
    }
}

/// `'My ''Data'''!` -> `My 'Data'`, `''Sheet1''!` -> `Sheet1`
pub fn unquote_sheet_name(sheet_part: &str) -> String {
    let name = sheet_part.strip_suffix('!').unwrap_or(sheet_part);
    let collapsed = name.replace("''", "'");
    strip_one_quote_layer(&collapsed).to_string()
}

fn strip_one_quote_layer(s: &str) -> &str {
    let s = s.strip_prefix('\'').unwrap_or(s);
    s.strip_suffix('\'').unwrap_or(s)
}

/// Clean an external sheet part and split it into `(dir, file, sheet)`.
///
/// Cleaning runs in a fixed order: percent-decode, collapse `\\`, collapse
/// `''`, drop the trailing `!` and one layer of quotes.
pub fn split_external_sheet_part(sheet_part: &str) -> FormulaResult<(String, String, String)> {
    let decoded = percent_decode_str(sheet_part).decode_utf8_lossy();
    let decoded = decoded.replace("\\\\", "\\");
    let decoded = decoded.replace("''", "'");
    let trimmed = decoded.trim();
    let trimmed = trimmed.strip_suffix('!').unwrap_or(trimmed).trim();
    let cleaned = strip_one_quote_layer(trimmed);
    let cleaned = cleaned
        .strip_prefix("file:///")
        .or_else(|| cleaned.strip_prefix("file://"))
        .unwrap_or(cleaned);

    let (book_part, sheet) = cleaned
        .rsplit_once(']')
        .ok_or_else(|| FormulaError::Extraction(format!("no ']' in '{}'", sheet_part)))?;
    let (dir, file) = book_part
        .rsplit_once('[')
        .ok_or_else(|| FormulaError::Extraction(format!("no '[' in '{}'", sheet_part)))?;

    let sheet = sheet.trim();
    let file = file.trim();
    if file.is_empty() || sheet.is_empty() {
        return Err(FormulaError::Extraction(format!(
            "empty workbook or sheet in '{}'",
            sheet_part
        )));
    }

    let dir = dir.trim_end_matches(|c| c == '\\' || c == '/');
    Ok((dir.to_string(), file.to_string(), sheet.to_string()))
}

fn resolve_external_path(dir: &str, file: &str, current: &Path) -> PathBuf {
    let joined = join_workbook_path(dir, file);
    let text = joined.to_string_lossy().into_owned();
    if is_absolute(&text) {
        joined
    } else {
        join_workbook_path(&workbook_dir(current), &text)
    }
}

/// Shift the relative parts of every cell reference in `formula`.
///
/// Used to expand shared formulas: the follower cell's formula is the
/// master's with non-`$` rows moved by `rows` and non-`$` columns by
/// `cols`. References that would fall off the sheet become `#REF!`.
pub fn shift_relative_references(formula: &str, rows: i64, cols: i64) -> String {
    if rows == 0 && cols == 0 {
        return formula.to_string();
    }

    let masked = mask_string_literals(formula);
    let anchored = anchored_matches(&masked);
    let claimed: Vec<Range<usize>> = anchored.iter().map(|m| m.full.clone()).collect();

    let mut spans: Vec<Range<usize>> = Vec::new();
    for m in &anchored {
        spans.push(m.first.clone());
        if let Some(tail) = &m.tail {
            spans.push(tail.clone());
        }
    }
    spans.extend(bare_matches(&masked, &claimed));
    spans.sort_by_key(|s| s.start);

    let mut out = String::with_capacity(formula.len() + 8);
    let mut last = 0;
    for span in spans {
        out.push_str(&formula[last..span.start]);
        let text = &formula[span.clone()];
        match CellAddress::parse(text) {
            Ok(addr) => {
                let dr = if addr.row_absolute { 0 } else { rows };
                let dc = if addr.col_absolute { 0 } else { cols };
                match addr.offset(dr, dc) {
                    Some(moved) => out.push_str(&moved.to_a1_string()),
                    None => out.push_str("#REF!"),
                }
            }
            Err(_) => out.push_str(text),
        }
        last = span.end;
    }
    out.push_str(&formula[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    type Row = (String, String, String, ReferenceKind);

    fn summary(refs: &[Reference]) -> Vec<Row> {
        refs.iter()
            .map(|r| {
                (
                    r.workbook.to_string_lossy().into_owned(),
                    r.sheet.clone(),
                    r.cell.to_a1_string(),
                    r.kind,
                )
            })
            .collect()
    }

    fn row(workbook: &str, sheet: &str, cell: &str, kind: ReferenceKind) -> Row {
        (workbook.into(), sheet.into(), cell.into(), kind)
    }

    const BOOK: &str = "/data/Main.xlsx";

    #[test]
    fn test_local_absolute_and_relative() {
        let refs = extract_references("=Sheet2!A1+B2", Path::new(BOOK), "Sheet1");
        assert_eq!(
            refs,
            vec![
                Reference::local(
                    Path::new(BOOK),
                    "Sheet2",
                    addr("A1"),
                    ReferenceKind::LocalAbsolute
                ),
                Reference::local(
                    Path::new(BOOK),
                    "Sheet1",
                    addr("B2"),
                    ReferenceKind::Relative
                ),
            ]
        );
    }

    #[test]
    fn test_not_a_formula() {
        let refs = extract_references("A1+B2", Path::new(BOOK), "Sheet1");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_quoted_sheet_names() {
        let refs = extract_references(
            "='My ''Data'''!$C$3*'Q1 Sales'!B2",
            Path::new(BOOK),
            "Sheet1",
        );
        assert_eq!(
            summary(&refs),
            vec![
                row(BOOK, "My 'Data'", "$C$3", ReferenceKind::LocalAbsolute),
                row(BOOK, "Q1 Sales", "B2", ReferenceKind::LocalAbsolute),
            ]
        );
    }

    #[test]
    fn test_anchored_range_binds_both_endpoints() {
        let refs = extract_references("=SUM(Sheet2!A1:B3)+C1", Path::new(BOOK), "Sheet1");
        assert_eq!(
            summary(&refs),
            vec![
                row(BOOK, "Sheet2", "A1", ReferenceKind::LocalAbsolute),
                row(BOOK, "Sheet2", "B3", ReferenceKind::LocalAbsolute),
                row(BOOK, "Sheet1", "C1", ReferenceKind::Relative),
            ]
        );
    }

    #[test]
    fn test_bare_range_endpoints() {
        let refs = extract_references("=SUM(A1:A10)", Path::new(BOOK), "Sheet1");
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.kind == ReferenceKind::Relative));
    }

    #[test]
    fn test_function_names_and_literals_are_not_references() {
        let refs = extract_references("=LOG10(A1)&\"B2\"&ATAN2(1,2)", Path::new(BOOK), "Sheet1");
        assert_eq!(
            summary(&refs),
            vec![row(BOOK, "Sheet1", "A1", ReferenceKind::Relative)]
        );
    }

    #[test]
    fn test_external_windows_path() {
        let refs = extract_references(
            r"='C:\Reports\[Q1 Data.xlsx]Summary'!D4",
            Path::new(BOOK),
            "Sheet1",
        );
        assert_eq!(
            summary(&refs),
            vec![row(
                r"C:\Reports\Q1 Data.xlsx",
                "Summary",
                "D4",
                ReferenceKind::External
            )]
        );
    }

    #[test]
    fn test_external_cleaning_pipeline() {
        let refs = extract_references(
            r"=''C:\\Share\\[Fx%20Rates.xlsx]Rates''!B7",
            Path::new(BOOK),
            "Sheet1",
        );
        assert_eq!(
            summary(&refs),
            vec![row(
                r"C:\Share\Fx Rates.xlsx",
                "Rates",
                "B7",
                ReferenceKind::External
            )]
        );
    }

    #[test]
    fn test_external_relative_file_resolves_against_referencing_dir() {
        let refs = extract_references("=[Other.xlsx]Sheet1!A1", Path::new(BOOK), "Sheet1");
        assert_eq!(refs[0].workbook, PathBuf::from("/data/Other.xlsx"));
        assert_eq!(refs[0].link_index, None);
    }

    #[test]
    fn test_external_link_index() {
        let refs = extract_references("=[2]Rates!C3*2", Path::new(BOOK), "Sheet1");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].link_index, Some(2));
        assert_eq!(refs[0].kind, ReferenceKind::External);
        assert_eq!(refs[0].sheet, "Rates");
    }

    #[test]
    fn test_malformed_external_is_skipped_alone() {
        // "[]" has an empty file name; the relative C1 survives
        let refs = extract_references("='[]Sheet1'!A1+C1", Path::new(BOOK), "Sheet1");
        assert_eq!(
            summary(&refs),
            vec![row(BOOK, "Sheet1", "C1", ReferenceKind::Relative)]
        );
    }

    #[test]
    fn test_unquote_sheet_name() {
        assert_eq!(unquote_sheet_name("Sheet1!"), "Sheet1");
        assert_eq!(unquote_sheet_name("'Sheet 1'!"), "Sheet 1");
        assert_eq!(unquote_sheet_name("''Sheet1''!"), "Sheet1");
        assert_eq!(unquote_sheet_name("'O''Brien'!"), "O'Brien");
    }

    #[test]
    fn test_split_external_sheet_part_errors() {
        assert!(matches!(
            split_external_sheet_part("'C:\\x\\Book.xlsx]S'!"),
            Err(FormulaError::Extraction(_))
        ));
        assert!(split_external_sheet_part("[Book.xlsx]!").is_err());
    }

    #[test]
    fn test_shift_relative_references() {
        assert_eq!(
            shift_relative_references("=A1+$B$1+Sheet2!C$3*\"D4\"", 2, 1),
            "=B3+$B$1+Sheet2!D$3*\"D4\""
        );
        assert_eq!(
            shift_relative_references("=SUM(A1:A3)", 1, 0),
            "=SUM(A2:A4)"
        );
        assert_eq!(shift_relative_references("=A1", -1, 0), "=#REF!");
    }
}
