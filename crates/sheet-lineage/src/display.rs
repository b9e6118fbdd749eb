//! Display forms of node addresses and formulas

use std::borrow::Cow;
use std::path::Path;

use lazy_regex::{lazy_regex, Lazy, Regex};
use percent_encoding::percent_decode_str;
use sheet_lineage_core::path::{normalize_path, split_workbook_path};
use sheet_lineage_core::CellAddress;

static DOUBLED_QUOTES: Lazy<Regex> = lazy_regex!(r"''([^']*?)''");

/// The three address renderings carried by a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayAddress {
    /// Default rendering, equal to `short`
    pub address: String,
    /// `Sheet!A1` or `[Book.xlsx]Sheet!A1`
    pub short: String,
    /// `Sheet!A1` or `'C:\dir\[Book.xlsx]Sheet'!A1`
    pub full: String,
}

/// Render a cell for display.
///
/// Cells of the root workbook show as `sheet!cell`; cells of any other
/// workbook show the bracketed file name. The root itself (`is_root`) always
/// shows the bracketed form. In the full form the directory is joined with
/// the separator its own path uses, so a POSIX directory renders as
/// `'/books/[Book.xlsx]Sheet'!A1` rather than Excel's backslash form
/// `'dir\[Book.xlsx]Sheet'!A1`.
pub fn display_address(
    root_workbook: &Path,
    workbook: &Path,
    sheet: &str,
    cell: CellAddress,
    is_root: bool,
) -> DisplayAddress {
    let cell = cell.unanchored().to_a1_string();

    if !is_root && normalize_path(root_workbook) == normalize_path(workbook) {
        let local = format!("{}!{}", sheet, cell);
        return DisplayAddress {
            address: local.clone(),
            short: local.clone(),
            full: local,
        };
    }

    let (dir, file) = split_workbook_path(workbook);
    let short = format!("[{}]{}!{}", file, sheet, cell);
    let full = if dir.is_empty() {
        format!("'[{}]{}'!{}", file, sheet, cell)
    } else {
        let sep = if dir.contains('\\') || dir.contains(':') {
            '\\'
        } else {
            '/'
        };
        format!("'{}{}[{}]{}'!{}", dir, sep, file, sheet, cell)
    };

    DisplayAddress {
        address: short.clone(),
        short,
        full,
    }
}

/// Clean raw formula text for display.
///
/// Doubled backslashes collapse, percent escapes decode and `''name''`
/// becomes `'name'`. Reference extraction always works on the raw text.
pub fn display_formula(formula: &str) -> String {
    let collapsed = formula.replace("\\\\", "\\");
    let decoded: Cow<'_, str> = percent_decode_str(&collapsed).decode_utf8_lossy();
    DOUBLED_QUOTES.replace_all(&decoded, "'$1'").into_owned()
}
