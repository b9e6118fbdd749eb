//! Cell storage abstractions
//!
//! The dependency walker never opens files itself. It goes through
//! [`CellStore`] to read a cell and through [`ExternalLinkSource`] to learn
//! which files a workbook's bracketed link indices (`[1]`, `[2]`, ...) point at.
//! [`MemoryStore`] implements both over in-memory [`Workbook`]s.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use ahash::AHashMap;

use crate::cell::{CellAddress, CellValue};
use crate::error::ReadError;
use crate::path::normalize_path;
use crate::workbook::Workbook;

/// What kind of content a cell holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CellType {
    /// A constant (number, text, boolean or empty)
    Value,
    /// A formula
    Formula,
    /// A constant error value such as `#REF!`
    Error,
}

/// Everything the dependency walker needs to know about one cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    /// The value as it appears in the formula bar (formula text for formula cells)
    pub display_value: CellValue,
    /// The last calculated value
    pub calculated_value: CellValue,
    /// Raw formula text including the leading `=`
    pub formula: Option<String>,
    pub cell_type: CellType,
    pub error_message: Option<String>,
}

impl CellRecord {
    /// Build a record from a stored cell value
    pub fn from_value(value: &CellValue) -> Self {
        match value {
            CellValue::Formula { text, .. } => Self {
                display_value: CellValue::String(text.clone()),
                calculated_value: value.effective_value().clone(),
                formula: Some(text.clone()),
                cell_type: CellType::Formula,
                error_message: None,
            },
            CellValue::Error(e) => Self {
                display_value: value.clone(),
                calculated_value: value.clone(),
                formula: None,
                cell_type: CellType::Error,
                error_message: Some(e.as_str().to_string()),
            },
            other => Self {
                display_value: other.clone(),
                calculated_value: other.clone(),
                formula: None,
                cell_type: CellType::Value,
                error_message: None,
            },
        }
    }

    /// Formula text, if the cell holds a non-empty formula
    pub fn formula_text(&self) -> Option<&str> {
        match (&self.cell_type, &self.formula) {
            (CellType::Formula, Some(f)) if !f.trim().is_empty() => Some(f.as_str()),
            _ => None,
        }
    }
}

/// One entry of a workbook's external link table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLink {
    /// 1-based index used in `[n]Sheet!A1` references
    pub index: u32,
    /// Target path exactly as recorded in the workbook
    pub target: String,
}

/// Reads individual cells from workbooks.
pub trait CellStore {
    /// Read one cell.
    ///
    /// An empty cell is not an error; it yields a `Value` record holding
    /// [`CellValue::Empty`].
    fn read_cell(
        &self,
        workbook: &Path,
        sheet: &str,
        cell: CellAddress,
    ) -> Result<CellRecord, ReadError>;

    /// Whether a workbook can be opened by this store
    fn workbook_exists(&self, workbook: &Path) -> bool {
        workbook.is_file()
    }
}

/// Lists a workbook's declared external links.
pub trait ExternalLinkSource {
    /// Links in index order. May be empty.
    fn list_external_links(&self, workbook: &Path) -> Result<Vec<ExternalLink>, ReadError>;
}

/// Identity of a cell across workbooks: `(workbook, sheet, cell)`.
///
/// The workbook path is normalized and `$` anchors are dropped, so `$A$1` and
/// `A1` in the same sheet are the same key. Sheet names compare ASCII
/// case-insensitively, like [`Workbook::worksheet_by_name`]; `sheet` keeps the
/// spelling the key was built with.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellKey {
    pub workbook: PathBuf,
    pub sheet: String,
    pub cell: CellAddress,
}

impl CellKey {
    pub fn new(workbook: &Path, sheet: &str, cell: CellAddress) -> Self {
        Self {
            workbook: normalize_path(workbook),
            sheet: sheet.to_string(),
            cell: cell.unanchored(),
        }
    }

    fn folded_sheet(&self) -> impl Iterator<Item = u8> + '_ {
        self.sheet.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for CellKey {
    fn eq(&self, other: &Self) -> bool {
        self.workbook == other.workbook
            && self.cell == other.cell
            && self.sheet.eq_ignore_ascii_case(&other.sheet)
    }
}

impl Eq for CellKey {}

impl Hash for CellKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.workbook.hash(state);
        for b in self.folded_sheet() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
        self.cell.hash(state);
    }
}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.workbook
            .cmp(&other.workbook)
            .then_with(|| self.folded_sheet().cmp(other.folded_sheet()))
            .then_with(|| self.cell.cmp(&other.cell))
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let workbook = self.workbook.display();
        write!(f, "[{}]{}!{}", workbook, self.sheet, self.cell)
    }
}

/// In-memory [`CellStore`] and [`ExternalLinkSource`].
///
/// Workbooks are registered under a path; lookups normalize the path the
/// same way [`CellKey`] does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    workbooks: AHashMap<PathBuf, Workbook>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a workbook under `path`
    pub fn insert<P: AsRef<Path>>(&mut self, path: P, workbook: Workbook) {
        let key = normalize_path(path.as_ref());
        self.workbooks.insert(key, workbook);
    }

    /// Get a registered workbook
    pub fn workbook<P: AsRef<Path>>(&self, path: P) -> Option<&Workbook> {
        self.workbooks.get(&normalize_path(path.as_ref()))
    }

    /// Get a registered workbook mutably
    pub fn workbook_mut<P: AsRef<Path>>(&mut self, path: P) -> Option<&mut Workbook> {
        self.workbooks.get_mut(&normalize_path(path.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.workbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workbooks.is_empty()
    }
}

impl CellStore for MemoryStore {
    fn read_cell(
        &self,
        workbook: &Path,
        sheet: &str,
        cell: CellAddress,
    ) -> Result<CellRecord, ReadError> {
        let wb = self
            .workbook(workbook)
            .ok_or_else(|| ReadError::WorkbookNotFound(workbook.to_path_buf()))?;
        let ws = wb
            .worksheet_by_name(sheet)
            .ok_or_else(|| ReadError::SheetNotFound {
                workbook: workbook.to_path_buf(),
                sheet: sheet.to_string(),
            })?;
        Ok(CellRecord::from_value(ws.value_at(cell)))
    }

    fn workbook_exists(&self, workbook: &Path) -> bool {
        self.workbook(workbook).is_some()
    }
}

impl ExternalLinkSource for MemoryStore {
    fn list_external_links(&self, workbook: &Path) -> Result<Vec<ExternalLink>, ReadError> {
        let wb = self
            .workbook(workbook)
            .ok_or_else(|| ReadError::WorkbookNotFound(workbook.to_path_buf()))?;
        Ok(wb
            .external_links()
            .iter()
            .enumerate()
            .map(|(i, target)| ExternalLink {
                index: i as u32 + 1,
                target: target.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellError;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn sample_store() -> MemoryStore {
        let mut wb = Workbook::new();
        let ws = wb.worksheet_by_name_mut("Sheet1").unwrap();
        ws.set_cell_value("A1", 5.0).unwrap();
        ws.set_cell_formula("B1", "A1*2").unwrap();
        ws.set_cell_value("C1", CellError::Ref).unwrap();
        wb.add_external_link(r"C:\data\Other.xlsx");

        let mut store = MemoryStore::new();
        store.insert("/books/Main.xlsx", wb);
        store
    }

    #[test]
    fn test_read_value_and_formula() {
        let store = sample_store();
        let path = Path::new("/books/Main.xlsx");

        let rec = store.read_cell(path, "Sheet1", addr("A1")).unwrap();
        assert_eq!(rec.cell_type, CellType::Value);
        assert_eq!(rec.calculated_value, CellValue::Number(5.0));
        assert_eq!(rec.formula_text(), None);

        let rec = store.read_cell(path, "Sheet1", addr("$B$1")).unwrap();
        assert_eq!(rec.cell_type, CellType::Formula);
        assert_eq!(rec.formula_text(), Some("=A1*2"));

        let rec = store.read_cell(path, "Sheet1", addr("C1")).unwrap();
        assert_eq!(rec.cell_type, CellType::Error);
        assert_eq!(rec.error_message.as_deref(), Some("#REF!"));

        let rec = store.read_cell(path, "Sheet1", addr("Z99")).unwrap();
        assert_eq!(rec.display_value, CellValue::Empty);
    }

    #[test]
    fn test_read_errors() {
        let store = sample_store();
        let missing = PathBuf::from("/books/Missing.xlsx");
        assert_eq!(
            store.read_cell(&missing, "Sheet1", addr("A1")),
            Err(ReadError::WorkbookNotFound(missing.clone()))
        );
        assert!(matches!(
            store.read_cell(Path::new("/books/Main.xlsx"), "Nope", addr("A1")),
            Err(ReadError::SheetNotFound { .. })
        ));
    }

    #[test]
    fn test_lookup_normalizes_path() {
        let store = sample_store();
        assert!(store.workbook_exists(Path::new("/books/./x/../Main.xlsx")));
        assert!(!store.workbook_exists(Path::new("/books/Main2.xlsx")));
    }

    #[test]
    fn test_external_links_are_one_based() {
        let store = sample_store();
        let links = store
            .list_external_links(Path::new("/books/Main.xlsx"))
            .unwrap();
        assert_eq!(
            links,
            vec![ExternalLink {
                index: 1,
                target: r"C:\data\Other.xlsx".to_string()
            }]
        );
    }

    #[test]
    fn test_cell_key_identity() {
        let a = CellKey::new(Path::new("/b/./Main.xlsx"), "Sheet1", addr("$A$1"));
        let b = CellKey::new(Path::new("/b/Main.xlsx"), "Sheet1", addr("A1"));
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "[/b/Main.xlsx]Sheet1!A1");
    }

    #[test]
    fn test_cell_key_sheet_case_folds() {
        use ahash::AHashSet;

        let upper = CellKey::new(Path::new("/b/Main.xlsx"), "Sheet1", addr("B1"));
        let lower = CellKey::new(Path::new("/b/Main.xlsx"), "sheet1", addr("B1"));
        assert_eq!(upper, lower);
        assert_eq!(upper.cmp(&lower), Ordering::Equal);
        assert_ne!(
            upper,
            CellKey::new(Path::new("/b/Main.xlsx"), "Sheet10", addr("B1"))
        );

        let mut seen = AHashSet::new();
        seen.insert(upper);
        assert!(seen.contains(&lower));
        assert_eq!(lower.to_string(), "[/b/Main.xlsx]sheet1!B1");
    }
}
