//! Worksheet type

use ahash::AHashMap;

use crate::cell::{CellAddress, CellValue};
use crate::error::Result;

static EMPTY: CellValue = CellValue::Empty;

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely, keyed by their unanchored address.
#[derive(Debug, Clone)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    cells: AHashMap<CellAddress, CellValue>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: AHashMap::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Get cell value by address string (convenience method)
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.value_at(addr).clone())
    }

    /// Get the value at an address; absent cells are [`CellValue::Empty`]
    pub fn value_at(&self, addr: CellAddress) -> &CellValue {
        self.cells.get(&addr.unanchored()).unwrap_or(&EMPTY)
    }

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr, value);
        Ok(())
    }

    /// Set a cell value at a parsed address. Setting `Empty` clears the cell.
    pub fn set_cell_value_at<V: Into<CellValue>>(&mut self, addr: CellAddress, value: V) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&addr.unanchored());
        } else {
            self.cells.insert(addr.unanchored(), value);
        }
    }

    /// Set a cell formula by address string
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr, CellValue::formula(with_equals(formula)));
        Ok(())
    }

    /// Set a cell formula together with its last calculated value
    pub fn set_cell_formula_with_value<V: Into<CellValue>>(
        &mut self,
        address: &str,
        formula: &str,
        cached: V,
    ) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(
            addr,
            CellValue::formula_with_value(with_equals(formula), cached.into()),
        );
        Ok(())
    }

    /// Get formula text at an address, if the cell holds a formula
    pub fn get_formula_at(&self, addr: CellAddress) -> Option<&str> {
        self.value_at(addr).formula_text()
    }
}

/// Ensure formula text starts with '='
fn with_equals(formula: &str) -> String {
    if formula.starts_with('=') {
        formula.to_string()
    } else {
        format!("={}", formula)
    }
}
