//! Workbook type - an ordered set of worksheets plus its external link table

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Characters a sheet name may not contain
const FORBIDDEN_IN_SHEET_NAME: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Worksheets in tab order and the targets of the workbook's external links
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    /// Position `i` is link index `i + 1`
    external_links: Vec<String>,
}

impl Workbook {
    /// A workbook holding one empty `Sheet1`
    pub fn new() -> Self {
        let mut workbook = Self::empty();
        workbook.worksheets.push(Worksheet::new("Sheet1"));
        workbook
    }

    /// A workbook with no worksheets at all
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            external_links: Vec::new(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Position of the sheet called `name`. An exact match wins over a
    /// case-insensitive one.
    fn position(&self, name: &str) -> Option<usize> {
        let names = || self.worksheets.iter().map(Worksheet::name);
        names()
            .position(|n| n == name)
            .or_else(|| names().position(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.position(name).map(|i| &self.worksheets[i])
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        let i = self.position(name)?;
        self.worksheets.get_mut(i)
    }

    /// Append an empty sheet, returning its index
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.add_existing_worksheet(Worksheet::new(name))
    }

    /// Append `worksheet`, returning its index. Names must be non-empty,
    /// short enough, free of `: \ / ? * [ ]` and unique ignoring case.
    pub fn add_existing_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        let name = worksheet.name();
        let problem = if name.is_empty() {
            Some("empty".to_string())
        } else if name.chars().count() > MAX_SHEET_NAME_LEN {
            Some(format!("longer than {} characters", MAX_SHEET_NAME_LEN))
        } else {
            name.chars()
                .find(|c| FORBIDDEN_IN_SHEET_NAME.contains(c))
                .map(|c| format!("contains '{}'", c))
        };
        if let Some(problem) = problem {
            let message = format!("'{}' is {}", name, problem);
            return Err(Error::InvalidSheetName(message));
        }
        if self.position(name).is_some() {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }

        self.worksheets.push(worksheet);
        Ok(self.worksheets.len() - 1)
    }

    /// Append an external link target, returning its 1-based index
    pub fn add_external_link<S: Into<String>>(&mut self, target: S) -> u32 {
        self.external_links.push(target.into());
        self.external_links.len() as u32
    }

    /// External link targets in index order
    pub fn external_links(&self) -> &[String] {
        &self.external_links
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
