//! [`CellStore`] over `.xlsx` files on disk

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use sheet_lineage_core::path::normalize_path;
use sheet_lineage_core::{
    CellAddress, CellRecord, CellStore, ExternalLink, ExternalLinkSource, ReadError, Workbook,
};

use crate::reader::XlsxReader;

/// Reads cells from `.xlsx`/`.xlsm` files, opening each file once.
///
/// Opened workbooks (and failed opens) are cached by normalized path for the
/// lifetime of the store, so many references into one external workbook
/// parse it a single time. The cache uses interior mutability; the store is
/// meant to be owned by one explosion at a time.
#[derive(Debug, Default)]
pub struct XlsxStore {
    cache: RefCell<HashMap<PathBuf, Result<Rc<Workbook>, ReadError>>>,
    opened: Cell<usize>,
}

impl XlsxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many files have been opened (successfully or not)
    pub fn open_count(&self) -> usize {
        self.opened.get()
    }

    /// Drop every cached workbook
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Load `path`, from the cache when possible
    pub fn workbook(&self, path: &Path) -> Result<Rc<Workbook>, ReadError> {
        let key = normalize_path(path);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }

        self.opened.set(self.opened.get() + 1);
        log::debug!("opening workbook {}", path.display());
        let loaded = XlsxReader::read_file(path)
            .map(Rc::new)
            .map_err(|e| e.into_read_error(path));
        if let Err(e) = &loaded {
            log::warn!("{}", e);
        }

        self.cache.borrow_mut().insert(key, loaded.clone());
        loaded
    }
}

impl CellStore for XlsxStore {
    fn read_cell(
        &self,
        workbook: &Path,
        sheet: &str,
        cell: CellAddress,
    ) -> Result<CellRecord, ReadError> {
        let wb = self.workbook(workbook)?;
        let ws = wb
            .worksheet_by_name(sheet)
            .ok_or_else(|| ReadError::SheetNotFound {
                workbook: workbook.to_path_buf(),
                sheet: sheet.to_string(),
            })?;
        Ok(CellRecord::from_value(ws.value_at(cell)))
    }

    fn workbook_exists(&self, workbook: &Path) -> bool {
        let cached = self
            .cache
            .borrow()
            .get(&normalize_path(workbook))
            .map(|entry| entry.is_ok());
        cached.unwrap_or_else(|| workbook.is_file())
    }
}

impl ExternalLinkSource for XlsxStore {
    fn list_external_links(&self, workbook: &Path) -> Result<Vec<ExternalLink>, ReadError> {
        let wb = self.workbook(workbook)?;
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
