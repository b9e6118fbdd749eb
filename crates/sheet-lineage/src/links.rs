//! External link tables
//!
//! A formula written as `[2]Sheet1!A1` refers to the second entry of its
//! workbook's external link table. The table is read once per workbook from
//! the package metadata. When a workbook declares no links at all, sibling
//! files with conventional names are probed and numbered in the order found.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use sheet_lineage_core::path::{is_absolute, join_workbook_path, normalize_path, workbook_dir};
use sheet_lineage_core::{CellStore, ExternalLink, ExternalLinkSource};

/// Index to workbook path mapping for one workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalLinkTable {
    links: BTreeMap<u32, PathBuf>,
    inferred: bool,
}

impl ExternalLinkTable {
    /// Build the table for `workbook`.
    ///
    /// Declared links win. If listing fails or yields nothing, the
    /// `candidates` are probed next to the workbook through
    /// [`CellStore::workbook_exists`].
    pub fn build(
        store: &dyn CellStore,
        source: &dyn ExternalLinkSource,
        workbook: &Path,
        candidates: &[String],
    ) -> Self {
        let declared = match source.list_external_links(workbook) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(
                    workbook = %workbook.display(),
                    error = %e,
                    "cannot list external links"
                );
                Vec::new()
            }
        };

        if declared.is_empty() {
            Self::infer(store, workbook, candidates)
        } else {
            Self::from_links(workbook, &declared)
        }
    }

    /// Table from declared links; relative targets resolve against the
    /// workbook's directory
    pub fn from_links(workbook: &Path, links: &[ExternalLink]) -> Self {
        let dir = workbook_dir(workbook);
        let mut table = Self::default();
        for link in links {
            match link_target_path(&link.target, &dir) {
                Some(path) => {
                    tracing::debug!(index = link.index, path = %path.display(), "external link");
                    table.links.insert(link.index, path);
                }
                None => tracing::warn!(index = link.index, "external link has no target path"),
            }
        }
        table
    }

    /// Table from whichever `candidates` exist next to `workbook`
    pub fn infer(store: &dyn CellStore, workbook: &Path, candidates: &[String]) -> Self {
        let dir = workbook_dir(workbook);
        let mut table = Self {
            links: BTreeMap::new(),
            inferred: true,
        };

        let mut index = 1;
        for name in candidates {
            let path = join_workbook_path(&dir, name);
            if store.workbook_exists(&path) {
                tracing::debug!(index, path = %path.display(), "inferred external link");
                table.links.insert(index, path);
                index += 1;
            }
        }
        table
    }

    /// Path for a link index
    pub fn resolve(&self, index: u32) -> Option<&Path> {
        self.links.get(&index).map(PathBuf::as_path)
    }

    /// Stand-in path for an index with no entry
    pub fn placeholder(index: u32) -> PathBuf {
        PathBuf::from(format!("Unknown_{}", index))
    }

    /// Whether the entries came from probing rather than the workbook
    pub fn is_inferred(&self) -> bool {
        self.inferred
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Path)> {
        self.links.iter().map(|(i, p)| (*i, p.as_path()))
    }
}

/// Turn a recorded link target into a workbook path.
///
/// Targets are percent-decoded and lose any `file://` scheme. `None` for an
/// empty target.
fn link_target_path(target: &str, dir: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(target.trim()).decode_utf8_lossy();
    let text = strip_file_scheme(&decoded);
    if text.is_empty() {
        return None;
    }

    if is_absolute(text) {
        Some(normalize_path(Path::new(text)))
    } else {
        Some(join_workbook_path(dir, text))
    }
}

/// `file:///C:/x.xlsx` -> `C:/x.xlsx`, `file:///data/x.xlsx` -> `/data/x.xlsx`
fn strip_file_scheme(target: &str) -> &str {
    let rest = target.strip_prefix("file://").unwrap_or(target);
    let bytes = rest.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        &rest[1..]
    } else {
        rest
    }
}
