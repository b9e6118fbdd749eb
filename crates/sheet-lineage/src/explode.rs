//! Dependency explosion
//!
//! Walks a cell's formula references depth first and builds the full
//! dependency tree. The walk keeps its own stack of open frames instead of
//! recursing, so deep chains cost heap rather than call stack.
//!
//! Cycle detection is scoped to the current root-to-node path: a cell is
//! marked when its frame opens and unmarked when the frame closes, so a
//! cell shared by two branches (a diamond) is expanded under both.
//!
//! # Example
//!
//! ```rust
//! use sheet_lineage::{explode_dependencies, NodeType};
//! use sheet_lineage_core::{MemoryStore, Workbook};
//! use std::path::Path;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_by_name_mut("Sheet1").unwrap();
//! sheet.set_cell_formula("A1", "=B1*2").unwrap();
//! sheet.set_cell_value("B1", 21.0).unwrap();
//!
//! let mut store = MemoryStore::new();
//! store.insert("/books/Main.xlsx", workbook);
//!
//! let (tree, summary) =
//!     explode_dependencies(&store, &store, Path::new("/books/Main.xlsx"), "Sheet1", "A1", 10)
//!         .unwrap();
//! assert_eq!(tree.address, "[Main.xlsx]Sheet1!A1");
//! assert_eq!(tree.children[0].address, "Sheet1!B1");
//! assert_eq!(summary.count_of(NodeType::Value), 1);
//! ```

use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};
use sheet_lineage_core::path::normalize_path;
use sheet_lineage_core::{
    CellAddress, CellKey, CellRecord, CellStore, CellType, CellValue, ExternalLinkSource,
    ReadError,
};
use sheet_lineage_formula::{
    extract_references, indirect_arguments, resolve_indirect, EvaluationContext, Reference,
};

use crate::display::{display_address, display_formula};
use crate::error::{ExplodeError, Result};
use crate::links::ExternalLinkTable;
use crate::node::{DependencyNode, NodeKind};
use crate::options::ExplodeOptions;
use crate::summary::{CircularReference, ExplosionSummary, UnresolvedIndirect};

/// A finished explosion
#[derive(Debug, Clone)]
pub struct Explosion {
    pub root: DependencyNode,
    pub summary: ExplosionSummary,
    /// Link table of the root workbook
    pub links: ExternalLinkTable,
}

/// Explode the dependencies of one cell.
///
/// `store` reads cells and `links` supplies workbooks' external link
/// tables; pass the same value twice for stores that do both. Only an
/// unreadable root cell (or an unparseable `cell`) is an error.
pub fn explode_dependencies(
    store: &dyn CellStore,
    links: &dyn ExternalLinkSource,
    workbook: &Path,
    sheet: &str,
    cell: &str,
    max_depth: usize,
) -> Result<(DependencyNode, ExplosionSummary)> {
    let cell = CellAddress::parse(cell)?;
    let options = ExplodeOptions::default().with_max_depth(max_depth);
    let explosion = Exploder::with_options(store, links, options).explode(workbook, sheet, cell)?;
    Ok((explosion.root, explosion.summary))
}

/// Configurable dependency exploder
pub struct Exploder<'a> {
    store: &'a dyn CellStore,
    links: &'a dyn ExternalLinkSource,
    options: ExplodeOptions,
}

impl<'a> Exploder<'a> {
    pub fn new(store: &'a dyn CellStore, links: &'a dyn ExternalLinkSource) -> Self {
        Self::with_options(store, links, ExplodeOptions::default())
    }

    pub fn with_options(
        store: &'a dyn CellStore,
        links: &'a dyn ExternalLinkSource,
        options: ExplodeOptions,
    ) -> Self {
        Self {
            store,
            links,
            options,
        }
    }

    pub fn options(&self) -> &ExplodeOptions {
        &self.options
    }

    /// Explode `workbook`/`sheet`/`cell` into a tree
    pub fn explode(&self, workbook: &Path, sheet: &str, cell: CellAddress) -> Result<Explosion> {
        let root_workbook = normalize_path(workbook);
        let mut walk = Walk::new(root_workbook.clone());
        walk.link_table(self, &root_workbook);

        let root_target = Target {
            workbook: root_workbook.clone(),
            sheet: sheet.to_string(),
            cell,
            late_bound: false,
        };

        tracing::debug!(
            cell = %CellKey::new(workbook, sheet, cell),
            max_depth = self.options.max_depth,
            "exploding"
        );

        let root = match self.enter(&mut walk, &root_target, 0) {
            Ok(Visit::Leaf(node)) => node,
            Ok(Visit::Open(frame)) => self.run(&mut walk, frame),
            Err(source) => {
                return Err(ExplodeError::RootUnreadable {
                    cell: CellKey::new(workbook, sheet, cell),
                    source,
                })
            }
        };

        walk.summary.tally(&root);
        let links = walk.tables.remove(&root_workbook).unwrap_or_default();
        Ok(Explosion {
            root,
            summary: walk.summary,
            links,
        })
    }

    /// Drive the explicit stack until the root frame closes
    fn run(&self, walk: &mut Walk, root: Frame) -> DependencyNode {
        let mut stack: Vec<Frame> = Vec::new();
        let mut current = root;

        loop {
            match current.pending.next() {
                Some(target) => {
                    let depth = current.node.depth + 1;
                    match self.enter(walk, &target, depth) {
                        Ok(Visit::Open(child)) => {
                            stack.push(current);
                            current = child;
                        }
                        Ok(Visit::Leaf(node)) => current.node.children.push(node),
                        Err(e) => {
                            let leaf = walk.error_leaf(&target, depth, e);
                            current.node.children.push(leaf);
                        }
                    }
                }
                None => {
                    walk.leave(&current.key);
                    match stack.pop() {
                        Some(mut parent) => {
                            parent.node.children.push(current.node);
                            current = parent;
                        }
                        None => return current.node,
                    }
                }
            }
        }
    }

    /// Visit one cell at `depth`.
    ///
    /// Returns a finished leaf, or an open frame for a formula with
    /// references. A read failure is returned as is; the caller decides
    /// whether it is fatal.
    fn enter(
        &self,
        walk: &mut Walk,
        target: &Target,
        depth: usize,
    ) -> std::result::Result<Visit, ReadError> {
        if depth >= self.options.max_depth {
            tracing::debug!(cell = %target.key(), depth, "depth limit reached");
            let node = walk.node(target, depth, NodeKind::LimitReached);
            return Ok(Visit::Leaf(node));
        }

        let key = target.key();
        if walk.visited.contains(&key) {
            walk.record_cycle(&key);
            tracing::debug!(cell = %key, "circular reference");
            let node = walk.node(target, depth, NodeKind::CircularRef);
            return Ok(Visit::Leaf(node));
        }

        let record = self
            .store
            .read_cell(&target.workbook, &target.sheet, target.cell)?;
        tracing::debug!(cell = %key, depth, cell_type = ?record.cell_type, "visiting");

        let Some(formula) = record.formula_text().map(str::to_string) else {
            return Ok(Visit::Leaf(walk.node(target, depth, leaf_kind(record))));
        };

        let children = self.child_targets(walk, target, &key, &formula);
        let kind = NodeKind::Formula {
            value: record.display_value,
            calculated_value: record.calculated_value,
            formula: display_formula(&formula),
        };
        let node = walk.node(target, depth, kind);

        if children.is_empty() {
            return Ok(Visit::Leaf(node));
        }

        walk.enter(key.clone());
        Ok(Visit::Open(Frame {
            node,
            key,
            pending: children.into_iter(),
        }))
    }

    /// References of a formula, in extraction order, followed by the
    /// addresses its `INDIRECT(...)` calls resolve to
    fn child_targets(
        &self,
        walk: &mut Walk,
        at: &Target,
        key: &CellKey,
        formula: &str,
    ) -> Vec<Target> {
        let mut targets: Vec<Target> = extract_references(formula, &at.workbook, &at.sheet)
            .into_iter()
            .map(|r| walk.target_for(self, &at.workbook, r, false))
            .collect();

        if !self.options.resolve_indirect {
            return targets;
        }

        for argument in indirect_arguments(formula) {
            let ctx = EvaluationContext::new(self.store, &at.workbook, &at.sheet, at.cell);
            let resolution = resolve_indirect(argument, &ctx);
            if !resolution.is_complete() {
                walk.summary.unresolved_indirects.push(UnresolvedIndirect {
                    cell: key.clone(),
                    expression: argument.to_string(),
                    partial: resolution.address,
                });
                continue;
            }

            let address = format!("={}", resolution.address);
            let late = extract_references(&address, &at.workbook, &at.sheet);
            if late.is_empty() {
                tracing::warn!(
                    cell = %key,
                    address = %resolution.address,
                    "INDIRECT address is not a cell reference"
                );
            }
            targets.extend(
                late.into_iter()
                    .map(|r| walk.target_for(self, &at.workbook, r, true)),
            );
        }

        targets
    }
}

/// Payload for a cell that is not expanded further
fn leaf_kind(record: CellRecord) -> NodeKind {
    match record.cell_type {
        CellType::Error => NodeKind::Error {
            message: record
                .error_message
                .unwrap_or_else(|| record.display_value.to_string()),
            value: record.display_value,
        },
        CellType::Value | CellType::Formula => NodeKind::Value {
            value: record.display_value,
            calculated_value: record.calculated_value,
        },
    }
}

/// A cell to visit
#[derive(Debug, Clone)]
struct Target {
    workbook: PathBuf,
    sheet: String,
    cell: CellAddress,
    late_bound: bool,
}

impl Target {
    fn key(&self) -> CellKey {
        CellKey::new(&self.workbook, &self.sheet, self.cell)
    }
}

/// A formula cell whose children are still being expanded
struct Frame {
    node: DependencyNode,
    key: CellKey,
    pending: std::vec::IntoIter<Target>,
}

enum Visit {
    Leaf(DependencyNode),
    Open(Frame),
}

/// State owned by one explosion
struct Walk {
    root_workbook: PathBuf,
    /// Cells with an open frame
    visited: AHashSet<CellKey>,
    /// Open frames' cells, root first
    path: Vec<CellKey>,
    /// Link tables, built on first use per workbook
    tables: AHashMap<PathBuf, ExternalLinkTable>,
    summary: ExplosionSummary,
}

impl Walk {
    fn new(root_workbook: PathBuf) -> Self {
        Self {
            root_workbook,
            visited: AHashSet::new(),
            path: Vec::new(),
            tables: AHashMap::new(),
            summary: ExplosionSummary::default(),
        }
    }

    fn enter(&mut self, key: CellKey) {
        self.visited.insert(key.clone());
        self.path.push(key);
    }

    fn leave(&mut self, key: &CellKey) {
        self.visited.remove(key);
        self.path.pop();
    }

    fn record_cycle(&mut self, key: &CellKey) {
        let start = self.path.iter().position(|k| k == key).unwrap_or(0);
        let mut chain = self.path[start..].to_vec();
        chain.push(key.clone());
        self.summary.circular_references.push(CircularReference {
            cell: key.clone(),
            chain,
        });
    }

    fn link_table(&mut self, exploder: &Exploder<'_>, workbook: &Path) -> &ExternalLinkTable {
        self.tables.entry(workbook.to_path_buf()).or_insert_with(|| {
            ExternalLinkTable::build(
                exploder.store,
                exploder.links,
                workbook,
                &exploder.options.link_fallback_candidates,
            )
        })
    }

    /// Bind a reference found in a formula of `owner` to a concrete workbook.
    ///
    /// Bracket indices go through `owner`'s own link table.
    fn target_for(
        &mut self,
        exploder: &Exploder<'_>,
        owner: &Path,
        reference: Reference,
        late_bound: bool,
    ) -> Target {
        let workbook = match reference.link_index {
            None => normalize_path(&reference.workbook),
            Some(index) => {
                let resolved = self
                    .link_table(exploder, owner)
                    .resolve(index)
                    .map(Path::to_path_buf);
                resolved.unwrap_or_else(|| {
                    tracing::warn!(
                        index,
                        workbook = %owner.display(),
                        "unknown external link index"
                    );
                    self.summary.unknown_links.insert(index);
                    ExternalLinkTable::placeholder(index)
                })
            }
        };

        Target {
            workbook,
            sheet: reference.sheet,
            cell: reference.cell,
            late_bound,
        }
    }

    fn node(&self, target: &Target, depth: usize, kind: NodeKind) -> DependencyNode {
        let display = display_address(
            &self.root_workbook,
            &target.workbook,
            &target.sheet,
            target.cell,
            depth == 0,
        );
        let mut node = DependencyNode::new(
            display,
            target.workbook.clone(),
            target.sheet.clone(),
            target.cell,
            depth,
            kind,
        );
        node.late_bound = target.late_bound;
        node
    }

    fn error_leaf(&self, target: &Target, depth: usize, error: ReadError) -> DependencyNode {
        tracing::warn!(cell = %target.key(), error = %error, "cannot read cell");
        let kind = NodeKind::Error {
            value: CellValue::string("Error"),
            message: error.to_string(),
        };
        self.node(target, depth, kind)
    }
}
