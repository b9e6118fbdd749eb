//! Explosion summaries

use std::collections::{BTreeMap, BTreeSet};

use sheet_lineage_core::CellKey;

use crate::node::{DependencyNode, NodeType};

/// A cycle found during traversal
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircularReference {
    /// The cell that was reached a second time
    pub cell: CellKey,
    /// Path from the first occurrence of `cell` down to the repeat, inclusive
    pub chain: Vec<CellKey>,
}

/// An `INDIRECT(...)` argument that could not be fully resolved
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnresolvedIndirect {
    /// Cell holding the formula
    pub cell: CellKey,
    /// The argument text
    pub expression: String,
    /// What could be built, with unresolved parts left as written
    pub partial: String,
}

/// Statistics for one explosion
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExplosionSummary {
    /// Every node in the tree, root included
    pub total_nodes: usize,
    /// Deepest node depth
    pub max_depth: usize,
    pub type_distribution: BTreeMap<NodeType, usize>,
    pub circular_references: Vec<CircularReference>,
    pub unresolved_indirects: Vec<UnresolvedIndirect>,
    /// Bracket link indices with no table entry
    pub unknown_links: BTreeSet<u32>,
}

impl ExplosionSummary {
    pub fn circular_reference_count(&self) -> usize {
        self.circular_references.len()
    }

    /// Count of nodes of one type
    pub fn count_of(&self, node_type: NodeType) -> usize {
        self.type_distribution.get(&node_type).copied().unwrap_or(0)
    }

    /// Fill the tree statistics from a finished tree
    pub(crate) fn tally(&mut self, root: &DependencyNode) {
        self.total_nodes = 0;
        self.max_depth = 0;
        self.type_distribution.clear();

        for node in root {
            self.total_nodes += 1;
            self.max_depth = self.max_depth.max(node.depth);
            *self.type_distribution.entry(node.node_type()).or_insert(0) += 1;
        }
    }
}
