//! Dependency tree nodes
//!
//! Every node shares one envelope (identity, display forms, depth, children)
//! and carries a [`NodeKind`] payload for what was found at that cell.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use sheet_lineage_core::{CellAddress, CellValue};

use crate::display::DisplayAddress;

/// Node type tag, as reported in summaries and serialized trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeType {
    Formula,
    Value,
    Error,
    CircularRef,
    LimitReached,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Formula => "formula",
            NodeType::Value => "value",
            NodeType::Error => "error",
            NodeType::CircularRef => "circular_ref",
            NodeType::LimitReached => "limit_reached",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node found at its cell
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A formula cell; its references are the node's children
    Formula {
        /// Display value (the formula bar text)
        value: CellValue,
        calculated_value: CellValue,
        /// Formula text cleaned for display
        formula: String,
    },
    /// A constant
    Value {
        value: CellValue,
        calculated_value: CellValue,
    },
    /// An error constant in the cell, or a failed read
    Error { value: CellValue, message: String },
    /// The cell is already open on the path from the root
    CircularRef,
    /// The depth limit was reached before the cell was read
    LimitReached,
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Formula { .. } => NodeType::Formula,
            NodeKind::Value { .. } => NodeType::Value,
            NodeKind::Error { .. } => NodeType::Error,
            NodeKind::CircularRef => NodeType::CircularRef,
            NodeKind::LimitReached => NodeType::LimitReached,
        }
    }

    /// Value column of the flat record
    pub fn value(&self) -> Cow<'_, CellValue> {
        match self {
            NodeKind::Formula { value, .. }
            | NodeKind::Value { value, .. }
            | NodeKind::Error { value, .. } => Cow::Borrowed(value),
            NodeKind::CircularRef => Cow::Owned(CellValue::string("Circular reference")),
            NodeKind::LimitReached => Cow::Owned(CellValue::string("Max depth reached")),
        }
    }

    pub fn calculated_value(&self) -> Option<&CellValue> {
        match self {
            NodeKind::Formula {
                calculated_value, ..
            }
            | NodeKind::Value {
                calculated_value, ..
            } => Some(calculated_value),
            _ => None,
        }
    }

    pub fn formula(&self) -> Option<&str> {
        match self {
            NodeKind::Formula { formula, .. } => Some(formula),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            NodeKind::Error { message, .. } => Some(message),
            NodeKind::CircularRef => Some("Circular reference detected"),
            NodeKind::LimitReached => Some("Maximum recursion depth reached"),
            _ => None,
        }
    }
}

/// One cell in the dependency tree
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    pub address: String,
    pub short_address: String,
    pub full_address: String,
    pub workbook_path: PathBuf,
    pub sheet_name: String,
    pub cell_address: CellAddress,
    pub depth: usize,
    /// Reached through an `INDIRECT(...)` address rather than written out
    pub late_bound: bool,
    pub kind: NodeKind,
    /// Dependencies in extraction order
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn new(
        display: DisplayAddress,
        workbook_path: PathBuf,
        sheet_name: String,
        cell_address: CellAddress,
        depth: usize,
        kind: NodeKind,
    ) -> Self {
        Self {
            address: display.address,
            short_address: display.short,
            full_address: display.full,
            workbook_path,
            sheet_name,
            cell_address: cell_address.unanchored(),
            depth,
            late_bound: false,
            kind,
            children: Vec::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Pre-order iterator over this node and all descendants
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Number of nodes in the tree rooted here
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// First node in pre-order whose short or local address matches
    pub fn find(&self, address: &str) -> Option<&DependencyNode> {
        self.iter()
            .find(|n| n.address == address || n.short_address == address)
    }
}

/// Pre-order traversal of a [`DependencyNode`] tree
pub struct Iter<'a> {
    stack: Vec<&'a DependencyNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a DependencyNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

impl<'a> IntoIterator for &'a DependencyNode {
    type Item = &'a DependencyNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DependencyNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("DependencyNode", 14)?;
        s.serialize_field("address", &self.address)?;
        s.serialize_field("short_address", &self.short_address)?;
        s.serialize_field("full_address", &self.full_address)?;
        s.serialize_field("workbook_path", &self.workbook_path.to_string_lossy())?;
        s.serialize_field("sheet_name", &self.sheet_name)?;
        s.serialize_field("cell_address", &self.cell_address)?;
        s.serialize_field("depth", &self.depth)?;
        s.serialize_field("late_bound", &self.late_bound)?;
        s.serialize_field("type", &self.node_type())?;
        s.serialize_field("value", self.kind.value().as_ref())?;
        s.serialize_field("calculated_value", &self.kind.calculated_value())?;
        s.serialize_field("formula", &self.kind.formula())?;
        s.serialize_field("error", &self.kind.error())?;
        s.serialize_field("children", &self.children)?;
        s.end()
    }
}
