//! Prelude module - common imports for sheet-lineage users
//!
//! ```rust
//! use sheet_lineage::prelude::*;
//! ```

pub use crate::{
    // Engine
    explode_dependencies,
    CellAddress,
    CellStore,
    CellValue,
    DependencyNode,
    ExplodeError,
    ExplodeOptions,
    Exploder,
    Explosion,
    ExplosionSummary,
    ExternalLinkSource,
    // Stores
    MemoryStore,
    NodeKind,
    NodeType,
    Workbook,
    Worksheet,
};

#[cfg(feature = "xlsx")]
pub use crate::{explode_file, XlsxStore};
