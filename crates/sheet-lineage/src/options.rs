//! Explosion options

/// Sibling files probed, in order, when a workbook declares no external links
pub const DEFAULT_LINK_CANDIDATES: &[&str] = &[
    "Link1.xlsx",
    "Link2.xlsx",
    "Link3.xlsx",
    "File1.xlsx",
    "File2.xlsx",
    "File3.xlsx",
    "Data.xlsx",
    "GDP.xlsx",
    "Test.xlsx",
];

/// Options for a dependency explosion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplodeOptions {
    /// Depth at which traversal stops and emits a limit leaf (default: 10)
    pub max_depth: usize,
    /// Follow the addresses built by `INDIRECT(...)` calls (default: true)
    pub resolve_indirect: bool,
    /// File names probed next to a workbook whose link table is empty
    pub link_fallback_candidates: Vec<String>,
}

impl Default for ExplodeOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            resolve_indirect: true,
            link_fallback_candidates: DEFAULT_LINK_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ExplodeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_resolve_indirect(mut self, resolve: bool) -> Self {
        self.resolve_indirect = resolve;
        self
    }

    /// Replace the fallback file list; an empty list disables probing
    pub fn with_link_fallback_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.link_fallback_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }
}
