//! Engine configuration.

/// Default maximum nesting of related-object selects.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 5;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum nesting of related-object selects. Deeper option trees are
    /// rejected as invalid options.
    pub max_relation_depth: usize,

    /// Row limit applied when the caller supplies none. A caller limit is
    /// always used verbatim.
    pub row_ceiling: Option<u64>,

    /// Case rule for search when the caller does not set one.
    pub search_case_sensitive: bool,
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
            row_ceiling: None,
            search_case_sensitive: false,
        }
    }

    /// Set the maximum relation nesting depth.
    pub fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    /// Set the row ceiling used when no limit is supplied.
    pub fn with_row_ceiling(mut self, ceiling: u64) -> Self {
        self.row_ceiling = Some(ceiling);
        self
    }

    /// Make search case-sensitive by default.
    pub fn with_case_sensitive_search(mut self) -> Self {
        self.search_case_sensitive = true;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
