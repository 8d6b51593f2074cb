//! Embedder-supplied engine configuration.
//!
//! No CLI, no env-var layer, no config file — this is a plain struct an
//! embedder constructs in code and passes to the executor, built
//! programmatically rather than parsed from disk.

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Heuristic fixpoint bound (`2 * relationships.len()`), applied as a
    /// defensive ceiling even though convergence is actually detected by
    /// stable set sizes rather than by hitting this count.
    pub max_fixpoint_multiplier: usize,
    /// Namespace used when a MATCH node gives no explicit namespace and no
    /// query context supplies one.
    pub default_namespace: Option<String>,
    /// Capacity hint for the query-local regex cache backing `=~` filters.
    pub regex_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_fixpoint_multiplier: 2,
            default_namespace: None,
            regex_cache_capacity: 32,
        }
    }
}
