//! Store Configuration
//!
//! Runtime-selectable behaviour for a [`LabelStore`](crate::LabelStore).
//!
//! # Example
//! ```
//! use labelstore::{StoreConfig, QueryMode};
//!
//! // Strict queries (default): malformed queries are errors
//! let config = StoreConfig::default();
//!
//! // Lenient queries, drop empty buckets eagerly
//! let config = StoreConfig::new(QueryMode::Lenient).prune_empty_buckets(true);
//! assert!(config.prune_empty_buckets);
//! ```

use serde::Deserialize;

/// How malformed label queries are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Malformed queries fail with `InvalidQuery` (default)
    #[default]
    Strict,

    /// Malformed queries evaluate to an empty result and log a warning
    Lenient,
}

impl QueryMode {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "lenient" | "loose" | "empty" => QueryMode::Lenient,
            "strict" | "error" => QueryMode::Strict,
            _ => QueryMode::default(),
        }
    }
}

/// Label store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Malformed query handling
    pub query_mode: QueryMode,
    /// Remove value buckets (and key maps) once they become empty
    pub prune_empty_buckets: bool,
    /// Run resource self-validation on delete
    pub validate_on_delete: bool,
    /// Pre-sized capacity of the identity index
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            query_mode: QueryMode::default(),
            prune_empty_buckets: false,
            validate_on_delete: true,
            initial_capacity: 0,
        }
    }
}

impl StoreConfig {
    /// Create config with specific query mode
    pub fn new(query_mode: QueryMode) -> Self {
        Self {
            query_mode,
            ..Default::default()
        }
    }

    pub fn query_mode(mut self, mode: QueryMode) -> Self {
        self.query_mode = mode;
        self
    }

    pub fn prune_empty_buckets(mut self, prune: bool) -> Self {
        self.prune_empty_buckets = prune;
        self
    }

    pub fn validate_on_delete(mut self, validate: bool) -> Self {
        self.validate_on_delete = validate;
        self
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn is_strict(&self) -> bool {
        matches!(self.query_mode, QueryMode::Strict)
    }
}
