//! Index schema: which files each rule covers and which policy formats them.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
/// Top-level index configuration.
pub struct Index {
    #[serde(default)]
    pub rules: Vec<RuleIndex>,
}

#[derive(Debug, Clone, Deserialize)]
/// A format rule entry from the index.
pub struct RuleIndex {
    pub id: String,
    /// Globs relative to the repository root.
    pub patterns: Vec<String>,
    /// Policy path relative to the index file.
    pub policy: String,
}
