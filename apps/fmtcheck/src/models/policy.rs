//! Policy schema used by the JSON formatter and its lint checks.
//!
//! Key components:
//! - `order`: top-level key groups and per-field orders for nested objects.
//! - `linebreak`: blank lines between top-level groups and inside specific
//!   object fields via `before_fields` and `in_fields` maps.
//! - `checks`: lint rules the formatter cannot fix
//!   (required/type/pattern/enum/minLength/maxLength).

use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize, Clone)]
/// Root policy loaded from TOML files referenced by the index.
pub struct Policy {
    #[serde(default)]
    pub checks: Vec<Check>,
    #[serde(default)]
    pub order: Option<OrderSpec>,
    #[serde(default)]
    pub linebreak: Option<LineBreakSpec>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Controls object key ordering.
pub struct OrderSpec {
    #[serde(default)]
    pub top: Vec<Vec<String>>,
    /// Field name -> key order inside that (object) field.
    #[serde(default)]
    pub sub: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Line-break behavior configuration.
pub struct LineBreakSpec {
    #[serde(default)]
    pub between_groups: Option<bool>,
    #[serde(default)]
    pub before_fields: HashMap<String, LineBreakRule>,
    #[serde(default)]
    pub in_fields: HashMap<String, LineBreakRule>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Rule applied to line-break handling.
pub enum LineBreakRule {
    Keep,
    None,
}

impl LineBreakRule {
    /// Parse a config override; anything but `keep` means `None`.
    pub fn from_override(s: &str) -> LineBreakRule {
        match s {
            "keep" => LineBreakRule::Keep,
            _ => LineBreakRule::None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind")]
/// Lint checks evaluated against formatted content.
pub enum Check {
    #[serde(rename = "required")]
    Required {
        fields: Vec<String>,
        message: Option<String>,
    },
    #[serde(rename = "type")]
    Type {
        #[serde(default)]
        /// Map of dotted paths to expected kinds (string|number|integer|boolean|array|object|null)
        fields: HashMap<String, String>,
        message: Option<String>,
    },
    #[serde(rename = "pattern")]
    Pattern {
        field: String,
        regex: String,
        message: Option<String>,
    },
    #[serde(rename = "enum")]
    Enum {
        field: String,
        values: Vec<Json>,
        message: Option<String>,
    },
    #[serde(rename = "minLength")]
    MinLength {
        field: String,
        min: usize,
        message: Option<String>,
    },
    #[serde(rename = "maxLength")]
    MaxLength {
        field: String,
        max: usize,
        message: Option<String>,
    },
}
