//! Core domain types for assembled API documents.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only OpenAPI version specmerge emits.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// Title installed when the base structure has none.
pub const DEFAULT_TITLE: &str = "app";

/// Version installed when the base structure has none.
pub const DEFAULT_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// BaseDocument
// ---------------------------------------------------------------------------

/// The document being assembled, after base-structure normalization.
///
/// Known fields are typed; everything else the caller put in the skeleton
/// (`servers`, `tags`, `x-*` extensions, ...) rides along in `extra` and is
/// serialized back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseDocument {
    /// OpenAPI version literal.
    pub openapi: String,
    /// The `info` object.
    pub info: Info,
    /// Path key → path item.
    #[serde(default)]
    pub paths: Map<String, Value>,
    /// The `components` object.
    #[serde(default)]
    pub components: Components,
    /// Other top-level fields, passed through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `info` object. `title` and `version` are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            version: DEFAULT_VERSION.to_string(),
            extra: Map::new(),
        }
    }
}

/// The `components` object. Only `schemas` is managed; other component
/// kinds (`securitySchemes`, `responses`, ...) pass through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for BaseDocument {
    fn default() -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info::default(),
            paths: Map::new(),
            components: Components::default(),
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Which part of the document a set of definition files contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Route,
    Schema,
}

impl Category {
    /// Exported member looked up when the options name none.
    pub fn default_variable_name(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Schema => "schema",
        }
    }

    /// Key of this category's options in a build request.
    pub fn options_key(self) -> &'static str {
        match self {
            Self::Route => "routes",
            Self::Schema => "schemas",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.options_key())
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// A single `(key, value)` pair pulled out of one definition file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntry {
    /// Path key or schema name.
    pub key: String,
    /// Path item or schema definition.
    pub value: Value,
    /// File the entry came from.
    pub source: PathBuf,
}

/// How many entries of an extracted mapping are carried forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// Only the first entry in document order; the rest are dropped.
    #[default]
    First,
    /// Every entry of the mapping.
    All,
}

impl std::str::FromStr for EntryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(format!("unknown entry mode '{other}' (expected first or all)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_document_keeps_unknown_fields() {
        let raw = json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "v", "description": "d"},
            "paths": {},
            "components": {"schemas": {}, "securitySchemes": {"key": {"type": "apiKey"}}},
            "servers": [{"url": "https://api.example.com"}]
        });

        let doc: BaseDocument = serde_json::from_value(raw.clone()).expect("deserialize");
        assert_eq!(doc.info.extra["description"], "d");
        assert!(doc.components.extra.contains_key("securitySchemes"));
        assert_eq!(serde_json::to_value(&doc).expect("serialize"), raw);
    }

    #[test]
    fn category_names() {
        assert_eq!(Category::Route.default_variable_name(), "route");
        assert_eq!(Category::Schema.default_variable_name(), "schema");
        assert_eq!(Category::Schema.to_string(), "schemas");
    }

    #[test]
    fn entry_mode_parses() {
        assert_eq!("all".parse::<EntryMode>(), Ok(EntryMode::All));
        assert_eq!("first".parse::<EntryMode>(), Ok(EntryMode::First));
        assert!("some".parse::<EntryMode>().is_err());
    }
}
