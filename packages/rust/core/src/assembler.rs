//! Document assembler.
//!
//! Folds extracted path and schema entries into the normalized document and
//! serializes the result. Insertions happen in discovery order on a single
//! task; on a key collision the later entry wins.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use specmerge_shared::{BaseDocument, Category, ExtractedEntry, Result, SpecmergeError};

/// A key written more than once during assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overwrite {
    /// Section the key lives in.
    pub category: Category,
    /// Path key or schema name.
    pub key: String,
    /// File whose entry won.
    pub winner: PathBuf,
    /// File whose entry was replaced; `None` when it came from the base structure.
    pub replaced: Option<PathBuf>,
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    /// The serialized document.
    pub document: Value,
    /// Keys that were overwritten, in the order the overwrites happened.
    pub overwritten: Vec<Overwrite>,
}

// ---------------------------------------------------------------------------
// DocumentBuilder
// ---------------------------------------------------------------------------

/// Accumulates path and schema insertions on top of a base document.
///
/// No validation is performed on inserted values.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    document: BaseDocument,
}

impl DocumentBuilder {
    pub fn new(document: BaseDocument) -> Self {
        Self { document }
    }

    /// Insert a path item. Returns the value it replaced, if any.
    pub fn insert_path(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.document.paths.insert(key.into(), value)
    }

    /// Insert a schema under `components.schemas`. Returns the value it replaced, if any.
    pub fn insert_schema(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.document.components.schemas.insert(key.into(), value)
    }

    /// Insert an entry into the section `category` targets.
    pub fn insert(&mut self, category: Category, entry: ExtractedEntry) -> Option<Value> {
        match category {
            Category::Route => self.insert_path(entry.key, entry.value),
            Category::Schema => self.insert_schema(entry.key, entry.value),
        }
    }

    /// The document as assembled so far.
    pub fn document(&self) -> &BaseDocument {
        &self.document
    }

    /// Serialize to the externally-visible document shape.
    pub fn serialize(&self) -> Result<Value> {
        serde_json::to_value(&self.document).map_err(|e| SpecmergeError::Serialize(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Insert `routes` then `schemas` into `document` and serialize it.
#[instrument(skip_all, fields(routes = routes.len(), schemas = schemas.len()))]
pub fn assemble(
    document: BaseDocument,
    routes: Vec<ExtractedEntry>,
    schemas: Vec<ExtractedEntry>,
) -> Result<AssembleResult> {
    let mut builder = DocumentBuilder::new(document);
    let mut overwritten = Vec::new();
    let mut sources: HashMap<(Category, String), PathBuf> = HashMap::new();

    for (category, entries) in [(Category::Route, routes), (Category::Schema, schemas)] {
        for entry in entries {
            let key = entry.key.clone();
            let source = entry.source.clone();
            let replaced = sources.insert((category, key.clone()), source.clone());
            if builder.insert(category, entry).is_some() {
                debug!(
                    %category,
                    %key,
                    winner = %source.display(),
                    replaced = ?replaced,
                    "key overwritten"
                );
                overwritten.push(Overwrite {
                    category,
                    key,
                    winner: source,
                    replaced,
                });
            }
        }
    }

    let document = builder.serialize()?;

    info!(
        paths = builder.document().paths.len(),
        schemas = builder.document().components.schemas.len(),
        overwritten = overwritten.len(),
        "document assembled"
    );

    Ok(AssembleResult {
        document,
        overwritten,
    })
}
