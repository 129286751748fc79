//! Loading definition files and extracting their exported members.
//!
//! A definition file's "exported members" are the top-level keys of the
//! parsed document. Which files can be loaded is decided by the
//! [`DefinitionFormat`]s registered in a [`FormatRegistry`]; the registry is
//! passed in explicitly so tests can swap formats without global state.
//!
//! Every failure on this path (no matching format, unreadable file, parse
//! error) degrades to `None`: one corrupt file never aborts a build.

mod formats;

use std::path::Path;

use serde_json::Value;
use tracing::{debug, trace};

use specmerge_shared::Result;

pub use formats::{JsonFormat, TomlFormat, YamlFormat};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A file format definition files can be written in.
///
/// `accepts` gates on the path alone; `load` is only called for accepted paths.
pub trait DefinitionFormat: Send + Sync {
    /// Whether this format handles `path`.
    fn accepts(&self, path: &Path) -> bool;

    /// Parse the file into a value.
    fn load(&self, path: &Path) -> Result<Value>;

    /// Human-readable format name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered formats in priority order.
pub struct FormatRegistry {
    formats: Vec<Box<dyn DefinitionFormat>>,
}

impl FormatRegistry {
    /// A registry with the built-in JSON, YAML, and TOML formats.
    pub fn new() -> Self {
        Self {
            formats: vec![
                Box::new(JsonFormat),
                Box::new(YamlFormat),
                Box::new(TomlFormat),
            ],
        }
    }

    /// A registry with no formats; nothing will load until one is registered.
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Append a format. Earlier registrations win when several accept a path.
    pub fn register(mut self, format: impl DefinitionFormat + 'static) -> Self {
        self.formats.push(Box::new(format));
        self
    }

    /// First format accepting `path`, if any.
    pub fn detect(&self, path: &Path) -> Option<&dyn DefinitionFormat> {
        self.formats
            .iter()
            .find(|f| f.accepts(path))
            .map(|f| f.as_ref())
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.formats.iter().map(|format| format.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Load the exported members of the file at `path`.
///
/// Returns `None` when no registered format accepts the path or loading fails.
pub fn load_members(path: &Path, registry: &FormatRegistry) -> Option<Value> {
    let Some(format) = registry.detect(path) else {
        trace!(path = %path.display(), "no definition format for path");
        return None;
    };

    match format.load(path) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), format = format.name(), error = %e, "failed to load definition file");
            None
        }
    }
}

/// Look up the member `name` in loaded file contents.
///
/// Only object-shaped contents are searched. A member bound to an absent
/// marker (`null`, `false`, `""`, `0`) counts as missing.
pub fn lookup_member<'a>(members: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    if name.is_empty() {
        return None;
    }

    let value = members?.as_object()?.get(name)?;
    if is_absent_marker(value) {
        return None;
    }
    Some(value)
}

fn is_absent_marker(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}
