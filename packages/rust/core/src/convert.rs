//! Conversion hook: turns a raw extracted member into path/schema entries.
//!
//! A converter is caller code. When it fails, or returns something other than
//! a non-empty object, the build stops with a conversion error; unlike
//! discovery and load failures this is not absorbed.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use specmerge_shared::{EntryMode, ExtractedEntry, Result, SpecmergeError};

/// Error type converters may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type ConvertFn = dyn Fn(&Value) -> std::result::Result<Value, BoxError> + Send + Sync;

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// A caller-supplied transform from a raw member to a key → definition mapping.
#[derive(Clone)]
pub struct Converter {
    func: Arc<ConvertFn>,
}

impl Converter {
    /// Wrap a conversion function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Run the conversion.
    pub fn convert(&self, raw: &Value) -> std::result::Result<Value, BoxError> {
        (self.func)(raw)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Converter(..)")
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Converters addressable by name from loosely-typed build input.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: BTreeMap<String, Converter>,
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `keyed-by-path` and `keyed-by-name`.
    pub fn with_builtins() -> Self {
        Self::new()
            .register("keyed-by-path", Converter::new(keyed_by_path))
            .register("keyed-by-name", Converter::new(keyed_by_name))
    }

    /// Add or replace a converter.
    pub fn register(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.converters.insert(name.into(), converter);
        self
    }

    /// Look up a converter by name.
    pub fn get(&self, name: &str) -> Option<&Converter> {
        self.converters.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.converters.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Built-in converters
// ---------------------------------------------------------------------------

/// `{"path": "/users", "method": "GET", ...operation}` → `{"/users": {"get": operation}}`.
pub fn keyed_by_path(raw: &Value) -> std::result::Result<Value, BoxError> {
    let mut operation = raw
        .as_object()
        .cloned()
        .ok_or("route definition must be an object")?;
    let path = take_string(&mut operation, "path")?;
    let method = take_string(&mut operation, "method")?.to_lowercase();

    let mut item = Map::new();
    item.insert(method, Value::Object(operation));
    let mut out = Map::new();
    out.insert(path, Value::Object(item));
    Ok(Value::Object(out))
}

/// `{"name": "User", ...schema}` → `{"User": schema}`.
pub fn keyed_by_name(raw: &Value) -> std::result::Result<Value, BoxError> {
    let mut schema = raw
        .as_object()
        .cloned()
        .ok_or("schema definition must be an object")?;
    let name = take_string(&mut schema, "name")?;

    let mut out = Map::new();
    out.insert(name, Value::Object(schema));
    Ok(Value::Object(out))
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> std::result::Result<String, BoxError> {
    match map.shift_remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(format!("missing string field `{key}`").into()),
    }
}

// ---------------------------------------------------------------------------
// Hook
// ---------------------------------------------------------------------------

/// Apply `converter` to `raw`, or pass `raw` through when there is none.
///
/// Converter output must be a non-empty object.
pub fn apply_converter(raw: &Value, converter: Option<&Converter>, source: &Path) -> Result<Value> {
    let Some(converter) = converter else {
        return Ok(raw.clone());
    };

    let converted = converter
        .convert(raw)
        .map_err(|e| SpecmergeError::conversion(source, e.to_string()))?;

    match converted.as_object() {
        Some(map) if !map.is_empty() => Ok(converted),
        Some(_) => Err(SpecmergeError::conversion(
            source,
            "converter returned an empty object",
        )),
        None => Err(SpecmergeError::conversion(
            source,
            "converter must return an object",
        )),
    }
}

/// Split a mapping into entries.
///
/// Returns `None` when `value` is not a non-empty object. With
/// [`EntryMode::First`] only the first entry in document order is kept.
pub fn entries_from(value: &Value, mode: EntryMode, source: &Path) -> Option<Vec<ExtractedEntry>> {
    let map = value.as_object().filter(|m| !m.is_empty())?;

    let take = match mode {
        EntryMode::First => 1,
        EntryMode::All => map.len(),
    };

    Some(
        map.iter()
            .take(take)
            .map(|(key, value)| ExtractedEntry {
                key: key.clone(),
                value: value.clone(),
                source: source.to_path_buf(),
            })
            .collect(),
    )
}
