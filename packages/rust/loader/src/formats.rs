//! Built-in definition file formats.

use std::path::Path;

use serde_json::Value;

use specmerge_shared::{Result, SpecmergeError};

use crate::DefinitionFormat;

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SpecmergeError::io(path, e))
}

/// `.json` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl DefinitionFormat for JsonFormat {
    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, &["json"])
    }

    fn load(&self, path: &Path) -> Result<Value> {
        let content = read(path)?;
        serde_json::from_str(&content).map_err(|e| SpecmergeError::load(path, e.to_string()))
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// `.yaml` / `.yml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl DefinitionFormat for YamlFormat {
    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, &["yaml", "yml"])
    }

    fn load(&self, path: &Path) -> Result<Value> {
        let content = read(path)?;
        serde_yaml::from_str(&content).map_err(|e| SpecmergeError::load(path, e.to_string()))
    }

    fn name(&self) -> &str {
        "yaml"
    }
}

/// `.toml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl DefinitionFormat for TomlFormat {
    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, &["toml"])
    }

    fn load(&self, path: &Path) -> Result<Value> {
        let content = read(path)?;
        let table: toml::Value =
            toml::from_str(&content).map_err(|e| SpecmergeError::load(path, e.to_string()))?;
        toml_to_json(table).map_err(|msg| SpecmergeError::load(path, msg))
    }

    fn name(&self) -> &str {
        "toml"
    }
}

/// Convert a TOML tree to JSON. Date/time values become their RFC 3339 strings.
fn toml_to_json(value: toml::Value) -> std::result::Result<Value, String> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| format!("float {f} has no JSON representation"))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<std::result::Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| toml_to_json(v).map(|v| (k, v)))
                .collect::<std::result::Result<_, _>>()?,
        ),
    })
}
