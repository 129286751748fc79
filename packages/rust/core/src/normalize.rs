//! Base structure normalization.
//!
//! Turns a caller-supplied skeleton into a [`BaseDocument`] with every
//! required field present. The input is never mutated; the result shares no
//! structure with it.

use serde_json::{Map, Value};

use specmerge_shared::{
    BaseDocument, DEFAULT_TITLE, DEFAULT_VERSION, OPENAPI_VERSION, Result, SpecmergeError,
};

/// Knobs for [`normalize_base_structure`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Keep `components.schemas` from the skeleton instead of resetting it.
    pub preserve_schemas: bool,
}

/// Apply defaults to a document skeleton.
///
/// - `openapi` is forced to `3.0.0`.
/// - A missing `info` becomes `{title: "app", version: "1.0.0"}`; a partial
///   one gets only the missing fields.
/// - A missing `paths` becomes `{}`.
/// - `components.schemas` is reset to `{}` unless `preserve_schemas` is set.
///   Other component kinds are kept.
pub fn normalize_base_structure(base: &Value, options: &NormalizeOptions) -> Result<BaseDocument> {
    let Some(source) = base.as_object() else {
        return Err(SpecmergeError::validation("base structure must be an object"));
    };

    let mut doc = source.clone();
    doc.insert("openapi".into(), Value::String(OPENAPI_VERSION.into()));

    let mut info = optional_object(&doc, "info")?;
    fill_string(&mut info, "title", DEFAULT_TITLE)?;
    fill_string(&mut info, "version", DEFAULT_VERSION)?;
    doc.insert("info".into(), Value::Object(info));

    let paths = optional_object(&doc, "paths")?;
    doc.insert("paths".into(), Value::Object(paths));

    let mut components = optional_object(&doc, "components")?;
    let schemas = if options.preserve_schemas {
        optional_object(&components, "schemas")?
    } else {
        if components.get("schemas").is_some_and(|s| !s.is_null()) {
            tracing::debug!("discarding components.schemas from base structure");
        }
        Map::new()
    };
    components.insert("schemas".into(), Value::Object(schemas));
    doc.insert("components".into(), Value::Object(components));

    serde_json::from_value(Value::Object(doc))
        .map_err(|e| SpecmergeError::validation(format!("malformed base structure: {e}")))
}

/// The object at `key`, an empty object if absent or null, an error otherwise.
fn optional_object(map: &Map<String, Value>, key: &str) -> Result<Map<String, Value>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(inner)) => Ok(inner.clone()),
        Some(_) => Err(SpecmergeError::validation(format!(
            "`{key}` must be an object"
        ))),
    }
}

fn fill_string(map: &mut Map<String, Value>, key: &str, default: &str) -> Result<()> {
    match map.get(key) {
        None | Some(Value::Null) => {
            map.insert(key.into(), Value::String(default.into()));
            Ok(())
        }
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(SpecmergeError::validation(format!(
            "`info.{key}` must be a string"
        ))),
    }
}
