//! Build request and discovery options, with validation of loosely-typed input.
//!
//! Validation runs before any I/O: an invalid request aborts the build with
//! no files touched.

use serde_json::{Map, Value};

use specmerge_shared::{Category, Result, SpecmergeError};

use crate::convert::{Converter, ConverterRegistry};

// ---------------------------------------------------------------------------
// DiscoveryOptions
// ---------------------------------------------------------------------------

/// How to find and read the definition files of one category.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Glob patterns, resolved in order.
    pub globs: Vec<String>,
    /// Exported member to extract; defaults to the category name.
    pub variable_name: Option<String>,
    /// Optional transform applied to each extracted member.
    pub converter: Option<Converter>,
}

impl DiscoveryOptions {
    /// Options with the given patterns and no converter.
    pub fn new<I, S>(globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globs: globs.into_iter().map(Into::into).collect(),
            variable_name: None,
            converter: None,
        }
    }

    /// Extract `name` instead of the category default.
    pub fn with_variable_name(mut self, name: impl Into<String>) -> Self {
        self.variable_name = Some(name.into());
        self
    }

    /// Run every extracted member through `converter`.
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// The member name to look up for `category`.
    pub fn variable_name_for(&self, category: Category) -> &str {
        self.variable_name
            .as_deref()
            .unwrap_or_else(|| category.default_variable_name())
    }
}

// ---------------------------------------------------------------------------
// BuildRequest
// ---------------------------------------------------------------------------

/// Everything a build needs from its caller.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Document skeleton; normalized before anything is merged into it.
    pub base_structure: Value,
    /// Where path definitions come from.
    pub routes: DiscoveryOptions,
    /// Where schema definitions come from.
    pub schemas: DiscoveryOptions,
}

impl BuildRequest {
    pub fn new(base_structure: Value, routes: DiscoveryOptions, schemas: DiscoveryOptions) -> Self {
        Self {
            base_structure,
            routes,
            schemas,
        }
    }

    /// Options for `category`.
    pub fn options(&self, category: Category) -> &DiscoveryOptions {
        match category {
            Category::Route => &self.routes,
            Category::Schema => &self.schemas,
        }
    }

    /// Validate `{ baseStructure, routes, schemas }` and build a request.
    ///
    /// Converters are referenced by name and resolved against `converters`.
    pub fn from_value(input: &Value, converters: &ConverterRegistry) -> Result<Self> {
        let Some(input) = input.as_object() else {
            return Err(SpecmergeError::validation(
                "build options must be an object with `baseStructure`, `routes` and `schemas`",
            ));
        };

        let base_structure = match input.get("baseStructure") {
            Some(value) if value.is_object() => value.clone(),
            Some(_) => {
                return Err(SpecmergeError::validation(
                    "`baseStructure` must be an object",
                ));
            }
            None => return Err(SpecmergeError::validation("`baseStructure` is required")),
        };

        let routes = validate_category(input, Category::Route, converters)?;
        let schemas = validate_category(input, Category::Schema, converters)?;

        Ok(Self::new(base_structure, routes, schemas))
    }
}

fn validate_category(
    input: &Map<String, Value>,
    category: Category,
    converters: &ConverterRegistry,
) -> Result<DiscoveryOptions> {
    let value = input.get(category.options_key()).unwrap_or(&Value::Null);
    validate_discovery_options(category, value, converters)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate one category's options.
///
/// Checks, in order: the value is an object; `globs` is an array of strings;
/// `converter`, when present, names a registered converter; `variableName`,
/// when present, is a string.
pub fn validate_discovery_options(
    category: Category,
    value: &Value,
    converters: &ConverterRegistry,
) -> Result<DiscoveryOptions> {
    let fail = |msg: String| Err(SpecmergeError::validation(format!("{category}: {msg}")));

    let Some(options) = value.as_object() else {
        return fail("options must be an object".into());
    };

    let globs = match options.get("globs") {
        None => return fail("`globs` is required".into()),
        Some(Value::Array(items)) => items,
        Some(_) => return fail("`globs` must be an array of strings".into()),
    };
    let mut patterns = Vec::with_capacity(globs.len());
    for (i, item) in globs.iter().enumerate() {
        match item.as_str() {
            Some(pattern) => patterns.push(pattern.to_string()),
            None => return fail(format!("`globs[{i}]` must be a string")),
        }
    }

    let converter = match options.get("converter") {
        None => None,
        Some(Value::String(name)) => match converters.get(name) {
            Some(converter) => Some(converter.clone()),
            None => return fail(format!("unknown converter '{name}'")),
        },
        Some(_) => return fail("`converter` must be the name of a registered converter".into()),
    };

    let variable_name = match options.get("variableName") {
        None => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(_) => return fail("`variableName` must be a string".into()),
    };

    Ok(DiscoveryOptions {
        globs: patterns,
        variable_name,
        converter,
    })
}
