//! Application configuration for specmerge.
//!
//! Project config lives at `./specmerge.toml` unless `--config` says otherwise.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecmergeError};
use crate::types::EntryMode;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "specmerge.toml";

/// Written by `specmerge config init`.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"[output]
path = "openapi.json"
pretty = true

[merge]
# Directory relative glob patterns are resolved against.
root = "."
# "first" keeps only the first entry of each extracted mapping, "all" keeps every entry.
entry_mode = "first"
# Keep components.schemas from the base structure instead of resetting it.
preserve_schemas = false

[build.baseStructure.info]
title = "app"
version = "1.0.0"

[build.routes]
globs = ["routes/**/*.json", "routes/**/*.yaml", "routes/**/*.yml", "routes/**/*.toml"]
variableName = "route"

[build.schemas]
globs = ["schemas/**/*.json", "schemas/**/*.yaml", "schemas/**/*.yml", "schemas/**/*.toml"]
variableName = "schema"
"#;

// ---------------------------------------------------------------------------
// Config structs (matching specmerge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where and how the document is written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Merge behaviour.
    #[serde(default)]
    pub merge: MergeConfig,

    /// The build request (`baseStructure`, `routes`, `schemas`).
    ///
    /// Kept untyped: it goes through options validation at build time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<serde_json::Value>,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file for the assembled document.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Pretty-print the JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            pretty: true,
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("openapi.json")
}
fn default_true() -> bool {
    true
}

/// `[merge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Root directory for relative glob patterns.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// How many entries of each extracted mapping are merged.
    #[serde(default)]
    pub entry_mode: EntryMode,

    /// Keep caller-supplied `components.schemas`.
    #[serde(default)]
    pub preserve_schemas: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            entry_mode: EntryMode::default(),
            preserve_schemas: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file in the given directory.
pub fn config_file_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load the config at `path`. Returns defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SpecmergeError::io(path, e))?;
    parse_config(&content)
        .map_err(|e| SpecmergeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Parse config from TOML text.
pub fn parse_config(content: &str) -> std::result::Result<AppConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Write a default config file at `path`. Refuses to overwrite.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(SpecmergeError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SpecmergeError::io(parent, e))?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| SpecmergeError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}
