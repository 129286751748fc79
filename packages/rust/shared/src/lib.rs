//! Shared types, error model, and configuration for specmerge.
//!
//! This crate is the foundation depended on by all other specmerge crates.
//! It provides:
//! - [`SpecmergeError`]: the unified error type
//! - Domain types ([`BaseDocument`], [`Category`], [`ExtractedEntry`], [`EntryMode`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, MergeConfig, OutputConfig, config_file_path, init_config,
    load_config, load_config_from, parse_config,
};
pub use error::{Result, SpecmergeError};
pub use types::{
    BaseDocument, Category, Components, DEFAULT_TITLE, DEFAULT_VERSION, EntryMode,
    ExtractedEntry, Info, OPENAPI_VERSION,
};
