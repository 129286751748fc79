//! Glob-based discovery of definition files.
//!
//! Each pattern is resolved by a [`PatternMatcher`] on its own task; the
//! results are concatenated in pattern order no matter which task finishes
//! first. A pattern that fails contributes nothing, so one bad pattern never
//! hides the matches of the others.

mod glob_matcher;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use specmerge_shared::Result;

pub use glob_matcher::GlobMatcher;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Resolves one glob pattern into concrete file paths.
///
/// Implementations report failures as errors; [`discover`] absorbs them.
#[async_trait]
pub trait PatternMatcher: Send + Sync {
    /// Resolve `pattern` to the paths it matches, in the matcher's own order.
    async fn resolve(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

// ---------------------------------------------------------------------------
// Main entry points
// ---------------------------------------------------------------------------

/// Expand `patterns` into a flat list of paths.
///
/// Patterns are resolved concurrently, then concatenated in the order they
/// were given. Matches are not deduplicated across patterns.
#[instrument(skip_all, fields(patterns = patterns.len()))]
pub async fn discover(patterns: &[String], matcher: Arc<dyn PatternMatcher>) -> Vec<PathBuf> {
    let mut handles = Vec::with_capacity(patterns.len());

    for pattern in patterns {
        let matcher = matcher.clone();
        let pattern = pattern.clone();
        handles.push(tokio::spawn(async move {
            let result = matcher.resolve(&pattern).await;
            (pattern, result)
        }));
    }

    // Awaiting in spawn order keeps pattern order regardless of completion order
    let mut files = Vec::new();
    for handle in handles {
        match handle.await {
            Ok((pattern, Ok(paths))) => {
                debug!(%pattern, matches = paths.len(), "pattern resolved");
                files.extend(paths);
            }
            Ok((pattern, Err(e))) => {
                warn!(%pattern, error = %e, "pattern failed, contributing no files");
            }
            Err(e) => {
                warn!(error = %e, "pattern task aborted, contributing no files");
            }
        }
    }

    info!(files = files.len(), "discovery complete");
    files
}

/// Loosely-typed variant of [`discover`].
///
/// Anything other than an array of strings yields an empty list instead of
/// an error.
pub async fn discover_value(patterns: &Value, matcher: Arc<dyn PatternMatcher>) -> Vec<PathBuf> {
    let Some(items) = patterns.as_array() else {
        debug!("patterns is not an array, nothing to discover");
        return Vec::new();
    };

    let patterns: Option<Vec<String>> = items
        .iter()
        .map(|item| item.as_str().map(String::from))
        .collect();

    match patterns {
        Some(patterns) => discover(&patterns, matcher).await,
        None => {
            debug!("patterns contains a non-string element, nothing to discover");
            Vec::new()
        }
    }
}
