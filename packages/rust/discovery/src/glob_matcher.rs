//! Filesystem pattern matcher backed by the `glob` crate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::MatchOptions;

use specmerge_shared::{Result, SpecmergeError};

use crate::PatternMatcher;

/// Matches patterns against the local filesystem.
///
/// Relative patterns are resolved against `root`. Directories are skipped;
/// the walk itself runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    root: PathBuf,
}

/// `*` never crosses `/` and never matches a leading dot.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

impl GlobMatcher {
    /// Matcher rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_pattern(&self, pattern: &str) -> String {
        if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            self.root.join(pattern).to_string_lossy().into_owned()
        }
    }
}

impl Default for GlobMatcher {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl PatternMatcher for GlobMatcher {
    async fn resolve(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let full = self.full_pattern(pattern);
        let original = pattern.to_string();

        tokio::task::spawn_blocking(move || walk(&original, &full))
            .await
            .map_err(|e| SpecmergeError::discovery(pattern, format!("matcher task failed: {e}")))?
    }
}

fn walk(pattern: &str, full: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob_with(full, MATCH_OPTIONS)
        .map_err(|e| SpecmergeError::discovery(pattern, e.to_string()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SpecmergeError::discovery(pattern, e.to_string()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}
