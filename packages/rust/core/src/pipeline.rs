//! End-to-end build: validate → normalize → routes → schemas → assemble → serialize.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use specmerge_discovery::{GlobMatcher, PatternMatcher};
use specmerge_loader::FormatRegistry;
use specmerge_shared::{Category, EntryMode, ExtractedEntry, Result};

use crate::assembler::{self, Overwrite};
use crate::convert::{self, ConverterRegistry};
use crate::normalize::{NormalizeOptions, normalize_base_structure};
use crate::options::{BuildRequest, DiscoveryOptions};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// The collaborators and knobs a build runs with.
pub struct BuildContext {
    /// Resolves glob patterns.
    pub matcher: Arc<dyn PatternMatcher>,
    /// Decides which files load and how.
    pub formats: FormatRegistry,
    /// How many entries of each extracted mapping are merged.
    pub entry_mode: EntryMode,
    /// Base structure defaulting.
    pub normalize: NormalizeOptions,
}

impl BuildContext {
    /// Context with the given matcher and the built-in formats.
    pub fn new(matcher: Arc<dyn PatternMatcher>) -> Self {
        Self {
            matcher,
            formats: FormatRegistry::new(),
            entry_mode: EntryMode::default(),
            normalize: NormalizeOptions::default(),
        }
    }

    /// Context matching against the filesystem under `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(GlobMatcher::new(root)))
    }

    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_entry_mode(mut self, entry_mode: EntryMode) -> Self {
        self.entry_mode = entry_mode;
        self
    }

    pub fn with_normalize(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = normalize;
        self
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting build status.
pub trait BuildProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each discovered file is extracted.
    fn file_processed(&self, path: &Path, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl BuildProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_processed(&self, _path: &Path, _current: usize, _total: usize) {}
    fn done(&self, _report: &BuildReport) {}
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Why a discovered file contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No format accepts the file, or loading it failed.
    NotLoadable,
    /// The file has no usable member under the variable name.
    MemberMissing,
    /// The member (after conversion) is not a non-empty mapping.
    NotAMapping,
}

/// A discovered file that contributed nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// What one category contributed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryReport {
    /// Files returned by discovery.
    pub files_discovered: usize,
    /// Entries handed to the assembler.
    pub entries_inserted: usize,
    /// Files that contributed nothing.
    pub skipped: Vec<SkippedFile>,
    /// Keys written more than once; the last writer won.
    pub overwritten: Vec<Overwrite>,
}

/// Summary of a build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub routes: CategoryReport,
    pub schemas: CategoryReport,
    pub elapsed_ms: u64,
}

impl BuildReport {
    /// Report for `category`.
    pub fn category(&self, category: Category) -> &CategoryReport {
        match category {
            Category::Route => &self.routes,
            Category::Schema => &self.schemas,
        }
    }
}

/// Result of a build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The serialized document.
    pub document: Value,
    pub report: BuildReport,
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Validate loosely-typed build options, then run [`build`].
///
/// Nothing is discovered or loaded if validation fails.
pub async fn build_from_value(
    input: &Value,
    converters: &ConverterRegistry,
    context: &BuildContext,
    progress: &dyn BuildProgress,
) -> Result<BuildOutput> {
    let request = BuildRequest::from_value(input, converters)?;
    build(&request, context, progress).await
}

/// Run the full build.
///
/// 1. Normalize the base structure
/// 2. Discover, extract, and convert route definitions
/// 3. Same for schema definitions
/// 4. Assemble and serialize
///
/// Discovery and load failures only drop the affected files; a failing
/// converter or a malformed base structure fails the build.
#[instrument(skip_all, fields(route_globs = request.routes.globs.len(), schema_globs = request.schemas.globs.len()))]
pub async fn build(
    request: &BuildRequest,
    context: &BuildContext,
    progress: &dyn BuildProgress,
) -> Result<BuildOutput> {
    let start = Instant::now();

    progress.phase("Normalizing base structure");
    let document = normalize_base_structure(&request.base_structure, &context.normalize)?;

    progress.phase("Collecting routes");
    let (routes, mut route_report) =
        collect(Category::Route, &request.routes, context, progress).await?;

    progress.phase("Collecting schemas");
    let (schemas, mut schema_report) =
        collect(Category::Schema, &request.schemas, context, progress).await?;

    progress.phase("Assembling document");
    let assembled = assembler::assemble(document, routes, schemas)?;

    for overwrite in assembled.overwritten {
        match overwrite.category {
            Category::Route => route_report.overwritten.push(overwrite),
            Category::Schema => schema_report.overwritten.push(overwrite),
        }
    }

    let report = BuildReport {
        routes: route_report,
        schemas: schema_report,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    progress.done(&report);

    info!(
        routes = report.routes.entries_inserted,
        schemas = report.schemas.entries_inserted,
        skipped = report.routes.skipped.len() + report.schemas.skipped.len(),
        elapsed_ms = report.elapsed_ms,
        "build complete"
    );

    Ok(BuildOutput {
        document: assembled.document,
        report,
    })
}

/// Discover, load, look up, and convert every file of one category.
#[instrument(skip_all, fields(%category))]
async fn collect(
    category: Category,
    options: &DiscoveryOptions,
    context: &BuildContext,
    progress: &dyn BuildProgress,
) -> Result<(Vec<ExtractedEntry>, CategoryReport)> {
    let files = specmerge_discovery::discover(&options.globs, context.matcher.clone()).await;
    let variable_name = options.variable_name_for(category);

    let mut report = CategoryReport {
        files_discovered: files.len(),
        ..Default::default()
    };
    let mut entries = Vec::new();
    let total = files.len();

    for (i, path) in files.into_iter().enumerate() {
        progress.file_processed(&path, i + 1, total);

        let members = specmerge_loader::load_members(&path, &context.formats);
        if members.is_none() {
            report.skipped.push(skipped(path, SkipReason::NotLoadable));
            continue;
        }

        let Some(raw) = specmerge_loader::lookup_member(members.as_ref(), variable_name) else {
            debug!(path = %path.display(), variable_name, "member not found");
            report.skipped.push(skipped(path, SkipReason::MemberMissing));
            continue;
        };

        let value = convert::apply_converter(raw, options.converter.as_ref(), &path)?;

        match convert::entries_from(&value, context.entry_mode, &path) {
            Some(found) => {
                debug!(path = %path.display(), entries = found.len(), "extracted");
                entries.extend(found);
            }
            None => {
                warn!(path = %path.display(), variable_name, "member is not a non-empty mapping, skipping file");
                report.skipped.push(skipped(path, SkipReason::NotAMapping));
            }
        }
    }

    report.entries_inserted = entries.len();
    info!(
        files = report.files_discovered,
        entries = report.entries_inserted,
        skipped = report.skipped.len(),
        "category collected"
    );

    Ok((entries, report))
}

fn skipped(path: PathBuf, reason: SkipReason) -> SkippedFile {
    SkippedFile { path, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use specmerge_loader::DefinitionFormat;
    use specmerge_shared::SpecmergeError;

    use crate::convert::Converter;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sm_build_{name}_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("routes")).expect("mkdir");
        std::fs::create_dir_all(dir.join("schemas")).expect("mkdir");
        dir
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        std::fs::write(dir.join(rel), content).expect("write fixture");
    }

    /// Counts calls so tests can assert that nothing was discovered.
    #[derive(Default)]
    struct CountingMatcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PatternMatcher for CountingMatcher {
        async fn resolve(&self, _pattern: &str) -> Result<Vec<PathBuf>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    /// Returns the same exported members for every path, standing in for a loader.
    struct FixedFormat(Value);

    impl DefinitionFormat for FixedFormat {
        fn accepts(&self, _path: &Path) -> bool {
            true
        }
        fn load(&self, _path: &Path) -> Result<Value> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Hands back a fixed list of paths for any pattern.
    struct ListMatcher(Vec<&'static str>);

    #[async_trait]
    impl PatternMatcher for ListMatcher {
        async fn resolve(&self, _pattern: &str) -> Result<Vec<PathBuf>> {
            Ok(self.0.iter().map(PathBuf::from).collect())
        }
    }

    #[tokio::test]
    async fn invalid_options_fail_before_discovery() {
        let matcher = Arc::new(CountingMatcher::default());
        let context = BuildContext::new(matcher.clone());
        let converters = ConverterRegistry::with_builtins();

        for input in [
            json!({"baseStructure": {}, "routes": {"globs": ["*"]}, "schemas": {"globs": 5}}),
            json!({"baseStructure": {}, "routes": {"globs": ["*"], "converter": 5}, "schemas": {"globs": []}}),
            json!({"baseStructure": {}, "routes": {"globs": ["*"], "variableName": []}, "schemas": {"globs": []}}),
            json!({"baseStructure": [], "routes": {"globs": ["*"]}, "schemas": {"globs": []}}),
            json!([]),
        ] {
            let result = build_from_value(&input, &converters, &context, &SilentProgress).await;
            assert!(matches!(result, Err(SpecmergeError::Validation { .. })), "{input}");
        }

        assert_eq!(matcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_base_structure_fails_before_discovery() {
        let matcher = Arc::new(CountingMatcher::default());
        let context = BuildContext::new(matcher.clone());
        let request = BuildRequest::new(
            json!({"paths": "nope"}),
            DiscoveryOptions::new(["*"]),
            DiscoveryOptions::new(["*"]),
        );

        let result = build(&request, &context, &SilentProgress).await;
        assert!(matches!(result, Err(SpecmergeError::Validation { .. })));
        assert_eq!(matcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_globs_yield_normalized_base() {
        let context = BuildContext::new(Arc::new(CountingMatcher::default()));
        let request = BuildRequest::new(
            json!({}),
            DiscoveryOptions::default(),
            DiscoveryOptions::default(),
        );

        let output = build(&request, &context, &SilentProgress).await.expect("build");
        assert_eq!(
            output.document,
            json!({
                "openapi": "3.0.0",
                "info": {"title": "app", "version": "1.0.0"},
                "paths": {},
                "components": {"schemas": {}}
            })
        );
        assert_eq!(output.report.routes.files_discovered, 0);
    }

    #[tokio::test]
    async fn duplicate_route_keys_last_write_wins() {
        let dir = fixture_dir("lww");
        write(&dir, "routes/a.json", r#"{"route": {"/x": {"method": "get", "from": "a"}}}"#);
        write(&dir, "routes/b.json", r#"{"route": {"/x": {"method": "get", "from": "b"}}}"#);

        let context = BuildContext::for_root(&dir);
        let request = BuildRequest::new(
            json!({}),
            DiscoveryOptions::new(["routes/a.json", "routes/b.json"]),
            DiscoveryOptions::default(),
        );

        let output = build(&request, &context, &SilentProgress).await.expect("build");
        let paths = output.document["paths"].as_object().expect("paths");
        assert_eq!(paths.len(), 1);
        assert_eq!(paths["/x"]["from"], "b");
        assert_eq!(output.report.routes.overwritten.len(), 1);
        assert_eq!(output.report.routes.overwritten[0].winner, dir.join("routes/b.json"));
        assert_eq!(
            output.report.routes.overwritten[0].replaced,
            Some(dir.join("routes/a.json"))
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn converter_output_replaces_raw_key_for_every_file() {
        let context = BuildContext::new(Arc::new(ListMatcher(vec!["my file.js", "my file 2.js"])))
            .with_formats(FormatRegistry::empty().register(FixedFormat(
                json!({"route": {"salut": {"hey": "mdr"}}}),
            )));
        let converter = Converter::new(|_| Ok(json!({"/y": {"method": "post"}})));
        let request = BuildRequest::new(
            json!({}),
            DiscoveryOptions::new(["*"]).with_converter(converter),
            DiscoveryOptions::default(),
        );

        let output = build(&request, &context, &SilentProgress).await.expect("build");
        assert_eq!(output.document["paths"], json!({"/y": {"method": "post"}}));
        assert_eq!(output.report.routes.entries_inserted, 2);
    }

    #[tokio::test]
    async fn raw_member_used_without_converter() {
        let context = BuildContext::new(Arc::new(ListMatcher(vec!["one.js", "two.js"])))
            .with_formats(FormatRegistry::empty().register(FixedFormat(
                json!({"route": {"salut": {"hey": "mdr"}}}),
            )));
        let request = BuildRequest::new(
            json!({}),
            DiscoveryOptions::new(["*"]),
            DiscoveryOptions::default(),
        );

        let output = build(&request, &context, &SilentProgress).await.expect("build");
        assert_eq!(output.document["paths"], json!({"salut": {"hey": "mdr"}}));
        assert_eq!(output.report.routes.entries_inserted, 2);
        assert_eq!(output.report.routes.overwritten.len(), 1);
    }

    #[tokio::test]
    async fn failing_converter_aborts_build() {
        let dir = fixture_dir("converter_err");
        write(&dir, "schemas/user.json", r#"{"schema": {"User": {"type": "object"}}}"#);

        let context = BuildContext::for_root(&dir);
        let converter = Converter::new(|_| Err("converter blew up".into()));
        let request = BuildRequest::new(
            json!({}),
            DiscoveryOptions::default(),
            DiscoveryOptions::new(["schemas/*.json"]).with_converter(converter),
        );

        let err = build(&request, &context, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, SpecmergeError::Conversion { .. }));
        assert!(err.to_string().contains("converter blew up"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn broken_files_are_isolated_and_reported() {
        let dir = fixture_dir("isolation");
        write(&dir, "routes/a_good.json", r#"{"route": {"/good": {"get": {}}}}"#);
        write(&dir, "routes/b_broken.json", "{ this is not json");
        write(&dir, "routes/c_other.json", r#"{"somethingElse": {"/nope": {}}}"#);
        write(&dir, "routes/d_scalar.json", r#"{"route": "just a string"}"#);
        write(&dir, "routes/e_good.yaml", "route:\n  /also-good:\n    post: {}\n");
        write(&dir, "routes/notes.txt", "route: nothing");

        let context = BuildContext::for_root(&dir);
        let request = BuildRequest::new(
            json!({"info": {"title": "Pets"}}),
            DiscoveryOptions::new(["routes/*.json", "routes/*.yaml", "routes/*.txt"]),
            DiscoveryOptions::default(),
        );

        let output = build(&request, &context, &SilentProgress).await.expect("build");

        let paths = output.document["paths"].as_object().expect("paths");
        let keys: Vec<_> = paths.keys().map(String::as_str).collect();
        assert_eq!(keys, ["/good", "/also-good"]);
        assert_eq!(output.document["info"]["title"], "Pets");

        let report = output.report.category(Category::Route);
        assert_eq!(report.files_discovered, 6);
        assert_eq!(report.entries_inserted, 2);
        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            [
                SkipReason::NotLoadable,
                SkipReason::MemberMissing,
                SkipReason::NotAMapping,
                SkipReason::NotLoadable,
            ]
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn first_entry_only_unless_all_mode() {
        let dir = fixture_dir("entry_mode");
        write(
            &dir,
            "schemas/models.json",
            r#"{"schema": {"User": {"type": "object"}, "Pet": {"type": "object"}}}"#,
        );
        let request = BuildRequest::new(
            json!({}),
            DiscoveryOptions::default(),
            DiscoveryOptions::new(["schemas/*.json"]),
        );

        let first = build(&request, &BuildContext::for_root(&dir), &SilentProgress)
            .await
            .expect("build");
        let schemas = first.document["components"]["schemas"].as_object().expect("schemas");
        assert_eq!(schemas.keys().collect::<Vec<_>>(), ["User"]);

        let all = build(
            &request,
            &BuildContext::for_root(&dir).with_entry_mode(EntryMode::All),
            &SilentProgress,
        )
        .await
        .expect("build");
        let schemas = all.document["components"]["schemas"].as_object().expect("schemas");
        assert_eq!(schemas.keys().collect::<Vec<_>>(), ["User", "Pet"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn custom_variable_name_and_builtin_converter() {
        let dir = fixture_dir("builtin");
        write(
            &dir,
            "routes/list_pets.toml",
            "[endpoint]\npath = \"/pets\"\nmethod = \"GET\"\nsummary = \"List pets\"\n",
        );
        write(
            &dir,
            "schemas/pet.json",
            r#"{"model": {"name": "Pet", "type": "object"}}"#,
        );

        let input = json!({
            "baseStructure": {"info": {"title": "Pets", "version": "2.0.0"}},
            "routes": {"globs": ["routes/*.toml"], "variableName": "endpoint", "converter": "keyed-by-path"},
            "schemas": {"globs": ["schemas/*.json"], "variableName": "model", "converter": "keyed-by-name"}
        });

        let output = build_from_value(
            &input,
            &ConverterRegistry::with_builtins(),
            &BuildContext::for_root(&dir),
            &SilentProgress,
        )
        .await
        .expect("build");

        assert_eq!(output.document["paths"]["/pets"]["get"]["summary"], "List pets");
        assert_eq!(output.document["components"]["schemas"]["Pet"], json!({"type": "object"}));
        assert_eq!(output.document["info"]["version"], "2.0.0");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
