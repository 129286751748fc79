//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use specmerge_core::{
    BuildContext, BuildProgress, BuildReport, BuildRequest, CategoryReport, ConverterRegistry,
    NormalizeOptions, normalize_base_structure,
};
use specmerge_shared::{AppConfig, EntryMode, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// specmerge: assemble an OpenAPI document from definition files.
#[derive(Parser)]
#[command(
    name = "specmerge",
    version,
    about = "Assemble an OpenAPI 3.0 document from route and schema definition files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to the config file.
    #[arg(short, long, default_value = specmerge_shared::CONFIG_FILE_NAME, global = true, env = "SPECMERGE_CONFIG")]
    pub config: PathBuf,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover definition files and write the assembled document.
    Build {
        /// Output file (overrides `output.path`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Directory relative glob patterns resolve against (overrides `merge.root`).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Merge every entry of each extracted mapping, not just the first.
        #[arg(long)]
        all_entries: bool,

        /// Keep `components.schemas` from the base structure.
        #[arg(long)]
        preserve_schemas: bool,

        /// Write compact JSON instead of pretty-printed.
        #[arg(long)]
        compact: bool,

        /// Print the document to stdout instead of writing a file.
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
    },

    /// Validate the config and build options without reading definition files.
    Check,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "specmerge=info",
        1 => "specmerge=debug",
        _ => "specmerge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            out,
            root,
            all_entries,
            preserve_schemas,
            compact,
            stdout,
        } => {
            let overrides = BuildOverrides {
                out,
                root,
                all_entries,
                preserve_schemas,
                compact,
                stdout,
            };
            cmd_build(&cli.config, overrides).await
        }
        Command::Check => cmd_check(&cli.config).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&cli.config).await,
            ConfigAction::Show => cmd_config_show(&cli.config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Flags that take precedence over the config file.
struct BuildOverrides {
    out: Option<PathBuf>,
    root: Option<PathBuf>,
    all_entries: bool,
    preserve_schemas: bool,
    compact: bool,
    stdout: bool,
}

impl BuildOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(out) = &self.out {
            config.output.path = out.clone();
        }
        if let Some(root) = &self.root {
            config.merge.root = root.clone();
        }
        if self.all_entries {
            config.merge.entry_mode = EntryMode::All;
        }
        if self.preserve_schemas {
            config.merge.preserve_schemas = true;
        }
        if self.compact {
            config.output.pretty = false;
        }
    }
}

async fn cmd_build(config_path: &Path, overrides: BuildOverrides) -> Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);

    let request = build_request(&config, config_path)?;
    let context = BuildContext::for_root(&config.merge.root)
        .with_entry_mode(config.merge.entry_mode)
        .with_normalize(NormalizeOptions {
            preserve_schemas: config.merge.preserve_schemas,
        });

    info!(
        root = %config.merge.root.display(),
        entry_mode = ?config.merge.entry_mode,
        "building document"
    );

    let reporter = CliProgress::new();
    let output = specmerge_core::build(&request, &context, &reporter).await?;

    let rendered = if config.output.pretty {
        serde_json::to_string_pretty(&output.document)?
    } else {
        serde_json::to_string(&output.document)?
    };

    if overrides.stdout {
        println!("{rendered}");
        return Ok(());
    }

    let out_path = &config.output.path;
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("cannot create output directory {}", parent.display()))?;
    }
    std::fs::write(out_path, format!("{rendered}\n"))
        .wrap_err_with(|| format!("cannot write {}", out_path.display()))?;

    print_summary(&output.report, out_path);

    Ok(())
}

/// Validate the `[build]` table into a request.
fn build_request(config: &AppConfig, config_path: &Path) -> Result<BuildRequest> {
    let Some(build) = &config.build else {
        return Err(eyre!(
            "no [build] section in {}; run `specmerge config init` to create one",
            config_path.display()
        ));
    };

    Ok(BuildRequest::from_value(
        build,
        &ConverterRegistry::with_builtins(),
    )?)
}

fn print_summary(report: &BuildReport, out_path: &Path) {
    println!();
    println!("  Document assembled!");
    print_category("Routes", &report.routes);
    print_category("Schemas", &report.schemas);
    println!("  Output:   {}", out_path.display());
    println!("  Time:     {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();
}

fn print_category(label: &str, report: &CategoryReport) {
    println!(
        "  {label:<9} {} entries from {} files ({} skipped, {} overwritten)",
        report.entries_inserted,
        report.files_discovered,
        report.skipped.len(),
        report.overwritten.len()
    );
    for skipped in &report.skipped {
        println!("    - {} ({:?})", skipped.path.display(), skipped.reason);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl BuildProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_processed(&self, path: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Reading [{current}/{total}] {}", path.display()));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

/// Clears the spinner when a build bails out before `done`.
impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Check / config
// ---------------------------------------------------------------------------

async fn cmd_check(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let request = build_request(&config, config_path)?;

    normalize_base_structure(
        &request.base_structure,
        &NormalizeOptions {
            preserve_schemas: config.merge.preserve_schemas,
        },
    )?;

    info!(config = %config_path.display(), "build options valid");

    println!("  Config OK: {}", config_path.display());
    println!("  Route globs:  {}", request.routes.globs.join(", "));
    println!("  Schema globs: {}", request.schemas.globs.join(", "));
    Ok(())
}

async fn cmd_config_init(config_path: &Path) -> Result<()> {
    let path = init_config(config_path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: &Path) -> Result<()> {
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn cli_parses_build_flags() {
        let cli = Cli::try_parse_from([
            "specmerge",
            "--config",
            "api.toml",
            "-vv",
            "build",
            "--root",
            "defs",
            "--all-entries",
            "--compact",
        ])
        .expect("parse");

        assert_eq!(cli.config, PathBuf::from("api.toml"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Build {
                root,
                all_entries,
                compact,
                stdout,
                ..
            } => {
                assert_eq!(root, Some(PathBuf::from("defs")));
                assert!(all_entries);
                assert!(compact);
                assert!(!stdout);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn stdout_conflicts_with_out() {
        let result = Cli::try_parse_from(["specmerge", "build", "--stdout", "--out", "x.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_take_precedence_over_config() {
        let mut config = AppConfig::default();
        BuildOverrides {
            out: Some(PathBuf::from("dist/api.json")),
            root: None,
            all_entries: true,
            preserve_schemas: true,
            compact: true,
            stdout: false,
        }
        .apply(&mut config);

        assert_eq!(config.output.path, PathBuf::from("dist/api.json"));
        assert_eq!(config.merge.root, PathBuf::from("."));
        assert_eq!(config.merge.entry_mode, EntryMode::All);
        assert!(config.merge.preserve_schemas);
        assert!(!config.output.pretty);
    }

    #[test]
    fn spinner_is_cleared_when_build_fails() {
        let progress = CliProgress::new();
        let spinner = progress.spinner.clone();
        progress.phase("Collecting routes");

        drop(progress);
        assert!(spinner.is_finished());
    }

    #[tokio::test]
    async fn failed_build_writes_no_output() {
        let dir = std::env::temp_dir().join(format!("sm_cli_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let config_path = dir.join("specmerge.toml");
        std::fs::write(
            &config_path,
            "[build.baseStructure]\ninfo = \"not a table\"\n[build.routes]\nglobs = []\n[build.schemas]\nglobs = []\n",
        )
        .expect("write config");

        let overrides = BuildOverrides {
            out: Some(dir.join("openapi.json")),
            root: Some(dir.clone()),
            all_entries: false,
            preserve_schemas: false,
            compact: false,
            stdout: false,
        };
        assert!(cmd_build(&config_path, overrides).await.is_err());
        assert!(!dir.join("openapi.json").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_build_section_is_an_error() {
        let err = build_request(&AppConfig::default(), Path::new("specmerge.toml")).unwrap_err();
        assert!(err.to_string().contains("[build]"));
    }

    #[test]
    fn build_section_from_toml_validates() {
        let config = specmerge_shared::parse_config(
            r#"
[build.baseStructure.info]
title = "Pets"

[build.routes]
globs = ["routes/*.json"]
converter = "keyed-by-path"

[build.schemas]
globs = []
"#,
        )
        .expect("parse");

        let request = build_request(&config, Path::new("specmerge.toml")).expect("valid");
        assert_eq!(request.routes.globs, ["routes/*.json"]);
        assert_eq!(request.base_structure["info"]["title"], Value::from("Pets"));
    }
}
