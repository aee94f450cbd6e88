//! # bundle-repos
//!
//! **bundle-repos** mirrors the git repositories listed in an index file
//! into bundle files.
//!
//! Features:
//! - One `https://` or `file://` locator per line; blank lines and `#` comments are ignored
//! - Bundles are laid out as `<bundles-dir>/<host>/<namespace...>/<name>.bundle`
//! - A bundle is only rewritten when the repository's newest commit changed (`--force` overrides)
//! - Clones from the same host are spaced by `--delay` seconds
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, warn};

use bundle_repos::{BundleError, LogLevel, RunResult, Settings, init_logging, paths, read_index, run};

/// Exit status when not a single repository was bundled.
const ERR_BUNDLE_FAIL: u8 = 2;

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "bundle-repos",
    version,
    about = "bundle-repos - archive git repositories as bundle files"
)]
struct Cli {
    /// File listing one repository URL per line
    indexfile: PathBuf,

    /// Set log level
    #[arg(short, long, value_enum, ignore_case = true, default_value = "INFO", value_name = "LEVEL")]
    log_level: LogLevel,

    /// Set temp directory [env: BUNDLE_REPOS_TEMP_DIR]
    #[arg(long, value_name = "DIRNAME")]
    temp_dir: Option<PathBuf>,

    /// Set bundles tree top directory [env: BUNDLE_REPOS_BUNDLES_DIR; default: ./repositories]
    #[arg(long, value_name = "DIRNAME")]
    bundles_dir: Option<PathBuf>,

    /// Set per-host throttling delay
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Rewrite bundles even if the repository has not changed
    #[arg(long)]
    force: bool,

    /// Read settings from a TOML file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Git executable to use [env: BUNDLE_REPOS_GIT]
    #[arg(long, value_name = "PATH")]
    git: Option<PathBuf>,
}

impl Cli {
    /// Settings from `--config`, with command-line flags taking precedence.
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(p) => Settings::load(p)?,
            None => Settings::default(),
        };
        if let Some(d) = self.delay {
            settings.host_throttle_delay_seconds = d;
        }
        if self.force {
            settings.ignore_revision_check = true;
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// CLI entry point.
///
/// Exits with status 0 if at least one repository ended up with a current
/// bundle, 2 if none did, and 1 if the batch could not start.
fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    let settings = cli.settings()?;
    let p = paths(cli.bundles_dir.clone(), cli.temp_dir.clone(), cli.git.clone())?;
    let urls = read_index(&cli.indexfile)?;
    debug!(
        "{} repository urls in {}",
        urls.len(),
        cli.indexfile.display()
    );
    if urls.is_empty() {
        warn!("no repository urls in {}", cli.indexfile.display());
        return Ok(ExitCode::SUCCESS);
    }

    exit_code(run(&urls, &p, settings), &cli.indexfile)
}

/// Map the outcome of a batch onto the process exit status.
///
/// Batch-fatal errors are reported here and exit with 1; anything else that
/// stopped the batch is handed back to `main` as an error.
fn exit_code(outcome: bundle_repos::Result<RunResult>, indexfile: &Path) -> Result<ExitCode> {
    match outcome {
        Ok(result) if result.is_total_failure() => Ok(ExitCode::from(ERR_BUNDLE_FAIL)),
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_batch_fatal() => {
            error!("refusing to process {}: {}", indexfile.display(), e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e)
            .with_context(|| format!("cannot bundle repositories from {}", indexfile.display())),
    }
}
