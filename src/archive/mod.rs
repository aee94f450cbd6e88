//! Mirror-and-bundle orchestration.
//!
//! For each repository: throttle by host, mirror-clone into a scratch
//! directory, compare heads with the existing bundle, and write a new
//! bundle only when something changed. Per-repository failures are logged
//! and counted; they never abort the batch.

mod digest;
mod revision;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{Level, debug, error, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::git::{GitRunner, check_git_version};
use crate::locator::RepositoryLocator;
use crate::paths::Paths;
use crate::throttle::Throttler;

pub use revision::{Revision, archive_needs_update, head_of, head_of_archive};

/// How a repository reached an up-to-date archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The archive was created or rewritten.
    Bundled(PathBuf),
    /// The existing archive already matched the remote.
    Skipped(PathBuf),
}

impl Outcome {
    pub fn archive(&self) -> &Path {
        match self {
            Outcome::Bundled(p) | Outcome::Skipped(p) => p,
        }
    }
}

/// SHA-256 of a freshly written archive, computed only when debug logging
/// is on for this crate.
fn archive_digest(archive: &Path) -> Option<String> {
    if !tracing::enabled!(Level::DEBUG) {
        return None;
    }
    match digest::sha256_file(archive) {
        Ok(sum) => Some(sum),
        Err(e) => {
            debug!("cannot digest {}: {}", archive.display(), e);
            None
        }
    }
}

/// Tally of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub total: usize,
    pub bundled: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunResult {
    /// Repositories whose archive is current at the end of the run.
    pub fn succeeded(&self) -> usize {
        self.bundled + self.skipped
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.total
    }

    /// Nothing succeeded out of a non-empty batch.
    pub fn is_total_failure(&self) -> bool {
        self.total > 0 && self.succeeded() == 0
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Bundled(_) => self.bundled += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Mirrors repositories into bundle files under one bundles directory.
#[derive(Debug)]
pub struct Bundler {
    bundles_dir: PathBuf,
    temp_dir: Option<PathBuf>,
    git: GitRunner,
    settings: Settings,
    throttler: Throttler,
}

impl Bundler {
    /// A bundler with default [`Settings`] writing below `bundles_dir`.
    pub fn new(bundles_dir: impl Into<PathBuf>, git: GitRunner) -> Result<Self> {
        let settings = Settings::default();
        Ok(Self {
            bundles_dir: bundles_dir.into(),
            temp_dir: None,
            git,
            throttler: settings.throttler()?,
            settings,
        })
    }

    /// Parent directory for scratch clones; `None` uses the system default.
    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Apply `settings`, replacing the throttler with one using its delay.
    pub fn with_settings(mut self, settings: Settings) -> Result<Self> {
        self.throttler = settings.throttler()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn with_throttler(mut self, throttler: Throttler) -> Self {
        self.throttler = throttler;
        self
    }

    pub fn bundles_dir(&self) -> &Path {
        &self.bundles_dir
    }

    #[cfg(test)]
    pub(crate) fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    /// Scratch parent for one repository; removed when dropped.
    fn scratch_dir(&self) -> Result<TempDir> {
        let mut b = tempfile::Builder::new();
        b.prefix("clone-dest-parent");
        let dir = match &self.temp_dir {
            Some(root) => {
                fs::create_dir_all(root)?;
                b.tempdir_in(root)?
            }
            None => b.tempdir()?,
        };
        Ok(dir)
    }

    /// Bring the archive of `locator` up to date.
    ///
    /// Nothing is written below the bundles directory unless the clone
    /// succeeded and the archive is stale. All scratch directories are gone
    /// when this returns, on every path.
    ///
    /// # Errors
    /// Returns the first failing git operation or filesystem error.
    pub fn bundle(&mut self, locator: &RepositoryLocator) -> Result<Outcome> {
        debug!("bundling {} to {}", locator, self.bundles_dir.display());
        self.throttler.throttle(locator.host());

        let scratch = self.scratch_dir()?;
        let clone_dir = scratch.path().join("clone-dest");
        self.git
            .mirror_clone(locator.repository_argument(), &clone_dir)?;

        let archive = locator.archive_path(&self.bundles_dir);
        let stale = archive_needs_update(
            &self.git,
            locator,
            &clone_dir,
            &archive,
            scratch.path(),
            self.settings.ignore_revision_check,
        )?;
        if !stale {
            info!("{} is up to date at {}", locator, archive.display());
            return Ok(Outcome::Skipped(archive));
        }

        self.write_archive(&clone_dir, &archive)?;
        info!("bundled {} as {}", locator, archive.display());
        if let Some(sum) = archive_digest(&archive) {
            debug!("sha256 of {}: {}", archive.display(), sum);
        }
        Ok(Outcome::Bundled(archive))
    }

    /// Bundle `clone_dir` into a staging directory beside `archive`, then
    /// rename it into place so a failed bundle never replaces a good one.
    fn write_archive(&self, clone_dir: &Path, archive: &Path) -> Result<()> {
        let parent = archive.parent().unwrap_or(&self.bundles_dir);
        fs::create_dir_all(parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".staging")
            .tempdir_in(parent)?;
        let staged = staging
            .path()
            .join(archive.file_name().unwrap_or_default());
        self.git.bundle_create(clone_dir, &staged)?;
        fs::rename(&staged, archive)?;
        Ok(())
    }

    /// Resolve and bundle a single locator string.
    ///
    /// A locator that does not resolve is an error for this call only.
    pub fn bundle_url(&mut self, input: &str) -> Result<Outcome> {
        let locator = RepositoryLocator::resolve(input)?;
        self.bundle(&locator)
    }

    /// Bundle already resolved locators in order, counting outcomes.
    pub fn bundle_locators(&mut self, locators: &[RepositoryLocator]) -> RunResult {
        let mut result = RunResult {
            total: locators.len(),
            ..RunResult::default()
        };
        for locator in locators {
            match self.bundle(locator) {
                Ok(outcome) => result.record(&outcome),
                Err(e) => {
                    error!("bundling {} failed: {}", locator, e);
                    result.failed += 1;
                }
            }
        }
        result
    }

    /// Resolve every locator, then bundle them in input order.
    ///
    /// # Errors
    /// Fails before any clone if a single locator does not resolve.
    pub fn bundle_all<S: AsRef<str>>(&mut self, inputs: &[S]) -> Result<RunResult> {
        let locators = inputs
            .iter()
            .map(|s| RepositoryLocator::resolve(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.bundle_locators(&locators))
    }
}

/// Check the git version, then bundle `locators` with the given layout and
/// settings.
///
/// # Errors
/// Only batch-level problems are returned: a git that cannot be queried or
/// is too old, invalid settings, or a locator that does not resolve.
pub fn run<S: AsRef<str>>(locators: &[S], paths: &Paths, settings: Settings) -> Result<RunResult> {
    let git = GitRunner::new(&paths.git);
    let version = git.version()?;
    check_git_version(&version)?;
    debug!("using git {} from {}", version, git.program().display());

    let mut bundler = Bundler::new(&paths.bundles, git)?
        .with_temp_dir(paths.temp.clone())
        .with_settings(settings)?;
    let result = bundler.bundle_all(locators)?;
    if result.is_total_failure() {
        error!("no bundlings succeeded out of {} urls", result.total);
    } else if !result.all_succeeded() {
        warn!(
            "only {} of {} bundlings succeeded",
            result.succeeded(),
            result.total
        );
    }
    Ok(result)
}
