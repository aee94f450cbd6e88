//! Head-revision probes deciding whether an archive must be rewritten.

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::git::GitRunner;
use crate::locator::RepositoryLocator;

/// Object name of the newest commit across all branches.
///
/// Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Head of an already materialized repository directory.
pub fn head_of(git: &GitRunner, working_dir: &Path) -> Result<Revision> {
    git.latest_commit(working_dir).map(Revision)
}

/// Head of an archive file.
///
/// The archive is mirror-cloned into a `probe*` directory created inside
/// `scratch`; that directory is removed on return, whether or not the
/// probe succeeded.
pub fn head_of_archive(git: &GitRunner, archive: &Path, scratch: &Path) -> Result<Revision> {
    let probe = tempfile::Builder::new().prefix("probe").tempdir_in(scratch)?;
    let clone_dir = probe.path().join("bundle-clone");
    git.mirror_clone(archive, &clone_dir)?;
    head_of(git, &clone_dir)
}

/// Whether the archive at `archive` must be (re)written from `fresh_clone`.
///
/// True when `force` is set, when no archive exists yet, or when the heads
/// of the fresh clone and the existing archive differ. A probe failure is
/// returned as an error rather than treated as either answer.
pub fn archive_needs_update(
    git: &GitRunner,
    locator: &RepositoryLocator,
    fresh_clone: &Path,
    archive: &Path,
    scratch: &Path,
    force: bool,
) -> Result<bool> {
    if force {
        debug!("{}: revision check disabled", locator);
        return Ok(true);
    }
    if !archive.exists() {
        debug!("{}: no archive at {}", locator, archive.display());
        return Ok(true);
    }
    let fresh = head_of(git, fresh_clone)?;
    let archived = head_of_archive(git, archive, scratch)?;
    debug!(
        "{}: fresh head {}, archived head {}",
        locator, fresh, archived
    );
    Ok(fresh != archived)
}
