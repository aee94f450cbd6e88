//! Crate entry point for **bundle-repos**.
//!
//! This library mirrors a list of git repositories into bundle files, one
//! per repository, laid out by host and path under a bundles directory.
//! Each submodule encapsulates one responsibility (locator parsing, per-host
//! throttling, git invocation, orchestration, etc.).
//! The `pub use` re-exports make the public surface accessible directly from
//! the crate root.

mod archive;
mod config;
mod error;
mod git;
mod index;
mod locator;
mod logging;
mod paths;
mod throttle;

#[cfg(test)]
mod testutil;

pub use archive::{
    Bundler, Outcome, Revision, RunResult, archive_needs_update, head_of, head_of_archive, run,
};
pub use config::{DEFAULT_DELAY_SECONDS, Settings};
pub use error::{BundleError, GitOperation, Result, ToolFailure};
pub use git::{GitRunner, GitVersion, MINIMUM_GIT_VERSION, check_git_version};
pub use index::{parse_index, read_index};
pub use locator::{ARCHIVE_SUFFIX, FILESYSTEM_DIR, LOCAL_HOST, RepositoryLocator, Scheme};
pub use logging::{LogLevel, init_logging};
pub use paths::{Paths, paths};
pub use throttle::Throttler;
