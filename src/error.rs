//! Error taxonomy shared by every stage of a bundling run.
//!
//! Batch-level problems (a malformed locator, an old git, a bad config file)
//! stop the run before any work starts. Everything raised while cloning,
//! probing or bundling a single repository is scoped to that repository.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::git::GitVersion;

pub type Result<T> = std::result::Result<T, BundleError>;

#[derive(Debug, Error)]
pub enum BundleError {
    /// The locator string cannot be mapped to a repository identity.
    #[error("invalid repository locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// A path segment has a malformed escape or decodes to something unsafe.
    #[error("cannot decode path segment {segment:?}: {reason}")]
    Decoding { segment: String, reason: String },

    /// A git subprocess failed.
    #[error("git {operation} {failure}")]
    ExternalTool {
        operation: GitOperation,
        failure: ToolFailure,
    },

    /// The available git is older than the minimum supported version.
    #[error(
        "git >= {}.{} is required; actual version is {actual}",
        crate::git::MINIMUM_GIT_VERSION.0,
        crate::git::MINIMUM_GIT_VERSION.1
    )]
    ToolVersion { actual: GitVersion },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BundleError {
    /// Whether this error invalidates the whole batch rather than one repository.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            BundleError::InvalidLocator { .. }
                | BundleError::Decoding { .. }
                | BundleError::ToolVersion { .. }
                | BundleError::Config(_)
        )
    }

    pub(crate) fn invalid_locator(locator: &str, reason: impl Into<String>) -> Self {
        BundleError::InvalidLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decoding(segment: &str, reason: impl Into<String>) -> Self {
        BundleError::Decoding {
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn tool(operation: GitOperation, failure: ToolFailure) -> Self {
        BundleError::ExternalTool { operation, failure }
    }
}

/// The git subcommands this crate relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitOperation {
    MirrorClone,
    BundleCreate,
    LatestRef,
    Version,
}

impl fmt::Display for GitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GitOperation::MirrorClone => "clone --mirror",
            GitOperation::BundleCreate => "bundle create",
            GitOperation::LatestRef => "for-each-ref",
            GitOperation::Version => "--version",
        };
        f.write_str(s)
    }
}

/// How a git subprocess failed.
#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error("could not be launched: {0}")]
    Launch(#[source] io::Error),

    #[error("exited with {}: {}", describe_exit(.code), .stderr.trim())]
    Exit { code: Option<i32>, stderr: String },

    #[error("produced unusable output {0:?}")]
    Output(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}
