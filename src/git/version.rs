use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{BundleError, Result};

/// Oldest `(major, minor)` git release that supports everything we invoke.
pub const MINIMUM_GIT_VERSION: (u32, u32) = (2, 3);

static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^git version (\d+)\.(\d+)(?:\.(\d+))?.*$").expect("version pattern is valid")
});

/// Version reported by `git --version`, as `major.minor[.patch]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl GitVersion {
    pub fn new(major: u32, minor: u32, patch: Option<u32>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the first line of `git --version` output.
    ///
    /// Vendor suffixes after the numeric part (`(Apple Git-143)`,
    /// `.windows.1`) are ignored. Returns `None` when the line does not
    /// start with `git version N.N`.
    pub fn parse(text: &str) -> Option<Self> {
        let line = text.trim().lines().next()?;
        let caps = VERSION_LINE.captures(line)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        let patch = match caps.get(3) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(p) = self.patch {
            write!(f, ".{}", p)?;
        }
        Ok(())
    }
}

/// Check that `version` meets [`MINIMUM_GIT_VERSION`].
///
/// # Errors
/// Returns [`BundleError::ToolVersion`] if the major version is below 2, or
/// the major version is 2 and the minor version is below 3.
pub fn check_git_version(version: &GitVersion) -> Result<()> {
    let (min_major, min_minor) = MINIMUM_GIT_VERSION;
    let too_old = version.major < min_major
        || (version.major == min_major && version.minor < min_minor);
    if too_old {
        return Err(BundleError::ToolVersion { actual: *version });
    }
    Ok(())
}
