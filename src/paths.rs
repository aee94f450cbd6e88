use anyhow::{Context, Result};
use std::{env, path::PathBuf};

pub const BUNDLES_DIR_ENV: &str = "BUNDLE_REPOS_BUNDLES_DIR";
pub const TEMP_DIR_ENV: &str = "BUNDLE_REPOS_TEMP_DIR";
pub const GIT_ENV: &str = "BUNDLE_REPOS_GIT";

/// Directories and executables a run works with.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root of the archive tree.
    pub bundles: PathBuf,
    /// Parent for scratch clones; `None` means the system temp dir.
    pub temp: Option<PathBuf>,
    /// The git executable to invoke.
    pub git: PathBuf,
}

/// Resolve paths, preferring explicit values over environment variables.
///
/// Fallbacks when neither is given:
/// - bundles: `$CWD/repositories`
/// - temp: system temp directory
/// - git: `git` looked up on `PATH`
pub fn paths(
    bundles: Option<PathBuf>,
    temp: Option<PathBuf>,
    git: Option<PathBuf>,
) -> Result<Paths> {
    let bundles = match bundles.or_else(|| env_path(BUNDLES_DIR_ENV)) {
        Some(p) => p,
        None => env::current_dir()
            .context("cannot determine current directory")?
            .join("repositories"),
    };
    Ok(Paths {
        bundles,
        temp: temp.or_else(|| env_path(TEMP_DIR_ENV)),
        git: git
            .or_else(|| env_path(GIT_ENV))
            .unwrap_or_else(|| PathBuf::from("git")),
    })
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            env::remove_var(BUNDLES_DIR_ENV);
            env::remove_var(TEMP_DIR_ENV);
            env::remove_var(GIT_ENV);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        clear_env();
        let p = paths(None, None, None).unwrap();
        assert_eq!(p.bundles, env::current_dir().unwrap().join("repositories"));
        assert!(p.temp.is_none());
        assert_eq!(p.git, PathBuf::from("git"));
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        clear_env();
        unsafe {
            env::set_var(BUNDLES_DIR_ENV, "/srv/bundles");
            env::set_var(TEMP_DIR_ENV, "/var/tmp/scratch");
            env::set_var(GIT_ENV, "/opt/git/bin/git");
        }
        let p = paths(None, None, None).unwrap();
        clear_env();
        assert_eq!(p.bundles, PathBuf::from("/srv/bundles"));
        assert_eq!(p.temp, Some(PathBuf::from("/var/tmp/scratch")));
        assert_eq!(p.git, PathBuf::from("/opt/git/bin/git"));
    }

    #[test]
    #[serial]
    fn explicit_values_win_over_env() {
        clear_env();
        unsafe {
            env::set_var(BUNDLES_DIR_ENV, "/srv/bundles");
        }
        let p = paths(Some(PathBuf::from("/explicit")), None, None).unwrap();
        clear_env();
        assert_eq!(p.bundles, PathBuf::from("/explicit"));
    }

    #[test]
    #[serial]
    fn empty_env_values_are_ignored() {
        clear_env();
        unsafe {
            env::set_var(GIT_ENV, "");
        }
        let p = paths(None, None, None).unwrap();
        clear_env();
        assert_eq!(p.git, PathBuf::from("git"));
    }
}
