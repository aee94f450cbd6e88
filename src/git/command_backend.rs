use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::debug;

use super::version::GitVersion;
use crate::error::{BundleError, GitOperation, Result, ToolFailure};

/// Build a `Command` for the configured git executable.
///
/// Terminal prompts are disabled so that a repository asking for credentials
/// fails immediately instead of blocking the whole run on stdin.
fn base_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Handle to an external `git` executable.
///
/// Each method runs one synchronous subprocess with captured output and
/// maps a non-zero exit status to [`BundleError::ExternalTool`]. There is
/// no timeout: a hung git process hangs the caller.
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: PathBuf,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run `cmd` to completion and check its exit status.
    fn execute(&self, operation: GitOperation, mut cmd: Command) -> Result<Output> {
        debug!("executing {:?}", cmd);
        let out = cmd
            .output()
            .map_err(|e| BundleError::tool(operation, ToolFailure::Launch(e)))?;
        if !out.status.success() {
            return Err(BundleError::tool(
                operation,
                ToolFailure::Exit {
                    code: out.status.code(),
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                },
            ));
        }
        Ok(out)
    }

    /// `git clone --mirror <source> <dest>`
    ///
    /// Materializes every ref of `source` into `dest` without a working tree.
    /// `source` may be a URL, a local repository path or a bundle file.
    pub fn mirror_clone(&self, source: impl AsRef<OsStr>, dest: &Path) -> Result<()> {
        let mut cmd = base_command(&self.program);
        cmd.arg("clone").arg("--mirror").arg(source).arg(dest);
        self.execute(GitOperation::MirrorClone, cmd)?;
        Ok(())
    }

    /// `git bundle create <bundle_path> --all`, run inside `repo_dir`.
    pub fn bundle_create(&self, repo_dir: &Path, bundle_path: &Path) -> Result<()> {
        let mut cmd = base_command(&self.program);
        cmd.current_dir(repo_dir)
            .arg("bundle")
            .arg("create")
            .arg(bundle_path)
            .arg("--all");
        self.execute(GitOperation::BundleCreate, cmd)?;
        Ok(())
    }

    /// Object name of the most recently committed-to branch in `repo_dir`.
    ///
    /// Runs `for-each-ref` over `refs/heads/` sorted by descending committer
    /// date, limited to one entry.
    ///
    /// # Errors
    /// Besides a non-zero exit, empty output (no branches) or output that is
    /// not a hex object name is reported as [`ToolFailure::Output`], so an
    /// unreadable head can never compare equal to another one.
    pub fn latest_commit(&self, repo_dir: &Path) -> Result<String> {
        let mut cmd = base_command(&self.program);
        cmd.current_dir(repo_dir).args([
            "for-each-ref",
            "--count=1",
            "--sort=-committerdate",
            "--format=%(objectname)",
            "refs/heads/",
        ]);
        let out = self.execute(GitOperation::LatestRef, cmd)?;
        let text = String::from_utf8_lossy(&out.stdout);
        let rev = text.trim();
        if rev.is_empty() || !rev.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BundleError::tool(
                GitOperation::LatestRef,
                ToolFailure::Output(rev.to_string()),
            ));
        }
        Ok(rev.to_string())
    }

    /// `git --version`, parsed into a [`GitVersion`].
    pub fn version(&self) -> Result<GitVersion> {
        let mut cmd = base_command(&self.program);
        cmd.arg("--version");
        let out = self.execute(GitOperation::Version, cmd)?;
        let text = String::from_utf8_lossy(&out.stdout);
        GitVersion::parse(&text).ok_or_else(|| {
            let head: String = text.trim().chars().take(64).collect();
            BundleError::tool(GitOperation::Version, ToolFailure::Output(head))
        })
    }
}
