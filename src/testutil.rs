//! Test fixtures: a stand-in `git` executable driven by a shell script.
//!
//! The stub keeps one "head revision" per repository in a `HEAD_REV` file:
//! - `clone` copies it from a local directory, reads it from a bundle file,
//!   or derives it from the URL text for network locators.
//! - `bundle create` writes the head revision as the bundle content.
//! - `for-each-ref` prints it.
//!
//! Locators containing `fail-clone` fail to clone, bundle paths containing
//! `fail-bundle` fail to bundle, and locators containing `bad-head` produce
//! an unreadable head revision.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use crate::git::GitRunner;

const STUB_GIT: &str = r#"#!/bin/sh
set -e
cmd="$1"
case "$cmd" in
  --version)
    echo "git version ${STUB_GIT_VERSION:-2.39.1}"
    ;;
  clone)
    src=""
    dest=""
    for a; do src="$dest"; dest="$a"; done
    case "$src" in
      *fail-clone*) echo "fatal: repository '$src' not found" >&2; exit 128 ;;
    esac
    mkdir -p "$dest"
    if [ -f "$src" ]; then
      cp "$src" "$dest/HEAD_REV"
    elif [ -d "$src" ]; then
      cp "$src/HEAD_REV" "$dest/HEAD_REV"
    else
      case "$src" in
        *bad-head*) echo "not-a-revision" > "$dest/HEAD_REV" ;;
        *) printf '%040x\n' "$(printf '%s' "$src" | cksum | cut -d' ' -f1)" > "$dest/HEAD_REV" ;;
      esac
    fi
    ;;
  bundle)
    case "$3" in
      *fail-bundle*) echo "fatal: refusing to create bundle" >&2; exit 1 ;;
    esac
    cp HEAD_REV "$3"
    ;;
  for-each-ref)
    cat HEAD_REV
    ;;
  *)
    echo "$cmd is not a git command" >&2
    exit 1
    ;;
esac
"#;

/// Write an executable script into `dir` and wait until it can be exec'd.
///
/// Another test thread forking while the script is open for writing makes
/// exec fail with ETXTBSY until that child execs, so probe until it runs.
pub fn write_script(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("git-stub.sh");
    fs::write(&path, content).unwrap();
    let mut perm = fs::metadata(&path).unwrap().permissions();
    perm.set_mode(0o755);
    fs::set_permissions(&path, perm).unwrap();

    for _ in 0..100 {
        match Command::new(&path).arg("--version").output() {
            Err(e) if e.raw_os_error() == Some(26) => thread::sleep(Duration::from_millis(10)),
            _ => break,
        }
    }
    path
}

/// A stub git installed in its own temporary directory.
pub struct StubGit {
    _dir: TempDir,
    path: PathBuf,
}

impl StubGit {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("stub-git")
            .tempdir()
            .unwrap();
        let path = write_script(dir.path(), STUB_GIT);
        Self { _dir: dir, path }
    }

    pub fn runner(&self) -> GitRunner {
        GitRunner::new(&self.path)
    }
}

/// Create a local "repository" the stub can clone, with the given head.
pub fn stub_source_repo(parent: &Path, name: &str, head: &str) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("HEAD_REV"), format!("{}\n", head)).unwrap();
    dir
}

/// All regular files below `dir`, recursively.
pub fn list_files_recursively(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        let Ok(rd) = fs::read_dir(&d) else { continue };
        for ent in rd.flatten() {
            let p = ent.path();
            if p.is_dir() {
                stack.push(p);
            } else {
                out.push(p);
            }
        }
    }
    out.sort();
    out
}
