//! Git integration layer.
//!
//! This module wraps the subprocess backend (`command_backend`) and re-exports
//! only the narrow API the rest of the crate relies on: mirror clone, bundle
//! creation, newest-ref lookup and version query.
//!
//! Every operation goes through an external `git` executable so that the
//! binary in use (or a stand-in script under test) can be chosen at runtime.

mod command_backend;
mod version;

pub use command_backend::GitRunner;
pub use version::{GitVersion, MINIMUM_GIT_VERSION, check_git_version};
