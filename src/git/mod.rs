//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. The sync engine never spawns
//! processes or imports `git2` itself; it works against:
//!
//! - [`CommandRunner`] - blocking subprocess execution with captured output
//! - [`Workspace`] - the per-pass working repository and its git verbs
//!
//! # Example
//!
//! ```no_run
//! use mirrorsync::git::{SystemRunner, Workspace, SOURCE_REMOTE};
//! use std::path::Path;
//!
//! let ws = Workspace::prepare(
//!     Path::new("/tmp/ws"),
//!     "git@github.com:team/docs.git",
//!     "git@gitlab.com:team/docs.git",
//!     None,
//!     SystemRunner,
//! )?;
//! let out = ws.fetch_branch(SOURCE_REMOTE, "main")?;
//! assert!(out.success());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod interface;
pub mod mock;
mod runner;

pub use interface::{
    Workspace, WorkspaceError, DESTINATION_REMOTE, RESERVED_BRANCH, SOURCE_REMOTE,
};
pub use runner::{CommandOutput, CommandRunner, RunnerError, SystemRunner};
