//! git::interface
//!
//! The working repository a pass stages merges in.
//!
//! # Architecture
//!
//! A [`Workspace`] is created fresh for every pass: the directory is locked,
//! wiped, re-initialized with libgit2 and bound to two remotes,
//! [`SOURCE_REMOTE`] and [`DESTINATION_REMOTE`]. Repository setup and state
//! inspection go through `git2`; network verbs (fetch, pull, push) go through
//! a [`CommandRunner`] so they use the user's git, SSH agent and credential
//! helpers.
//!
//! The verbs here only run commands and report what happened. Deciding what
//! a failure means is the job of the replicators in [`crate::sync`].
//!
//! # Error Handling
//!
//! Setup failures are categorized by step so the orchestrator can report a
//! distinct exit code for each:
//! - [`WorkspaceError::Locked`]: another pass owns this path, or the lock
//!   file could not be taken
//! - [`WorkspaceError::Init`]: teardown, recreate or `git init` failed
//! - [`WorkspaceError::Remote`]: binding one of the two remotes failed

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::runner::{CommandOutput, CommandRunner, RunnerError};
use crate::core::config::IdentityConfig;
use crate::core::lock::{LockError, WorkspaceLock};
use crate::core::types::{RefKind, Side};

/// Remote name bound to the source of the current pass.
pub const SOURCE_REMOTE: &str = "origin";

/// Remote name bound to the destination of the current pass.
pub const DESTINATION_REMOTE: &str = "mirror";

/// Branch a fresh workspace's HEAD points at before the first switch.
///
/// Git refuses to fetch into the checked-out branch, so this name is never
/// synchronized; passes skip a remote branch that carries it.
pub const RESERVED_BRANCH: &str = "mirror-sync/unborn";

/// Errors from preparing a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The workspace lock is held elsewhere or could not be taken.
    #[error(transparent)]
    Locked(LockError),

    /// The directory could not be recreated or initialized.
    #[error("failed to initialize workspace {}: {message}", .path.display())]
    Init { path: PathBuf, message: String },

    /// A remote could not be added.
    #[error("failed to add {side} remote '{name}' ({url}): {message}")]
    Remote {
        side: Side,
        name: String,
        url: String,
        message: String,
    },
}

/// A freshly initialized working repository bound to both remotes.
///
/// Holds the workspace lock for its whole lifetime.
pub struct Workspace<R> {
    path: PathBuf,
    repo: git2::Repository,
    runner: R,
    _lock: WorkspaceLock,
}

impl<R> std::fmt::Debug for Workspace<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("path", &self.path)
            .finish()
    }
}

impl<R: CommandRunner> Workspace<R> {
    /// Lock, wipe and rebuild the workspace at `path`.
    ///
    /// # Errors
    ///
    /// Each setup step fails with its own [`WorkspaceError`] variant.
    pub fn prepare(
        path: &Path,
        source_url: &str,
        destination_url: &str,
        identity: Option<&IdentityConfig>,
        runner: R,
    ) -> Result<Self, WorkspaceError> {
        let lock = WorkspaceLock::acquire(path).map_err(WorkspaceError::Locked)?;
        tracing::debug!(lock = %lock.path().display(), "workspace locked");

        let init_err = |message: String| WorkspaceError::Init {
            path: path.to_path_buf(),
            message,
        };

        if path.exists() {
            tracing::debug!(path = %path.display(), "removing previous workspace");
            fs::remove_dir_all(path).map_err(|e| init_err(format!("cannot remove: {}", e)))?;
        }
        fs::create_dir_all(path).map_err(|e| init_err(format!("cannot create: {}", e)))?;

        let repo = Self::init_repo(path, identity).map_err(|e| init_err(e.message().to_string()))?;

        for (side, name, url) in [
            (Side::Source, SOURCE_REMOTE, source_url),
            (Side::Destination, DESTINATION_REMOTE, destination_url),
        ] {
            repo.remote(name, url).map_err(|e| WorkspaceError::Remote {
                side,
                name: name.to_string(),
                url: url.to_string(),
                message: e.message().to_string(),
            })?;
        }

        tracing::debug!(path = %path.display(), "workspace ready");

        Ok(Self {
            path: path.to_path_buf(),
            repo,
            runner,
            _lock: lock,
        })
    }

    fn init_repo(
        path: &Path,
        identity: Option<&IdentityConfig>,
    ) -> Result<git2::Repository, git2::Error> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head(&RefKind::Branch.qualify(RESERVED_BRANCH));
        let repo = git2::Repository::init_opts(path, &opts)?;

        if let Some(identity) = identity {
            let mut config = repo.config()?.open_level(git2::ConfigLevel::Local)?;
            config.set_str("user.name", &identity.name)?;
            config.set_str("user.email", &identity.email)?;
        }

        Ok(repo)
    }

    /// Path of the working repository.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The runner used for git verbs.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn git(&self, args: &[&str]) -> Result<CommandOutput, RunnerError> {
        self.runner.run(&self.path, "git", args)
    }

    // =========================================================================
    // Branch verbs
    // =========================================================================

    /// Fetch `branch` from `remote` into the same-named local branch,
    /// overwriting any stale local copy.
    ///
    /// Tags are left to the tag verbs; an auto-followed source tag would
    /// otherwise block the later non-forced fetch of destination tags.
    pub fn fetch_branch(&self, remote: &str, branch: &str) -> Result<CommandOutput, RunnerError> {
        let spec = branch_refspec(branch);
        self.git(&["fetch", "--force", "--no-tags", remote, &spec])
    }

    /// Check out local `branch` in the working tree.
    pub fn switch(&self, branch: &str) -> Result<CommandOutput, RunnerError> {
        self.git(&["switch", branch])
    }

    /// Merge `remote`'s `branch` into the checked-out branch.
    ///
    /// `--no-rebase --ff` pins the strategy to fast-forward when possible and
    /// merge otherwise, regardless of the user's `pull.rebase`/`pull.ff`.
    pub fn pull(&self, remote: &str, branch: &str) -> Result<CommandOutput, RunnerError> {
        let qualified = RefKind::Branch.qualify(branch);
        self.git(&["pull", "--no-rebase", "--ff", "--no-edit", remote, &qualified])
    }

    /// Push local `branch` to the same-named branch on `remote`.
    pub fn push_branch(&self, remote: &str, branch: &str) -> Result<CommandOutput, RunnerError> {
        let spec = branch_refspec(branch);
        self.git(&["push", remote, &spec])
    }

    // =========================================================================
    // Tag verbs
    // =========================================================================

    /// Fetch all tags from `remote`. With `force`, fetched tags replace
    /// local tags of the same name.
    pub fn fetch_tags(&self, remote: &str, force: bool) -> Result<CommandOutput, RunnerError> {
        if force {
            self.git(&["fetch", remote, "--tags", "--force"])
        } else {
            self.git(&["fetch", remote, "--tags"])
        }
    }

    /// Force-push every local tag to `remote`.
    pub fn push_tags(&self, remote: &str) -> Result<CommandOutput, RunnerError> {
        self.git(&["push", remote, "--tags", "--force"])
    }

    // =========================================================================
    // State inspection
    // =========================================================================

    /// Whether the index holds unresolved conflicts, as left by a failed merge.
    pub fn has_conflicts(&self) -> bool {
        // The index was written by a git subprocess; reload it from disk.
        self.repo
            .index()
            .and_then(|mut index| {
                index.read(false)?;
                Ok(index.has_conflicts())
            })
            .unwrap_or(false)
    }

    /// Whether a merge is in progress.
    pub fn merge_in_progress(&self) -> bool {
        self.repo.state() == git2::RepositoryState::Merge
    }
}

/// `refs/heads/<b>:refs/heads/<b>`, immune to tags sharing the name.
fn branch_refspec(branch: &str) -> String {
    let qualified = RefKind::Branch.qualify(branch);
    format!("{}:{}", qualified, qualified)
}
