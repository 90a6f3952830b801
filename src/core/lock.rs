//! core::lock
//!
//! Exclusive lock on a working repository path.
//!
//! A pass wipes and rebuilds its working repository, so two passes (or two
//! processes) must never target the same path at once. The lock lives next
//! to the workspace as `<workspace>.lock` because the workspace directory
//! itself is deleted while the lock is held.
//!
//! # Invariants
//!
//! - Lock is held for the whole pass, from teardown to the final push
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```no_run
//! use mirrorsync::core::lock::WorkspaceLock;
//! use std::path::Path;
//!
//! let lock = WorkspaceLock::acquire(Path::new("/var/lib/mirror-sync/docs"))?;
//! // ... run the pass ...
//! drop(lock);
//! # Ok::<(), mirrorsync::core::lock::LockError>(())
//! ```

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another pass already holds the lock.
    #[error("workspace {} is in use by another sync pass", .0.display())]
    AlreadyLocked(PathBuf),

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on a workspace path.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
    file: File,
}

impl WorkspaceLock {
    /// Attempt to lock `workspace`.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    /// The parent directory of the workspace is created if missing.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another pass holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(workspace: &Path) -> Result<Self, LockError> {
        let path = Self::lock_path(workspace)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { path, file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked(workspace.to_path_buf()))
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// The lock file used for `workspace`: a `.lock` sibling.
    pub fn lock_path(workspace: &Path) -> Result<PathBuf, LockError> {
        let name = workspace.file_name().ok_or_else(|| {
            LockError::CreateFailed(format!(
                "workspace path {} has no final component",
                workspace.display()
            ))
        })?;
        let mut lock_name = OsString::from(name);
        lock_name.push(".lock");
        Ok(workspace.with_file_name(lock_name))
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_acquire_succeeds() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("docs");

        let lock = WorkspaceLock::acquire(&ws).expect("acquire lock");
        assert!(lock.path().exists());
        assert_eq!(lock.path(), temp.path().join("docs.lock"));
    }

    #[test]
    fn lock_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("nested/deeper/docs");

        let _lock = WorkspaceLock::acquire(&ws).expect("acquire lock");
        assert!(temp.path().join("nested/deeper").is_dir());
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("docs");

        let _lock1 = WorkspaceLock::acquire(&ws).expect("first acquire");
        let result = WorkspaceLock::acquire(&ws);
        assert!(matches!(result, Err(LockError::AlreadyLocked(_))));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("docs");

        {
            let _lock = WorkspaceLock::acquire(&ws).expect("first acquire");
        }

        let _lock2 = WorkspaceLock::acquire(&ws).expect("second acquire");
    }

    #[test]
    fn root_path_rejected() {
        let result = WorkspaceLock::lock_path(Path::new("/"));
        assert!(matches!(result, Err(LockError::CreateFailed(_))));
    }

    #[test]
    fn error_display_names_workspace() {
        let err = LockError::AlreadyLocked(PathBuf::from("/ws/docs"));
        assert!(err.to_string().contains("/ws/docs"));
        assert!(err.to_string().contains("in use"));
    }
}
