//! sync::snapshot
//!
//! Ref Snapshot Reader: what a remote's branches or tags point at, right now.
//!
//! # Design
//!
//! Parsing `git ls-remote` text is isolated here behind [`SnapshotReader`],
//! so classification and replication work purely on [`RefSnapshot`] values.
//! Snapshots are taken without fetching and are never persisted; every pass
//! takes new ones.
//!
//! # Listing format
//!
//! ```text
//! 4e5f...a1b2	refs/heads/main
//! 9c0d...e3f4	refs/heads/release/1.0
//! ```
//!
//! The leaf name is the ref path with its namespace (`refs/heads/`,
//! `refs/tags/`) stripped, so hierarchical names like `release/1.0` survive.
//! Paths outside the expected namespace fall back to their final component.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{Oid, RefKind};
use crate::git::CommandRunner;

/// Errors from taking a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The listing command could not run or exited non-zero.
    #[error("listing {remote} failed: {message}")]
    QueryFailed { remote: String, message: String },

    /// The listing output contained a line that is not `<oid> <ref>`.
    #[error("unexpected listing line from {remote}: '{line}'")]
    Malformed { remote: String, line: String },
}

/// Ref name → commit id for one remote and one ref kind.
///
/// Preserves insertion order (the order the remote listed refs in) and
/// keeps names unique: re-inserting a name replaces its commit id in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefSnapshot {
    entries: Vec<(String, Oid)>,
    index: HashMap<String, usize>,
}

impl RefSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` points at `oid`.
    pub fn insert(&mut self, name: impl Into<String>, oid: Oid) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&pos) => self.entries[pos].1 = oid,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, oid));
            }
        }
    }

    /// The commit `name` points at, if present.
    pub fn get(&self, name: &str) -> Option<&Oid> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries in listing order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Oid)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), o))
    }

    /// Ref names in listing order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `git ls-remote` output for refs of `kind`.
    ///
    /// Blank lines and peeled tag entries (`^{}`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] for any line that is not
    /// `<oid><whitespace><ref-path>`; a snapshot is either complete or unusable.
    pub fn parse(output: &str, kind: RefKind, remote: &str) -> Result<Self, SnapshotError> {
        let mut snapshot = Self::new();

        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let malformed = || SnapshotError::Malformed {
                remote: remote.to_string(),
                line: line.to_string(),
            };

            let mut parts = line.split_whitespace();
            let (oid, path) = match (parts.next(), parts.next(), parts.next()) {
                (Some(oid), Some(path), None) => (oid, path),
                _ => return Err(malformed()),
            };

            if path.ends_with("^{}") {
                continue;
            }

            let oid = Oid::new(oid).map_err(|_| malformed())?;
            let name = leaf_name(path, kind);
            if name.is_empty() {
                return Err(malformed());
            }
            snapshot.insert(name, oid);
        }

        Ok(snapshot)
    }
}

impl FromIterator<(String, Oid)> for RefSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Oid)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (name, oid) in iter {
            snapshot.insert(name, oid);
        }
        snapshot
    }
}

/// Strip the namespace for `kind`, or fall back to the final path component.
fn leaf_name(path: &str, kind: RefKind) -> &str {
    path.strip_prefix(kind.namespace())
        .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path))
}

/// Anything that can produce a [`RefSnapshot`] for a remote.
pub trait SnapshotReader {
    /// Snapshot `remote`'s refs of `kind`. `remote` is a remote name bound
    /// in the reader's repository, or a URL.
    fn snapshot(&self, remote: &str, kind: RefKind) -> Result<RefSnapshot, SnapshotError>;
}

/// [`SnapshotReader`] that shells out to `git ls-remote`.
#[derive(Debug, Clone)]
pub struct LsRemoteReader<R> {
    runner: R,
    dir: PathBuf,
}

impl<R: CommandRunner> LsRemoteReader<R> {
    /// Read snapshots by running `git ls-remote` in `dir`.
    pub fn new(runner: R, dir: &Path) -> Self {
        Self {
            runner,
            dir: dir.to_path_buf(),
        }
    }
}

impl<R: CommandRunner> SnapshotReader for LsRemoteReader<R> {
    fn snapshot(&self, remote: &str, kind: RefKind) -> Result<RefSnapshot, SnapshotError> {
        let output = self
            .runner
            .run(
                &self.dir,
                "git",
                &["ls-remote", kind.ls_remote_flag(), "--refs", remote],
            )
            .map_err(|e| SnapshotError::QueryFailed {
                remote: remote.to_string(),
                message: e.to_string(),
            })?;

        if !output.success() {
            return Err(SnapshotError::QueryFailed {
                remote: remote.to_string(),
                message: format!("exit code {}: {}", output.code, output.diagnostic()),
            });
        }

        let snapshot = RefSnapshot::parse(&output.stdout, kind, remote)?;
        tracing::debug!(remote, kind = %kind, refs = snapshot.len(), "snapshot taken");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::ScriptedRunner;
    use crate::git::CommandOutput;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";

    fn oid(s: &str) -> Oid {
        Oid::new(s).unwrap()
    }

    mod parse {
        use super::*;

        #[test]
        fn branches_in_listing_order() {
            let out = format!("{B}\trefs/heads/main\n{A}\trefs/heads/feature\n");
            let snap = RefSnapshot::parse(&out, RefKind::Branch, "origin").unwrap();
            assert_eq!(snap.names().collect::<Vec<_>>(), vec!["main", "feature"]);
            assert_eq!(snap.get("main"), Some(&oid(B)));
        }

        #[test]
        fn hierarchical_names_preserved() {
            let out = format!("{A}\trefs/heads/release/1.0\n");
            let snap = RefSnapshot::parse(&out, RefKind::Branch, "origin").unwrap();
            assert!(snap.contains("release/1.0"));
        }

        #[test]
        fn foreign_namespace_falls_back_to_last_component() {
            let out = format!("{A}\trefs/remotes/origin/topic\n");
            let snap = RefSnapshot::parse(&out, RefKind::Branch, "origin").unwrap();
            assert!(snap.contains("topic"));
        }

        #[test]
        fn tags_and_peeled_entries() {
            let out = format!("{A}\trefs/tags/v1\n{B}\trefs/tags/v1^{{}}\n");
            let snap = RefSnapshot::parse(&out, RefKind::Tag, "origin").unwrap();
            assert_eq!(snap.len(), 1);
            assert_eq!(snap.get("v1"), Some(&oid(A)));
        }

        #[test]
        fn blank_lines_skipped() {
            let out = format!("\n{A} refs/heads/main\n   \n");
            let snap = RefSnapshot::parse(&out, RefKind::Branch, "origin").unwrap();
            assert_eq!(snap.len(), 1);
        }

        #[test]
        fn empty_output_is_empty_snapshot() {
            let snap = RefSnapshot::parse("", RefKind::Branch, "origin").unwrap();
            assert!(snap.is_empty());
        }

        #[test]
        fn malformed_line_rejected() {
            let err = RefSnapshot::parse("garbage\n", RefKind::Branch, "origin").unwrap_err();
            assert!(matches!(err, SnapshotError::Malformed { .. }));

            let out = format!("{A}\trefs/heads/main extra\n");
            assert!(RefSnapshot::parse(&out, RefKind::Branch, "origin").is_err());
        }

        #[test]
        fn bad_oid_rejected() {
            let err = RefSnapshot::parse("xyz\trefs/heads/main\n", RefKind::Branch, "origin");
            assert!(err.is_err());
        }
    }

    mod snapshot {
        use super::*;

        #[test]
        fn reinsert_replaces_in_place() {
            let mut snap = RefSnapshot::new();
            snap.insert("a", oid(A));
            snap.insert("b", oid(A));
            snap.insert("a", oid(B));
            assert_eq!(snap.names().collect::<Vec<_>>(), vec!["a", "b"]);
            assert_eq!(snap.get("a"), Some(&oid(B)));
            assert_eq!(snap.len(), 2);
        }

        #[test]
        fn from_iterator() {
            let snap: RefSnapshot = vec![("main".to_string(), oid(A))].into_iter().collect();
            assert!(snap.contains("main"));
            assert!(!snap.contains("other"));
        }
    }

    mod reader {
        use super::*;

        #[test]
        fn runs_ls_remote_with_kind_flag() {
            let runner = ScriptedRunner::new();
            runner.respond(
                &["ls-remote", "--tags"],
                CommandOutput::with_stdout(format!("{A}\trefs/tags/v1\n")),
            );
            let reader = LsRemoteReader::new(runner.clone(), Path::new("."));

            let snap = reader.snapshot("mirror", RefKind::Tag).unwrap();
            assert!(snap.contains("v1"));
            assert_eq!(runner.calls(), vec!["git ls-remote --tags --refs mirror"]);
        }

        #[test]
        fn nonzero_exit_is_query_failure() {
            let runner = ScriptedRunner::new();
            runner.respond(
                &["ls-remote"],
                CommandOutput::failed(128, "fatal: could not read from remote repository"),
            );
            let reader = LsRemoteReader::new(runner, Path::new("."));

            let err = reader.snapshot("origin", RefKind::Branch).unwrap_err();
            assert!(matches!(err, SnapshotError::QueryFailed { .. }));
            assert!(err.to_string().contains("could not read"));
        }
    }
}
