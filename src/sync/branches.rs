//! sync::branches
//!
//! Branch Replicator: make the destination's branches contain the source's.
//!
//! # Updated branches
//!
//! The destination's copy is the base, the source's copy is merged into it:
//!
//! 1. fetch the branch from the destination
//! 2. switch to it
//! 3. pull (merge) the source's copy
//! 4. push the result back to the destination
//!
//! When the merge cannot complete, nothing is pushed: the destination keeps
//! its pre-pass commit and the pass fails with a merge-conflict error
//! naming both commits.
//!
//! # Added branches
//!
//! Fetched from the source and pushed to the destination verbatim.
//!
//! # Ordering
//!
//! Updated branches are replayed before added ones, each in source listing
//! order. The first failure stops the pass; no later branch is attempted.

use super::classify::{AddedRef, ChangeKind, ChangeSet, UpdatedRef};
use super::error::SyncError;
use crate::git::{CommandOutput, CommandRunner, Workspace, DESTINATION_REMOTE, SOURCE_REMOTE};

/// Replays branch changes through a [`Workspace`].
#[derive(Debug)]
pub struct BranchReplicator<'a, R> {
    ws: &'a Workspace<R>,
}

/// What a replicator did with one change set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchOutcome {
    /// Updated branches merged and pushed, in replay order.
    pub merged: Vec<String>,
    /// Added branches copied, in replay order.
    pub copied: Vec<String>,
}

impl<'a, R: CommandRunner> BranchReplicator<'a, R> {
    pub fn new(ws: &'a Workspace<R>) -> Self {
        Self { ws }
    }

    /// Replay every change in `changes`: updated branches first, then added.
    ///
    /// # Errors
    ///
    /// Returns the first failure; branches after it are not attempted.
    pub fn replicate(&self, changes: &ChangeSet) -> Result<BranchOutcome, SyncError> {
        let mut outcome = BranchOutcome::default();

        for change in &changes.updated {
            self.replicate_updated(change)?;
            outcome.merged.push(change.name.clone());
        }

        for change in &changes.added {
            self.replicate_added(change)?;
            outcome.copied.push(change.name.clone());
        }

        Ok(outcome)
    }

    /// Merge the source's copy of an updated branch into the destination's.
    pub fn replicate_updated(&self, change: &UpdatedRef) -> Result<(), SyncError> {
        let branch = change.name.as_str();
        tracing::info!(
            branch,
            source = change.source.short(8),
            destination = change.destination.short(8),
            "syncing updated branch"
        );

        let fetched = self.ws.fetch_branch(DESTINATION_REMOTE, branch)?;
        if !fetched.success() {
            return Err(SyncError::FetchFailed {
                branch: branch.to_string(),
                change: ChangeKind::Updated,
                remote: DESTINATION_REMOTE.to_string(),
                message: fetched.diagnostic(),
            });
        }

        let switched = self.ws.switch(branch)?;
        if !switched.success() {
            return Err(SyncError::SwitchFailed {
                branch: branch.to_string(),
                message: switched.diagnostic(),
            });
        }

        let pulled = self.ws.pull(SOURCE_REMOTE, branch)?;
        if !pulled.success() {
            return Err(self.pull_failure(change, &pulled));
        }

        let pushed = self.ws.push_branch(DESTINATION_REMOTE, branch)?;
        if !pushed.success() {
            return Err(SyncError::PushRejected {
                branch: branch.to_string(),
                change: ChangeKind::Updated,
                remote: DESTINATION_REMOTE.to_string(),
                message: pushed.diagnostic(),
            });
        }

        tracing::info!(branch, "updated branch synced");
        Ok(())
    }

    /// Copy an added branch from the source to the destination.
    pub fn replicate_added(&self, change: &AddedRef) -> Result<(), SyncError> {
        let branch = change.name.as_str();
        tracing::info!(branch, source = change.source.short(8), "syncing added branch");

        let fetched = self.ws.fetch_branch(SOURCE_REMOTE, branch)?;
        if !fetched.success() {
            return Err(SyncError::FetchFailed {
                branch: branch.to_string(),
                change: ChangeKind::Added,
                remote: SOURCE_REMOTE.to_string(),
                message: fetched.diagnostic(),
            });
        }

        let pushed = self.ws.push_branch(DESTINATION_REMOTE, branch)?;
        if !pushed.success() {
            return Err(SyncError::PushRejected {
                branch: branch.to_string(),
                change: ChangeKind::Added,
                remote: DESTINATION_REMOTE.to_string(),
                message: pushed.diagnostic(),
            });
        }

        tracing::info!(branch, "added branch synced");
        Ok(())
    }

    /// Decide whether a failed pull was a merge the tool cannot resolve or
    /// a failure to reach the source.
    fn pull_failure(&self, change: &UpdatedRef, pulled: &CommandOutput) -> SyncError {
        if self.ws.has_conflicts() || self.ws.merge_in_progress() || reports_conflict(pulled) {
            tracing::warn!(branch = %change.name, "merge conflict, manual merge required");
            return SyncError::MergeConflict {
                branch: change.name.clone(),
                source_oid: change.source.clone(),
                destination_oid: change.destination.clone(),
                message: pulled.diagnostic(),
            };
        }

        SyncError::FetchFailed {
            branch: change.name.clone(),
            change: ChangeKind::Updated,
            remote: SOURCE_REMOTE.to_string(),
            message: pulled.diagnostic(),
        }
    }
}

/// Whether git's own output says the merge could not be made.
fn reports_conflict(output: &CommandOutput) -> bool {
    [&output.stdout, &output.stderr].iter().any(|text| {
        text.contains("CONFLICT")
            || text.contains("Automatic merge failed")
            || text.contains("unrelated histories")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Oid;
    use crate::git::mock::ScriptedRunner;
    use tempfile::TempDir;

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    fn workspace(dir: &TempDir, runner: &ScriptedRunner) -> Workspace<ScriptedRunner> {
        Workspace::prepare(
            &dir.path().join("ws"),
            "/srv/origin.git",
            "/srv/mirror.git",
            None,
            runner.clone(),
        )
        .unwrap()
    }

    fn updated(name: &str) -> UpdatedRef {
        UpdatedRef {
            name: name.into(),
            source: oid('a'),
            destination: oid('b'),
        }
    }

    fn added(name: &str) -> AddedRef {
        AddedRef {
            name: name.into(),
            source: oid('c'),
        }
    }

    #[test]
    fn updated_branch_merges_source_into_destination() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let ws = workspace(&dir, &runner);

        BranchReplicator::new(&ws)
            .replicate_updated(&updated("main"))
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "git fetch --force --no-tags mirror refs/heads/main:refs/heads/main",
                "git switch main",
                "git pull --no-rebase --ff --no-edit origin refs/heads/main",
                "git push mirror refs/heads/main:refs/heads/main",
            ]
        );
    }

    #[test]
    fn added_branch_is_copied() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let ws = workspace(&dir, &runner);

        BranchReplicator::new(&ws)
            .replicate_added(&added("feature"))
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "git fetch --force --no-tags origin refs/heads/feature:refs/heads/feature",
                "git push mirror refs/heads/feature:refs/heads/feature",
            ]
        );
    }

    #[test]
    fn conflict_stops_before_push() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(
            &["pull"],
            CommandOutput {
                code: 1,
                stdout: "CONFLICT (content): Merge conflict in README\n\
                         Automatic merge failed; fix conflicts and then commit the result.\n"
                    .into(),
                stderr: String::new(),
            },
        );
        let ws = workspace(&dir, &runner);

        let err = BranchReplicator::new(&ws)
            .replicate_updated(&updated("main"))
            .unwrap_err();

        assert_eq!(err.code(), -101);
        assert!(err.to_string().contains("aaaaaaaa"));
        assert!(err.to_string().contains("bbbbbbbb"));
        assert!(runner.calls_to("push").is_empty());
    }

    #[test]
    fn unrelated_histories_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(
            &["pull"],
            CommandOutput::failed(128, "fatal: refusing to merge unrelated histories"),
        );
        let ws = workspace(&dir, &runner);

        let err = BranchReplicator::new(&ws)
            .replicate_updated(&updated("main"))
            .unwrap_err();
        assert!(matches!(err, SyncError::MergeConflict { .. }));
    }

    #[test]
    fn unreachable_source_during_pull_is_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(
            &["pull"],
            CommandOutput::failed(128, "fatal: could not read from remote repository"),
        );
        let ws = workspace(&dir, &runner);

        let err = BranchReplicator::new(&ws)
            .replicate_updated(&updated("main"))
            .unwrap_err();
        assert_eq!(err.code(), -9);
        assert!(runner.calls_to("push").is_empty());
    }

    #[test]
    fn failure_codes_per_step() {
        let cases: [(&[&str], i32); 3] = [
            (&["fetch"][..], -9),
            (&["switch"][..], -10),
            (&["push"][..], -11),
        ];
        for (prefix, code) in cases {
            let dir = TempDir::new().unwrap();
            let runner = ScriptedRunner::new();
            runner.respond(prefix, CommandOutput::failed(1, "boom"));
            let ws = workspace(&dir, &runner);

            let err = BranchReplicator::new(&ws)
                .replicate_updated(&updated("main"))
                .unwrap_err();
            assert_eq!(err.code(), code, "failing {:?}", prefix);
        }

        for (prefix, code) in [(&["fetch"][..], -12), (&["push"][..], -13)] {
            let dir = TempDir::new().unwrap();
            let runner = ScriptedRunner::new();
            runner.respond(prefix, CommandOutput::failed(1, "boom"));
            let ws = workspace(&dir, &runner);

            let err = BranchReplicator::new(&ws)
                .replicate_added(&added("feature"))
                .unwrap_err();
            assert_eq!(err.code(), code, "failing {:?}", prefix);
        }
    }

    #[test]
    fn updated_before_added_and_fail_fast() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(
            &["push", "mirror", "refs/heads/second:refs/heads/second"],
            CommandOutput::failed(1, "! [rejected] second -> second (fetch first)"),
        );
        let ws = workspace(&dir, &runner);

        let changes = ChangeSet {
            added: vec![added("new")],
            updated: vec![updated("first"), updated("second"), updated("third")],
            ..ChangeSet::default()
        };

        let err = BranchReplicator::new(&ws).replicate(&changes).unwrap_err();
        assert_eq!(err.code(), -11);
        assert!(err.is_transient());

        let switched: Vec<_> = runner.calls_to("switch");
        assert_eq!(switched, vec!["git switch first", "git switch second"]);
        assert!(runner
            .calls()
            .iter()
            .all(|c| !c.contains("refs/heads/new")));
    }

    #[test]
    fn replicate_reports_outcome() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let ws = workspace(&dir, &runner);

        let changes = ChangeSet {
            added: vec![added("b")],
            updated: vec![updated("a")],
            ..ChangeSet::default()
        };
        let outcome = BranchReplicator::new(&ws).replicate(&changes).unwrap();
        assert_eq!(outcome.merged, vec!["a"]);
        assert_eq!(outcome.copied, vec!["b"]);
    }
}
