//! sync::tags
//!
//! Tag Replicator: the destination ends up with every source tag.
//!
//! Runs after all branches of a pass are replicated:
//!
//! 1. fetch the destination's tags into the workspace
//! 2. fetch the source's tags, overwriting same-named ones
//! 3. force-push every local tag to the destination
//!
//! When both sides have a tag of the same name at different commits, the
//! source's wins. Destination-only tags survive because step 1 pulled them
//! into the workspace before step 3 pushes everything back.

use super::error::{SyncError, TagStep};
use crate::git::{CommandRunner, Workspace, DESTINATION_REMOTE, SOURCE_REMOTE};

/// Replays tags through a [`Workspace`].
#[derive(Debug)]
pub struct TagReplicator<'a, R> {
    ws: &'a Workspace<R>,
}

impl<'a, R: CommandRunner> TagReplicator<'a, R> {
    pub fn new(ws: &'a Workspace<R>) -> Self {
        Self { ws }
    }

    /// Run the three tag steps, stopping at the first failure.
    pub fn replicate(&self) -> Result<(), SyncError> {
        tracing::info!("syncing tags");

        let steps = [
            (TagStep::FetchDestination, DESTINATION_REMOTE),
            (TagStep::FetchSource, SOURCE_REMOTE),
            (TagStep::Push, DESTINATION_REMOTE),
        ];

        for (step, remote) in steps {
            let output = match step {
                TagStep::FetchDestination => self.ws.fetch_tags(remote, false)?,
                TagStep::FetchSource => self.ws.fetch_tags(remote, true)?,
                TagStep::Push => self.ws.push_tags(remote)?,
            };

            if !output.success() {
                return Err(SyncError::TagSyncFailed {
                    step,
                    remote: remote.to_string(),
                    message: output.diagnostic(),
                });
            }
            tracing::debug!(%step, remote, "tag step done");
        }

        tracing::info!("tags synced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::ScriptedRunner;
    use crate::git::CommandOutput;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir, runner: &ScriptedRunner) -> Workspace<ScriptedRunner> {
        Workspace::prepare(&dir.path().join("ws"), "src", "dst", None, runner.clone()).unwrap()
    }

    #[test]
    fn destination_first_then_source_then_push() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let ws = workspace(&dir, &runner);

        TagReplicator::new(&ws).replicate().unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "git fetch mirror --tags",
                "git fetch origin --tags --force",
                "git push mirror --tags --force",
            ]
        );
    }

    #[test]
    fn each_step_has_its_own_code() {
        let cases = [
            (vec!["fetch", "mirror"], -14),
            (vec!["fetch", "origin"], -15),
            (vec!["push"], -16),
        ];
        for (prefix, code) in cases {
            let dir = TempDir::new().unwrap();
            let runner = ScriptedRunner::new();
            runner.respond(&prefix, CommandOutput::failed(1, "boom"));
            let ws = workspace(&dir, &runner);

            let err = TagReplicator::new(&ws).replicate().unwrap_err();
            assert_eq!(err.code(), code, "failing {:?}", prefix);
            assert!(err.to_string().contains("branches were already synchronized"));
        }
    }

    #[test]
    fn failure_stops_later_steps() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(&["fetch", "mirror"], CommandOutput::failed(128, "unreachable"));
        let ws = workspace(&dir, &runner);

        assert!(TagReplicator::new(&ws).replicate().is_err());
        assert_eq!(runner.calls().len(), 1);
    }
}
