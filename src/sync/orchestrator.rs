//! sync::orchestrator
//!
//! Drives directional passes and bidirectional jobs.
//!
//! # Pass state machine
//!
//! ```text
//! Init → SnapshotSource → SnapshotDestination → Classify
//!      → ReplicateBranches → ReplicateTags → Done
//! ```
//!
//! `Init` trusts the source's SSH host (when enabled), then locks, wipes
//! and rebuilds the workspace bound to both remotes. Any failing step moves
//! the pass to the terminal `Failed(site)` state and returns the error; the
//! site's code is what the process exits with.
//!
//! # Jobs
//!
//! A bidirectional job runs origin → mirror with the job's `origin_accept`
//! rules and, only if that pass succeeds, mirror → origin with
//! `mirror_accept`. The first failure across both passes is the job's
//! result.

use std::path::Path;

use serde::Serialize;

use super::branches::{BranchOutcome, BranchReplicator};
use super::classify::{classify, AcceptRules, ChangeSet};
use super::error::{FailureSite, SyncError};
use super::snapshot::{LsRemoteReader, RefSnapshot, SnapshotError, SnapshotReader};
use super::tags::TagReplicator;
use crate::core::config::{ConfigError, IdentityConfig, JobConfig};
use crate::core::lock::LockError;
use crate::core::types::{Direction, RefKind, Side};
use crate::git::{
    CommandRunner, Workspace, WorkspaceError, DESTINATION_REMOTE, RESERVED_BRANCH, SOURCE_REMOTE,
};
use crate::ssh::{extract_host, HostTrust};

/// Which way a single pass copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassDirection {
    OriginToMirror,
    MirrorToOrigin,
}

impl PassDirection {
    /// The passes a job runs, in order.
    pub fn for_job(direction: Direction) -> Vec<PassDirection> {
        let mut passes = Vec::with_capacity(2);
        if direction.includes_origin_to_mirror() {
            passes.push(PassDirection::OriginToMirror);
        }
        if direction.includes_mirror_to_origin() {
            passes.push(PassDirection::MirrorToOrigin);
        }
        passes
    }

    pub fn source_url(self, job: &JobConfig) -> &str {
        match self {
            PassDirection::OriginToMirror => &job.origin,
            PassDirection::MirrorToOrigin => &job.mirror,
        }
    }

    pub fn destination_url(self, job: &JobConfig) -> &str {
        match self {
            PassDirection::OriginToMirror => &job.mirror,
            PassDirection::MirrorToOrigin => &job.origin,
        }
    }

    /// Accept rules configured for this direction's source.
    pub fn rules(self, job: &JobConfig) -> &[String] {
        match self {
            PassDirection::OriginToMirror => &job.origin_accept,
            PassDirection::MirrorToOrigin => &job.mirror_accept,
        }
    }
}

impl std::fmt::Display for PassDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassDirection::OriginToMirror => f.write_str("origin -> mirror"),
            PassDirection::MirrorToOrigin => f.write_str("mirror -> origin"),
        }
    }
}

/// Where a pass is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Init,
    SnapshotSource,
    SnapshotDestination,
    Classify,
    ReplicateBranches,
    ReplicateTags,
    Done,
    Failed(FailureSite),
}

impl PassState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Done | PassState::Failed(_))
    }
}

/// What a completed pass did.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub direction: PassDirection,
    pub changes: ChangeSet,
    /// Updated branches merged and pushed.
    pub merged: Vec<String>,
    /// Added branches copied.
    pub copied: Vec<String>,
}

/// What a completed job did, one report per pass.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job: String,
    pub passes: Vec<PassReport>,
}

/// Branch and tag changes one pass would make, without making them.
#[derive(Debug, Clone, Serialize)]
pub struct PassPlan {
    pub direction: PassDirection,
    pub branches: ChangeSet,
    /// Tags the destination lacks (`added`) or would have overwritten
    /// (`updated`).
    pub tags: ChangeSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPlan {
    pub job: String,
    pub passes: Vec<PassPlan>,
}

/// Runs passes with a shared runner, identity and host-trust policy.
pub struct Orchestrator<R> {
    runner: R,
    identity: Option<IdentityConfig>,
    trust: Option<Box<dyn HostTrust>>,
}

impl<R: CommandRunner + Clone> Orchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            identity: None,
            trust: None,
        }
    }

    /// Committer identity written into every workspace.
    pub fn with_identity(mut self, identity: Option<IdentityConfig>) -> Self {
        self.identity = identity;
        self
    }

    /// Trust each pass's source host through `trust` before contacting it.
    pub fn with_trust(mut self, trust: Box<dyn HostTrust>) -> Self {
        self.trust = Some(trust);
        self
    }

    /// Build one directional pass of `job`, ready to step.
    pub fn pass<'a>(
        &'a self,
        job: &'a JobConfig,
        direction: PassDirection,
    ) -> Result<Pass<'a, R>, SyncError> {
        let rules = compile_rules(job, direction)?;
        Ok(Pass {
            orchestrator: self,
            direction,
            source_url: direction.source_url(job),
            destination_url: direction.destination_url(job),
            workspace_path: &job.workspace,
            rules,
            state: PassState::Init,
            workspace: None,
            source: RefSnapshot::new(),
            destination: RefSnapshot::new(),
            changes: ChangeSet::default(),
            outcome: BranchOutcome::default(),
        })
    }

    /// Run one directional pass of `job` to completion.
    pub fn run_pass(
        &self,
        job: &JobConfig,
        direction: PassDirection,
    ) -> Result<PassReport, SyncError> {
        self.pass(job, direction)?.run()
    }

    /// Run every pass `job.direction` selects, stopping at the first failure.
    pub fn run_job(&self, job: &JobConfig) -> Result<JobReport, SyncError> {
        let span = tracing::info_span!("job", job = %job.name);
        let _enter = span.enter();

        let mut report = JobReport {
            job: job.name.clone(),
            passes: Vec::new(),
        };
        for direction in PassDirection::for_job(job.direction) {
            report.passes.push(self.run_pass(job, direction)?);
        }
        Ok(report)
    }

    /// Classify what `job` would change, reading both remotes directly.
    ///
    /// Nothing is fetched, merged or pushed, and no workspace is touched.
    pub fn plan_job(&self, job: &JobConfig) -> Result<JobPlan, SyncError> {
        let scratch = std::env::temp_dir();
        let reader = LsRemoteReader::new(&self.runner, &scratch);
        let all_tags = AcceptRules::accept_all();

        let mut plan = JobPlan {
            job: job.name.clone(),
            passes: Vec::new(),
        };
        for direction in PassDirection::for_job(job.direction) {
            let rules = compile_rules(job, direction)?;
            let source = direction.source_url(job);
            let destination = direction.destination_url(job);

            let snap = |side: Side, url: &str, kind: RefKind| {
                reader
                    .snapshot(url, kind)
                    .map_err(|e| query_error(side, kind, e))
            };

            let mut branches = classify(
                &snap(Side::Source, source, RefKind::Branch)?,
                &snap(Side::Destination, destination, RefKind::Branch)?,
                &rules,
            );
            withhold_reserved(&mut branches);
            let tags = classify(
                &snap(Side::Source, source, RefKind::Tag)?,
                &snap(Side::Destination, destination, RefKind::Tag)?,
                &all_tags,
            );

            plan.passes.push(PassPlan {
                direction,
                branches,
                tags,
            });
        }
        Ok(plan)
    }
}

/// One directional pass. Advance it with [`Pass::step`] or [`Pass::run`].
pub struct Pass<'a, R> {
    orchestrator: &'a Orchestrator<R>,
    direction: PassDirection,
    source_url: &'a str,
    destination_url: &'a str,
    workspace_path: &'a Path,
    rules: AcceptRules,
    state: PassState,
    workspace: Option<Workspace<R>>,
    source: RefSnapshot,
    destination: RefSnapshot,
    changes: ChangeSet,
    outcome: BranchOutcome,
}

impl<'a, R: CommandRunner + Clone> Pass<'a, R> {
    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn direction(&self) -> PassDirection {
        self.direction
    }

    /// Changes classified so far (empty before `Classify` ran).
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Execute the current state and move to the next one.
    ///
    /// Stepping a terminal pass is a no-op.
    pub fn step(&mut self) -> Result<PassState, SyncError> {
        let result = match self.state {
            PassState::Init => self.init().map(|()| PassState::SnapshotSource),
            PassState::SnapshotSource => self
                .snapshot(Side::Source)
                .map(|snap| {
                    self.source = snap;
                    PassState::SnapshotDestination
                }),
            PassState::SnapshotDestination => self
                .snapshot(Side::Destination)
                .map(|snap| {
                    self.destination = snap;
                    PassState::Classify
                }),
            PassState::Classify => {
                self.classify();
                Ok(PassState::ReplicateBranches)
            }
            PassState::ReplicateBranches => self.replicate_branches().map(|outcome| {
                self.outcome = outcome;
                PassState::ReplicateTags
            }),
            PassState::ReplicateTags => self.replicate_tags().map(|()| PassState::Done),
            terminal => return Ok(terminal),
        };

        match result {
            Ok(next) => {
                tracing::trace!(direction = %self.direction, state = ?next, "pass advanced");
                self.state = next;
                if next == PassState::Done {
                    tracing::info!(direction = %self.direction, "pass complete");
                }
                Ok(next)
            }
            Err(err) => {
                let site = err.site();
                tracing::error!(
                    direction = %self.direction,
                    code = site.code(),
                    "pass failed: {}",
                    err
                );
                self.state = PassState::Failed(site);
                Err(err)
            }
        }
    }

    /// Step until the pass is done or fails.
    pub fn run(mut self) -> Result<PassReport, SyncError> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(PassReport {
            direction: self.direction,
            changes: self.changes,
            merged: self.outcome.merged,
            copied: self.outcome.copied,
        })
    }

    fn init(&mut self) -> Result<(), SyncError> {
        tracing::info!(
            direction = %self.direction,
            source = self.source_url,
            destination = self.destination_url,
            "starting pass"
        );

        if let Some(trust) = &self.orchestrator.trust {
            let host = extract_host(self.source_url).ok_or_else(|| SyncError::HostUnknown {
                url: self.source_url.to_string(),
            })?;
            trust.trust(host).map_err(|e| SyncError::HostTrust {
                host: host.to_string(),
                message: e.to_string(),
            })?;
        }

        let workspace = Workspace::prepare(
            self.workspace_path,
            self.source_url,
            self.destination_url,
            self.orchestrator.identity.as_ref(),
            self.orchestrator.runner.clone(),
        )
        .map_err(|e| workspace_error(self.workspace_path, e))?;

        self.workspace = Some(workspace);
        Ok(())
    }

    fn workspace(&self) -> Result<&Workspace<R>, SyncError> {
        self.workspace.as_ref().ok_or_else(|| SyncError::WorkspaceInit {
            path: self.workspace_path.to_path_buf(),
            message: "workspace was not prepared".to_string(),
        })
    }

    fn snapshot(&self, side: Side) -> Result<RefSnapshot, SyncError> {
        let ws = self.workspace()?;
        let remote = match side {
            Side::Source => SOURCE_REMOTE,
            Side::Destination => DESTINATION_REMOTE,
        };
        LsRemoteReader::new(ws.runner(), ws.path())
            .snapshot(remote, RefKind::Branch)
            .map_err(|e| query_error(side, RefKind::Branch, e))
    }

    fn classify(&mut self) {
        if self.rules.is_empty() {
            tracing::warn!(direction = %self.direction, "no accept rules, only tags will move");
        }
        self.changes = classify(&self.source, &self.destination, &self.rules);
        withhold_reserved(&mut self.changes);

        for name in &self.changes.unchanged {
            tracing::info!(branch = %name, "already up to date");
        }
        for name in &self.changes.skipped {
            tracing::debug!(branch = %name, "not accepted, skipping");
        }
        tracing::info!(
            direction = %self.direction,
            added = self.changes.added.len(),
            updated = self.changes.updated.len(),
            unchanged = self.changes.unchanged.len(),
            "branches classified"
        );
    }

    fn replicate_branches(&self) -> Result<BranchOutcome, SyncError> {
        BranchReplicator::new(self.workspace()?).replicate(&self.changes)
    }

    fn replicate_tags(&self) -> Result<(), SyncError> {
        TagReplicator::new(self.workspace()?).replicate()
    }
}

fn compile_rules(job: &JobConfig, direction: PassDirection) -> Result<AcceptRules, SyncError> {
    AcceptRules::new(direction.rules(job)).map_err(|e| {
        SyncError::Config(ConfigError::InvalidValue(format!(
            "job '{}': invalid accept rule: {}",
            job.name, e
        )))
    })
}

fn withhold_reserved(changes: &mut ChangeSet) {
    if changes.exclude(RESERVED_BRANCH) {
        tracing::warn!(branch = RESERVED_BRANCH, "branch name is reserved, skipping");
    }
}

fn query_error(side: Side, kind: RefKind, err: SnapshotError) -> SyncError {
    let (remote, message) = match err {
        SnapshotError::QueryFailed { remote, message } => (remote, message),
        SnapshotError::Malformed { remote, line } => {
            (remote, format!("unexpected listing line '{}'", line))
        }
    };
    SyncError::RemoteQuery {
        side,
        remote,
        kind,
        message,
    }
}

fn workspace_error(path: &Path, err: WorkspaceError) -> SyncError {
    match err {
        WorkspaceError::Locked(LockError::AlreadyLocked(_)) => SyncError::WorkspaceLocked {
            path: path.to_path_buf(),
        },
        WorkspaceError::Locked(err) => SyncError::WorkspaceInit {
            path: path.to_path_buf(),
            message: err.to_string(),
        },
        WorkspaceError::Init { path, message } => SyncError::WorkspaceInit { path, message },
        WorkspaceError::Remote {
            side, url, message, ..
        } => SyncError::RemoteBind { side, url, message },
    }
}
