//! sync::error
//!
//! Failure taxonomy for a sync pass and the exit code attached to each
//! failure site.
//!
//! Every failure short-circuits its pass. The error carries enough context
//! (ref name, remote, both commit ids where relevant, git's own diagnostic)
//! to act on without rerunning in verbose mode.
//!
//! # Exit codes
//!
//! | Site                    | Code |
//! |-------------------------|------|
//! | unexpected              | -1   |
//! | host trust failed       | -2   |
//! | host not extractable    | -3   |
//! | workspace init          | -4   |
//! | add source remote       | -5   |
//! | add destination remote  | -6   |
//! | source snapshot         | -7   |
//! | destination snapshot    | -8   |
//! | fetch updated branch    | -9   |
//! | switch branch           | -10  |
//! | push updated branch     | -11  |
//! | fetch added branch      | -12  |
//! | push added branch       | -13  |
//! | fetch destination tags  | -14  |
//! | fetch source tags       | -15  |
//! | push tags               | -16  |
//! | workspace locked        | -17  |
//! | configuration           | -18  |
//! | merge conflict          | -101 |

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::types::{Oid, RefKind, Side};
use crate::git::RunnerError;
use crate::sync::classify::ChangeKind;

/// Where a pass failed. Each site has its own process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureSite {
    Unexpected,
    HostTrust,
    HostUnknown,
    WorkspaceInit,
    SourceRemote,
    DestinationRemote,
    SourceSnapshot,
    DestinationSnapshot,
    FetchUpdated,
    Switch,
    PushUpdated,
    FetchAdded,
    PushAdded,
    FetchDestinationTags,
    FetchSourceTags,
    PushTags,
    WorkspaceLocked,
    Config,
    MergeConflict,
}

impl FailureSite {
    /// Every site, in code order.
    pub const ALL: [FailureSite; 19] = [
        FailureSite::Unexpected,
        FailureSite::HostTrust,
        FailureSite::HostUnknown,
        FailureSite::WorkspaceInit,
        FailureSite::SourceRemote,
        FailureSite::DestinationRemote,
        FailureSite::SourceSnapshot,
        FailureSite::DestinationSnapshot,
        FailureSite::FetchUpdated,
        FailureSite::Switch,
        FailureSite::PushUpdated,
        FailureSite::FetchAdded,
        FailureSite::PushAdded,
        FailureSite::FetchDestinationTags,
        FailureSite::FetchSourceTags,
        FailureSite::PushTags,
        FailureSite::WorkspaceLocked,
        FailureSite::Config,
        FailureSite::MergeConflict,
    ];

    /// The process exit code reported for this site.
    pub fn code(self) -> i32 {
        match self {
            FailureSite::Unexpected => -1,
            FailureSite::HostTrust => -2,
            FailureSite::HostUnknown => -3,
            FailureSite::WorkspaceInit => -4,
            FailureSite::SourceRemote => -5,
            FailureSite::DestinationRemote => -6,
            FailureSite::SourceSnapshot => -7,
            FailureSite::DestinationSnapshot => -8,
            FailureSite::FetchUpdated => -9,
            FailureSite::Switch => -10,
            FailureSite::PushUpdated => -11,
            FailureSite::FetchAdded => -12,
            FailureSite::PushAdded => -13,
            FailureSite::FetchDestinationTags => -14,
            FailureSite::FetchSourceTags => -15,
            FailureSite::PushTags => -16,
            FailureSite::WorkspaceLocked => -17,
            FailureSite::Config => -18,
            FailureSite::MergeConflict => -101,
        }
    }

    /// Short description for documentation and `--help` output.
    pub fn description(self) -> &'static str {
        match self {
            FailureSite::Unexpected => "unexpected error",
            FailureSite::HostTrust => "ssh host could not be trusted",
            FailureSite::HostUnknown => "no ssh host in source url",
            FailureSite::WorkspaceInit => "working repository could not be created",
            FailureSite::SourceRemote => "source remote could not be added",
            FailureSite::DestinationRemote => "destination remote could not be added",
            FailureSite::SourceSnapshot => "listing source refs failed",
            FailureSite::DestinationSnapshot => "listing destination refs failed",
            FailureSite::FetchUpdated => "fetching an updated branch failed",
            FailureSite::Switch => "switching to an updated branch failed",
            FailureSite::PushUpdated => "push of an updated branch rejected",
            FailureSite::FetchAdded => "fetching an added branch failed",
            FailureSite::PushAdded => "push of an added branch rejected",
            FailureSite::FetchDestinationTags => "fetching destination tags failed",
            FailureSite::FetchSourceTags => "fetching source tags failed",
            FailureSite::PushTags => "pushing tags failed",
            FailureSite::WorkspaceLocked => "working repository in use by another pass",
            FailureSite::Config => "configuration invalid",
            FailureSite::MergeConflict => "merge conflict, manual merge required",
        }
    }
}

impl std::fmt::Display for FailureSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// The three steps of tag replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStep {
    FetchDestination,
    FetchSource,
    Push,
}

impl std::fmt::Display for TagStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagStep::FetchDestination => f.write_str("fetch destination tags"),
            TagStep::FetchSource => f.write_str("fetch source tags"),
            TagStep::Push => f.write_str("push tags"),
        }
    }
}

/// Errors from a sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No SSH host could be extracted from the source url.
    #[error("cannot determine ssh host from '{url}'")]
    HostUnknown { url: String },

    /// The SSH trust collaborator failed.
    #[error("failed to trust ssh host '{host}': {message}")]
    HostTrust { host: String, message: String },

    /// Another pass holds the workspace.
    #[error("workspace {} is in use by another sync pass", .path.display())]
    WorkspaceLocked { path: PathBuf },

    /// The working repository could not be (re)created.
    #[error("failed to initialize workspace {}: {message}", .path.display())]
    WorkspaceInit { path: PathBuf, message: String },

    /// A remote could not be bound to the working repository.
    #[error("failed to add {side} remote {url}: {message}")]
    RemoteBind {
        side: Side,
        url: String,
        message: String,
    },

    /// Listing a remote's refs failed; no partial snapshot is usable.
    #[error("failed to list {} of {side} remote {remote}: {message}", .kind.plural())]
    RemoteQuery {
        side: Side,
        remote: String,
        kind: RefKind,
        message: String,
    },

    /// Fetching a branch into the working repository failed.
    #[error("failed to fetch {change} branch '{branch}' from {remote}: {message}")]
    FetchFailed {
        branch: String,
        change: ChangeKind,
        remote: String,
        message: String,
    },

    /// Checking out an updated branch failed.
    #[error("failed to switch to branch '{branch}': {message}")]
    SwitchFailed { branch: String, message: String },

    /// The source branch cannot be merged into the destination branch
    /// without a human.
    #[error(
        "branch '{branch}' cannot be merged automatically (source {}, destination {}); \
         merge it manually and rerun: {message}",
        .source_oid.short(8),
        .destination_oid.short(8)
    )]
    MergeConflict {
        branch: String,
        source_oid: Oid,
        destination_oid: Oid,
        message: String,
    },

    /// The destination refused a branch push, usually because it advanced
    /// while the pass was running.
    #[error(
        "push of {change} branch '{branch}' to {remote} rejected: {message}; \
         the destination may have received a conflicting ref during this sync, rerun required"
    )]
    PushRejected {
        branch: String,
        change: ChangeKind,
        remote: String,
        message: String,
    },

    /// Tag replication failed after every branch was replicated.
    #[error("tag sync failed at '{step}' ({remote}): {message}; branches were already synchronized")]
    TagSyncFailed {
        step: TagStep,
        remote: String,
        message: String,
    },

    /// A git subprocess could not be started.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// The failure site this error is reported under.
    pub fn site(&self) -> FailureSite {
        match self {
            SyncError::HostUnknown { .. } => FailureSite::HostUnknown,
            SyncError::HostTrust { .. } => FailureSite::HostTrust,
            SyncError::WorkspaceLocked { .. } => FailureSite::WorkspaceLocked,
            SyncError::WorkspaceInit { .. } => FailureSite::WorkspaceInit,
            SyncError::RemoteBind { side, .. } => match side {
                Side::Source => FailureSite::SourceRemote,
                Side::Destination => FailureSite::DestinationRemote,
            },
            SyncError::RemoteQuery { side, .. } => match side {
                Side::Source => FailureSite::SourceSnapshot,
                Side::Destination => FailureSite::DestinationSnapshot,
            },
            SyncError::FetchFailed { change, .. } => match change {
                ChangeKind::Added => FailureSite::FetchAdded,
                ChangeKind::Updated => FailureSite::FetchUpdated,
            },
            SyncError::SwitchFailed { .. } => FailureSite::Switch,
            SyncError::MergeConflict { .. } => FailureSite::MergeConflict,
            SyncError::PushRejected { change, .. } => match change {
                ChangeKind::Added => FailureSite::PushAdded,
                ChangeKind::Updated => FailureSite::PushUpdated,
            },
            SyncError::TagSyncFailed { step, .. } => match step {
                TagStep::FetchDestination => FailureSite::FetchDestinationTags,
                TagStep::FetchSource => FailureSite::FetchSourceTags,
                TagStep::Push => FailureSite::PushTags,
            },
            SyncError::Runner(_) => FailureSite::Unexpected,
            SyncError::Config(_) => FailureSite::Config,
        }
    }

    /// The process exit code for this error.
    pub fn code(&self) -> i32 {
        self.site().code()
    }

    /// Whether rerunning the whole pass is the recommended fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::PushRejected { .. })
    }
}
