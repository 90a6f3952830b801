//! sync
//!
//! The synchronization engine.
//!
//! # Pipeline
//!
//! One directional pass flows through:
//!
//! 1. [`snapshot`]: branch → commit listings for source and destination
//! 2. [`classify`]: which accepted branches are `added` or `updated`
//! 3. [`branches`]: copy added branches, merge-and-push updated ones
//! 4. [`tags`]: source tags overwrite destination tags
//!
//! [`orchestrator`] drives the pipeline as a state machine and runs the two
//! directions of a job. [`error`] maps every failure to its exit code.
//!
//! Passes only add or advance refs. Nothing here ever deletes a ref.

pub mod branches;
pub mod classify;
pub mod error;
pub mod orchestrator;
pub mod snapshot;
pub mod tags;

pub use classify::{classify, AcceptRules, ChangeKind, ChangeSet};
pub use error::{FailureSite, SyncError};
pub use orchestrator::{JobPlan, JobReport, Orchestrator, PassDirection, PassReport, PassState};
pub use snapshot::{RefSnapshot, SnapshotReader};
