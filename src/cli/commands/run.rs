//! run command - Synchronize configured repository pairs
//!
//! # Example
//!
//! ```bash
//! # Sync every job, both directions
//! mirror-sync run
//!
//! # Sync one job with debug logging
//! mirror-sync --debug run --job docs
//! ```

use super::Context;
use crate::git::SystemRunner;
use crate::ssh::SshConfigTrust;
use crate::sync::{Orchestrator, SyncError};
use crate::ui::output;
use anyhow::Result;

/// Run every selected job in configuration order, stopping at the first
/// failure.
pub fn run(ctx: &Context, job: Option<&str>) -> Result<()> {
    let config = ctx.load_config()?;
    let log = ctx.init_logging(config.log_dir());
    if let Some(file) = log.file() {
        tracing::debug!(file = %file.display(), "logging to file");
    }

    let jobs = config.select_jobs(job)?;

    let mut orchestrator =
        Orchestrator::new(SystemRunner).with_identity(config.file.identity.clone());
    if config.trust_ssh_hosts() {
        let trust = SshConfigTrust::for_current_user().map_err(|e| SyncError::HostTrust {
            host: "*".to_string(),
            message: e.to_string(),
        })?;
        orchestrator = orchestrator.with_trust(Box::new(trust));
    }

    for job in jobs {
        let report = orchestrator.run_job(job)?;
        output::print(output::format_job_report(&report), ctx.verbosity());
    }

    tracing::info!("sync finished");
    Ok(())
}
