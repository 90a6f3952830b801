//! cli
//!
//! Command-line interface for mirror-sync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Map the outcome to a process exit code
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers that drive [`crate::sync`]. Failures keep their library error
//! type inside `anyhow::Error` so [`exit_code`] can report the documented
//! code for each failure site.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};
pub use commands::Context;

use crate::core::config::ConfigError;
use crate::sync::{FailureSite, SyncError};
use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        config: cli.config.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

/// The process exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<SyncError>() {
        err.code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        FailureSite::Config.code()
    } else {
        FailureSite::Unexpected.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Side;

    #[test]
    fn exit_code_follows_failure_site() {
        let err = anyhow::Error::new(SyncError::RemoteBind {
            side: Side::Destination,
            url: "git@example.com:x.git".into(),
            message: "exists".into(),
        });
        assert_eq!(exit_code(&err), -6);
    }

    #[test]
    fn config_errors_have_their_own_code() {
        let err = anyhow::Error::new(ConfigError::InvalidValue("bad".into()));
        assert_eq!(exit_code(&err), -18);
    }

    #[test]
    fn anything_else_is_unexpected() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), -1);
    }
}
