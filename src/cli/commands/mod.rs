//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the configuration it needs
//! 2. Calls into [`crate::sync`] to do the work
//! 3. Formats and displays output
//!
//! Errors are returned as `anyhow::Error` wrapping the library error, so
//! `main` can still recover the failure site and its exit code.

mod completion;
mod config_cmd;
mod plan;
mod run;

pub use completion::completion;
pub use plan::plan;
pub use run::run;

use std::path::PathBuf;

use anyhow::Result;

use super::args::{Command, ConfigAction};
use crate::core::config::{Config, ConfigError};
use crate::logging::{self, LogHandle, LogSettings};
use crate::ui::output::Verbosity;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit `--config` path.
    pub config: Option<PathBuf>,
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    pub fn load_config(&self) -> Result<Config, ConfigError> {
        Config::load(self.config.as_deref())
    }

    /// Install the logging context, writing a log file under `dir` if given.
    pub fn init_logging(&self, dir: Option<PathBuf>) -> &'static LogHandle {
        logging::init(&LogSettings {
            dir,
            debug: self.debug,
            quiet: self.quiet,
        })
    }
}

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Run { job } => run(ctx, job.as_deref()),
        Command::Plan { job, json } => plan(ctx, job.as_deref(), json),
        Command::Config { action } => {
            ctx.init_logging(None);
            match action {
                ConfigAction::Path => config_cmd::path(ctx),
                ConfigAction::Check => config_cmd::check(ctx),
            }
        }
        Command::Completion { shell } => completion(shell),
    }
}
