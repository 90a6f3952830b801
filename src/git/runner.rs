//! git::runner
//!
//! Blocking subprocess execution with captured output.
//!
//! Every git porcelain verb a pass needs runs through a [`CommandRunner`].
//! The trait is the seam between the sync engine and the operating system:
//! production code uses [`SystemRunner`], tests substitute
//! [`ScriptedRunner`](crate::git::mock::ScriptedRunner).
//!
//! There is no timeout. A hung remote blocks the pass until the caller's
//! own process-level timeout (if any) fires.

use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Errors from launching a command.
///
/// A command that runs and exits non-zero is *not* an error at this layer;
/// its exit code is reported in [`CommandOutput`].
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The program could not be started at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code. `-1` if the process was terminated by a signal.
    pub code: i32,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl CommandOutput {
    /// A successful, silent result.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A successful result with the given stdout.
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// A failed result with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with code zero.
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty.
    ///
    /// Git reports most push and merge failures on stderr, but `pull`
    /// prints conflict details on stdout.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs a program to completion and captures its output.
pub trait CommandRunner {
    /// Run `program` with `args` in `dir`, blocking until it exits.
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<CommandOutput, RunnerError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<CommandOutput, RunnerError> {
        (**self).run(dir, program, args)
    }
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<CommandOutput, RunnerError> {
        tracing::debug!(dir = %dir.display(), "executing: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|source| RunnerError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let result = CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.stdout.is_empty() {
            tracing::debug!(stdout = %result.stdout.trim_end());
        }
        if !result.stderr.is_empty() {
            tracing::debug!(stderr = %result.stderr.trim_end());
        }
        tracing::debug!(code = result.code, "{} exited", program);

        Ok(result)
    }
}
