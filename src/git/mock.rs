//! git::mock
//!
//! Scripted command runner for deterministic testing.
//!
//! # Design
//!
//! [`ScriptedRunner`] answers every command with a successful, silent
//! [`CommandOutput`] unless a response was registered for a matching argument
//! prefix. Every invocation is recorded so tests can assert on ordering
//! (for example, that no `push` follows a failed `pull`).
//!
//! # Example
//!
//! ```
//! use mirrorsync::git::mock::ScriptedRunner;
//! use mirrorsync::git::{CommandOutput, CommandRunner};
//! use std::path::Path;
//!
//! let runner = ScriptedRunner::new();
//! runner.respond(&["push"], CommandOutput::failed(1, "rejected"));
//!
//! let out = runner.run(Path::new("."), "git", &["push", "mirror", "main"]).unwrap();
//! assert!(!out.success());
//! assert_eq!(runner.calls(), vec!["git push mirror main".to_string()]);
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::runner::{CommandOutput, CommandRunner, RunnerError};

/// Recording runner with canned responses.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<ScriptedInner>>,
}

#[derive(Debug, Default)]
struct ScriptedInner {
    /// (argument prefix, response). Later entries take precedence.
    responses: Vec<(Vec<String>, CommandOutput)>,
    /// `program arg arg ...` for every call, in order.
    calls: Vec<String>,
}

impl ScriptedRunner {
    /// Create a runner that succeeds silently for everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any command whose arguments start with `prefix` with `output`.
    pub fn respond(&self, prefix: &[&str], output: CommandOutput) -> &Self {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .responses
            .push((prefix.iter().map(|s| s.to_string()).collect(), output));
        self
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.clone()
    }

    /// Recorded invocations whose arguments start with `verb`.
    pub fn calls_to(&self, verb: &str) -> Vec<String> {
        let needle = format!("git {}", verb);
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&needle))
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, _dir: &Path, program: &str, args: &[&str]) -> Result<CommandOutput, RunnerError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        inner.calls.push(line);

        let response = inner
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| {
                prefix.len() <= args.len() && prefix.iter().zip(args).all(|(p, a)| p == a)
            })
            .map(|(_, out)| out.clone())
            .unwrap_or_default();

        Ok(response)
    }
}
