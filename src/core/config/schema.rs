//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! log_dir = "/var/log/mirror-sync"
//! trust_ssh_hosts = true
//!
//! [identity]
//! name = "Mirror Sync"
//! email = "mirror-sync@example.com"
//!
//! [[job]]
//! name = "docs"
//! origin = "git@github.com:team/docs.git"
//! mirror = "git@gitlab.com:team/docs.git"
//! workspace = "/var/lib/mirror-sync/docs"
//! direction = "bidirectional"
//! origin_accept = ["main$", "release/"]
//! mirror_accept = ["main$"]
//! ```
//!
//! # Validation
//!
//! Config values are validated after parsing: every accept rule must compile,
//! job names must be unique, and no two jobs may share a workspace.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::Direction;
use crate::sync::classify::AcceptRules;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Directory for timestamped log files. Logging to a file is skipped
    /// when neither this nor a platform data directory is available.
    pub log_dir: Option<PathBuf>,

    /// Whether each pass asks the SSH trust collaborator to trust the
    /// source host before talking to it.
    pub trust_ssh_hosts: Option<bool>,

    /// Committer identity written into every working repository.
    pub identity: Option<IdentityConfig>,

    /// Repository pairs, processed in file order.
    #[serde(rename = "job")]
    pub jobs: Vec<JobConfig>,
}

impl SyncConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs.is_empty() {
            return Err(ConfigError::InvalidValue(
                "at least one [[job]] must be configured".into(),
            ));
        }

        if let Some(identity) = &self.identity {
            identity.validate()?;
        }

        let mut names = HashSet::new();
        let mut workspaces = HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !names.insert(job.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate job name '{}'",
                    job.name
                )));
            }
            if !workspaces.insert(job.workspace.as_path()) {
                return Err(ConfigError::InvalidValue(format!(
                    "job '{}' shares workspace '{}' with another job",
                    job.name,
                    job.workspace.display()
                )));
            }
        }

        Ok(())
    }

    /// Find a job by name.
    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

/// Committer identity for merge commits made in the working repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    pub name: String,
    pub email: String,
}

impl IdentityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "identity name and email must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// One origin/mirror repository pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Unique job name, used by `--job` and in log output.
    pub name: String,

    /// Origin repository URL.
    pub origin: String,

    /// Mirror repository URL.
    pub mirror: String,

    /// Working repository path. Wiped and recreated on every pass.
    pub workspace: PathBuf,

    /// Which passes to run.
    #[serde(default)]
    pub direction: Direction,

    /// Accept rules for branches flowing origin → mirror.
    #[serde(default)]
    pub origin_accept: Vec<String>,

    /// Accept rules for branches flowing mirror → origin.
    #[serde(default)]
    pub mirror_accept: Vec<String>,
}

impl JobConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("job name must not be empty".into()));
        }
        if self.origin.trim().is_empty() || self.mirror.trim().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "job '{}' needs both origin and mirror urls",
                self.name
            )));
        }
        if self.workspace.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "job '{}' needs a workspace path",
                self.name
            )));
        }

        for rules in [&self.origin_accept, &self.mirror_accept] {
            AcceptRules::new(rules).map_err(|e| {
                ConfigError::InvalidValue(format!("job '{}': {}", self.name, e))
            })?;
        }

        Ok(())
    }
}
