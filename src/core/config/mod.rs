//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first hit wins:
//! 1. The `--config <path>` flag
//! 2. `$MIRROR_SYNC_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/mirror-sync/config.toml`
//! 4. `~/.mirror-sync/config.toml`
//!
//! Unlike optional user preferences, a sync run cannot proceed without a
//! job list, so a missing file is an error.
//!
//! # Example
//!
//! ```no_run
//! use mirrorsync::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! for job in &config.file.jobs {
//!     println!("{}: {} <-> {}", job.name, job.origin, job.mirror);
//! }
//! println!("logs go to {:?}", config.log_dir());
//! ```

pub mod schema;

pub use schema::{IdentityConfig, JobConfig, SyncConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MIRROR_SYNC_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no config file found (searched: {})", format_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A loaded and validated configuration file.
#[derive(Debug, Clone)]
pub struct Config {
    /// The parsed file contents.
    pub file: SyncConfig,
    /// Where the file was loaded from.
    pub path: PathBuf,
}

impl Config {
    /// Load configuration, honoring an explicit path first.
    ///
    /// # Errors
    ///
    /// Returns an error if no file is found, or the file cannot be read,
    /// parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::resolve_path(explicit)?;
        Self::load_from(&path)
    }

    /// Load and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: SyncConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        file.validate()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Find the config file to use.
    ///
    /// An explicit path is returned as-is even if it does not exist, so the
    /// read error names the path the user asked for.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let candidates = Self::candidate_paths();
        candidates
            .iter()
            .find(|p| p.exists())
            .cloned()
            .ok_or(ConfigError::NotFound {
                searched: candidates,
            })
    }

    /// The implicit search path, in precedence order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("mirror-sync/config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mirror-sync/config.toml"));
        }

        paths
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Directory for log files.
    ///
    /// Defaults to `<local data dir>/mirror-sync/logs`.
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.file
            .log_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join("mirror-sync/logs")))
    }

    /// Whether passes run the SSH trust collaborator. Defaults to `false`.
    pub fn trust_ssh_hosts(&self) -> bool {
        self.file.trust_ssh_hosts.unwrap_or(false)
    }

    /// Jobs selected by an optional `--job` filter.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the named job does not exist.
    pub fn select_jobs(&self, name: Option<&str>) -> Result<Vec<&JobConfig>, ConfigError> {
        match name {
            None => Ok(self.file.jobs.iter().collect()),
            Some(name) => self
                .file
                .job(name)
                .map(|job| vec![job])
                .ok_or_else(|| ConfigError::InvalidValue(format!("no job named '{}'", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
        [[job]]
        name = "docs"
        origin = "git@github.com:team/docs.git"
        mirror = "git@gitlab.com:team/docs.git"
        workspace = "/tmp/mirror-sync-test/docs"
        origin_accept = ["main$"]
    "#;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_from_valid_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, MINIMAL);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.path, path);
        assert_eq!(config.file.jobs[0].name, "docs");
        assert!(!config.trust_ssh_hosts());
    }

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, MINIMAL);

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.path, path);
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let err = Config::load(Some(Path::new("/nonexistent/mirror-sync.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[[job]\n");

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn validation_runs_on_load() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "log_dir = \"/tmp\"\n");

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn explicit_log_dir_used() {
        let dir = TempDir::new().unwrap();
        let contents = format!("log_dir = \"/var/log/ms\"\n{}", MINIMAL);
        let path = write_config(&dir, &contents);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_dir(), Some(PathBuf::from("/var/log/ms")));
    }

    #[test]
    fn select_jobs_filters_by_name() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, MINIMAL);
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.select_jobs(None).unwrap().len(), 1);
        assert_eq!(config.select_jobs(Some("docs")).unwrap()[0].name, "docs");
        assert!(config.select_jobs(Some("other")).is_err());
    }

    #[test]
    fn not_found_lists_searched_paths() {
        let err = ConfigError::NotFound {
            searched: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        };
        assert!(err.to_string().contains("/a, /b"));
    }
}
