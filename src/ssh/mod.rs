//! ssh
//!
//! SSH host trust for remotes reached over SSH.
//!
//! A pass run unattended cannot answer the host-key prompt the first time
//! it reaches a new SSH host. When enabled, the orchestrator extracts the
//! host from the source url with [`extract_host`] and hands it to a
//! [`HostTrust`] before touching any remote.
//!
//! [`SshConfigTrust`] is the shipped implementation: it makes sure
//! `~/.ssh/config` holds a block
//!
//! ```text
//! Host <host>
//!     StrictHostKeyChecking no
//! ```
//!
//! adding it, or replacing an existing block for the same host that lacks
//! the option. Other blocks are left untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Errors from the trust collaborator.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("cannot locate home directory")]
    NoHome,

    #[error("failed to update {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Guarantees that a host is trusted once `trust` returns `Ok`.
pub trait HostTrust {
    fn trust(&self, host: &str) -> Result<(), TrustError>;
}

/// Extract the SSH host from a remote url.
///
/// Understands scp-like urls (`git@github.com:team/repo.git`) and
/// `ssh://[user@]host[:port]/path`. Returns `None` for anything else,
/// including local paths and https urls.
///
/// # Example
///
/// ```
/// use mirrorsync::ssh::extract_host;
///
/// assert_eq!(extract_host("git@github.com:team/docs.git"), Some("github.com"));
/// assert_eq!(extract_host("ssh://git@gitlab.com:2222/team/docs.git"), Some("gitlab.com"));
/// assert_eq!(extract_host("https://github.com/team/docs.git"), None);
/// ```
pub fn extract_host(url: &str) -> Option<&str> {
    static SCP: OnceLock<Option<Regex>> = OnceLock::new();
    static SSH: OnceLock<Option<Regex>> = OnceLock::new();

    let scp = SCP.get_or_init(|| Regex::new(r"^[^@/:\s]+@([^:/\s]+):").ok());
    let ssh = SSH.get_or_init(|| Regex::new(r"^ssh://(?:[^@/\s]+@)?([^:/\s]+)(?::\d+)?/").ok());

    [scp, ssh]
        .into_iter()
        .flatten()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// [`HostTrust`] that edits an OpenSSH client config file.
#[derive(Debug, Clone)]
pub struct SshConfigTrust {
    path: PathBuf,
}

impl SshConfigTrust {
    /// Trust hosts through the config file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Trust hosts through `~/.ssh/config`.
    pub fn for_current_user() -> Result<Self, TrustError> {
        let home = dirs::home_dir().ok_or(TrustError::NoHome)?;
        Ok(Self::new(home.join(".ssh").join("config")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> TrustError {
        TrustError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl HostTrust for SshConfigTrust {
    fn trust(&self, host: &str) -> Result<(), TrustError> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
                restrict_permissions(dir, 0o700).map_err(|e| self.io_err(e))?;
            }
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(self.io_err(e)),
        };

        match with_trusted_host(&content, host) {
            Some(updated) => {
                fs::write(&self.path, updated).map_err(|e| self.io_err(e))?;
                restrict_permissions(&self.path, 0o600).map_err(|e| self.io_err(e))?;
                tracing::info!(host, path = %self.path.display(), "ssh host trusted");
            }
            None => tracing::debug!(host, "ssh host already trusted"),
        }
        Ok(())
    }
}

const HOST_OPTION: &str = "    StrictHostKeyChecking no\n";

/// `content` with a trusting block for `host`, or `None` if it already has one.
fn with_trusted_host(content: &str, host: &str) -> Option<String> {
    let block = format!("Host {}\n{}", host, HOST_OPTION);

    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let is_host_line = |line: &str| {
        let mut words = line.split_whitespace();
        matches!(words.next(), Some(k) if k.eq_ignore_ascii_case("host"))
    };
    let names_host = |line: &str| {
        let mut words = line.split_whitespace();
        words.next();
        words.next() == Some(host) && words.next().is_none()
    };

    let Some(start) = lines.iter().position(|l| is_host_line(l) && names_host(l)) else {
        let mut updated = content.to_string();
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(&block);
        return Some(updated);
    };

    let end = lines[start + 1..]
        .iter()
        .position(|l| is_host_line(l))
        .map_or(lines.len(), |offset| start + 1 + offset);

    let already_trusted = lines[start + 1..end].iter().any(|line| {
        let words: Vec<&str> = line.split_whitespace().collect();
        matches!(words.as_slice(), [k, v]
            if k.eq_ignore_ascii_case("StrictHostKeyChecking") && v.eq_ignore_ascii_case("no"))
    });
    if already_trusted {
        return None;
    }

    let mut updated: String = lines[..start].concat();
    updated.push_str(&block);
    let rest = lines[end..].concat();
    if !rest.is_empty() {
        updated.push('\n');
        updated.push_str(&rest);
    }
    Some(updated)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod extract {
        use super::*;

        #[test]
        fn scp_like() {
            assert_eq!(extract_host("git@github.com:a/b.git"), Some("github.com"));
            assert_eq!(extract_host("deploy@10.0.0.5:repo.git"), Some("10.0.0.5"));
        }

        #[test]
        fn ssh_scheme() {
            assert_eq!(extract_host("ssh://git@host.example/a/b.git"), Some("host.example"));
            assert_eq!(extract_host("ssh://host.example:22/a.git"), Some("host.example"));
        }

        #[test]
        fn non_ssh_urls() {
            assert_eq!(extract_host("https://github.com/a/b.git"), None);
            assert_eq!(extract_host("/srv/git/repo.git"), None);
            assert_eq!(extract_host("file:///srv/git/repo.git"), None);
            assert_eq!(extract_host(""), None);
        }
    }

    mod config_block {
        use super::*;

        #[test]
        fn appends_to_empty() {
            let out = with_trusted_host("", "github.com").unwrap();
            assert_eq!(out, "Host github.com\n    StrictHostKeyChecking no\n");
        }

        #[test]
        fn appends_after_unterminated_content() {
            let out = with_trusted_host("Host other\n    User me", "github.com").unwrap();
            assert_eq!(
                out,
                "Host other\n    User me\nHost github.com\n    StrictHostKeyChecking no\n"
            );
        }

        #[test]
        fn existing_trusted_block_unchanged() {
            let content = "Host github.com\n    StrictHostKeyChecking no\n";
            assert_eq!(with_trusted_host(content, "github.com"), None);
        }

        #[test]
        fn replaces_untrusted_block_and_keeps_others() {
            let content = "Host github.com\n    User git\n\nHost gitlab.com\n    User me\n";
            let out = with_trusted_host(content, "github.com").unwrap();
            assert_eq!(
                out,
                "Host github.com\n    StrictHostKeyChecking no\n\nHost gitlab.com\n    User me\n"
            );
        }

        #[test]
        fn similar_host_names_not_confused() {
            let content = "Host github.com.internal\n    StrictHostKeyChecking no\n";
            let out = with_trusted_host(content, "github.com").unwrap();
            assert!(out.ends_with("Host github.com\n    StrictHostKeyChecking no\n"));
            assert!(out.starts_with(content));
        }
    }

    #[test]
    fn trust_creates_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ssh").join("config");
        let trust = SshConfigTrust::new(&path);

        trust.trust("github.com").unwrap();
        trust.trust("github.com").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Host github.com").count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn config_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        SshConfigTrust::new(&path).trust("example.com").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
