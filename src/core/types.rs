//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefKind`] - Which ref namespace a snapshot covers
//! - [`Side`] - Which end of a pass a remote plays
//! - [`Direction`] - Which passes a job runs
//!
//! # Examples
//!
//! ```
//! use mirrorsync::core::types::{Oid, RefKind};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(oid.short(8), "abc123de");
//! assert_eq!(RefKind::Tag.namespace(), "refs/tags/");
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git object identifier.
///
/// Accepts SHA-1 (40 hex characters) and SHA-256 (64 hex characters)
/// object ids. The id is normalized to lowercase so that snapshots taken
/// from different remotes compare equal for the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if `len` exceeds it.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ref namespace a snapshot is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    /// `refs/heads/*`
    Branch,
    /// `refs/tags/*`
    Tag,
}

impl RefKind {
    /// The full ref prefix for this kind, including the trailing slash.
    pub fn namespace(self) -> &'static str {
        match self {
            RefKind::Branch => "refs/heads/",
            RefKind::Tag => "refs/tags/",
        }
    }

    /// The `git ls-remote` flag that restricts output to this kind.
    pub fn ls_remote_flag(self) -> &'static str {
        match self {
            RefKind::Branch => "--heads",
            RefKind::Tag => "--tags",
        }
    }

    /// Fully qualify a leaf ref name, e.g. `main` → `refs/heads/main`.
    pub fn qualify(self, name: &str) -> String {
        format!("{}{}", self.namespace(), name)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            RefKind::Branch => "branch",
            RefKind::Tag => "tag",
        }
    }

    /// Plural label, e.g. for "listing branches".
    pub fn plural(self) -> &'static str {
        match self {
            RefKind::Branch => "branches",
            RefKind::Tag => "tags",
        }
    }
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which end of a directional pass a remote plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Destination,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// Which directional passes a job runs.
///
/// `Bidirectional` runs origin → mirror first and, only if that pass
/// succeeds, mirror → origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    Bidirectional,
    OriginToMirror,
    MirrorToOrigin,
}

impl Direction {
    /// Whether the origin → mirror pass runs.
    pub fn includes_origin_to_mirror(self) -> bool {
        matches!(self, Direction::Bidirectional | Direction::OriginToMirror)
    }

    /// Whether the mirror → origin pass runs.
    pub fn includes_mirror_to_origin(self) -> bool {
        matches!(self, Direction::Bidirectional | Direction::MirrorToOrigin)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Bidirectional => f.write_str("bidirectional"),
            Direction::OriginToMirror => f.write_str("origin-to-mirror"),
            Direction::MirrorToOrigin => f.write_str("mirror-to-origin"),
        }
    }
}
