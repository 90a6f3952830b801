//! sync::classify
//!
//! Change Classifier: which source refs the destination is missing or
//! behind on.
//!
//! # Algorithm
//!
//! For every ref in the source snapshot, in listing order:
//! 1. Skip it unless some accept rule matches its name.
//! 2. Absent from the destination → `added`.
//! 3. Present with the same commit → unchanged.
//! 4. Present with a different commit → `updated`.
//!
//! Refs only the destination has are never classified: a pass only adds or
//! advances refs, it never deletes them.
//!
//! [`classify`] is a pure function; callers log the result.
//!
//! # Example
//!
//! ```
//! use mirrorsync::core::types::Oid;
//! use mirrorsync::sync::classify::{classify, AcceptRules};
//! use mirrorsync::sync::snapshot::RefSnapshot;
//!
//! let a = Oid::new("a".repeat(40)).unwrap();
//! let b = Oid::new("b".repeat(40)).unwrap();
//!
//! let mut source = RefSnapshot::new();
//! source.insert("main", a.clone());
//! source.insert("feature", b);
//! let mut destination = RefSnapshot::new();
//! destination.insert("main", a);
//!
//! let rules = AcceptRules::new(&["main$", "feature$"]).unwrap();
//! let changes = classify(&source, &destination, &rules);
//! assert_eq!(changes.added_names(), vec!["feature"]);
//! assert!(changes.updated.is_empty());
//! ```

use regex::Regex;
use serde::Serialize;

use super::snapshot::RefSnapshot;
use crate::core::types::Oid;

/// Ordered accept rules.
///
/// Each pattern is a regular expression anchored at the start of the ref
/// name (but not the end): `release/` accepts `release/1.0`, `main$` accepts
/// only `main`. A name is accepted if any rule matches; the first match wins.
#[derive(Debug, Clone)]
pub struct AcceptRules {
    rules: Vec<Regex>,
}

impl AcceptRules {
    /// Compile `patterns` in order.
    ///
    /// # Errors
    ///
    /// Returns the regex error for the first pattern that does not compile.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            rules.push(Regex::new(&format!("^(?:{})", pattern.as_ref()))?);
        }
        Ok(Self { rules })
    }

    /// Rules that accept every ref name.
    pub fn accept_all() -> Self {
        // An empty pattern always compiles.
        Self::new(&[""]).unwrap_or_else(|_| Self { rules: Vec::new() })
    }

    /// Index of the first rule matching `name`.
    pub fn first_match(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.is_match(name))
    }

    /// Whether any rule matches `name`.
    pub fn accepts(&self, name: &str) -> bool {
        self.first_match(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// How a ref differs between source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in the source, absent in the destination.
    Added,
    /// Present in both, at different commits.
    Updated,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => f.write_str("added"),
            ChangeKind::Updated => f.write_str("updated"),
        }
    }
}

/// A ref the destination does not have yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedRef {
    pub name: String,
    pub source: Oid,
}

/// A ref both sides have, at different commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedRef {
    pub name: String,
    pub source: Oid,
    pub destination: Oid,
}

/// The outcome of classifying one pass.
///
/// `added` and `updated` are disjoint and ordered by source listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<AddedRef>,
    pub updated: Vec<UpdatedRef>,
    /// Accepted refs already at the same commit on both sides.
    pub unchanged: Vec<String>,
    /// Source refs no rule accepted.
    pub skipped: Vec<String>,
}

impl ChangeSet {
    /// Whether the pass has nothing to replay.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }

    pub fn added_names(&self) -> Vec<&str> {
        self.added.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn updated_names(&self) -> Vec<&str> {
        self.updated.iter().map(|r| r.name.as_str()).collect()
    }

    /// Move `name` to `skipped` whatever bucket it landed in.
    ///
    /// Returns whether `name` had been accepted.
    pub fn exclude(&mut self, name: &str) -> bool {
        let before = self.added.len() + self.updated.len() + self.unchanged.len();
        self.added.retain(|r| r.name != name);
        self.updated.retain(|r| r.name != name);
        self.unchanged.retain(|n| n != name);
        let after = self.added.len() + self.updated.len() + self.unchanged.len();

        if before != after && !self.skipped.iter().any(|n| n == name) {
            self.skipped.push(name.to_string());
        }
        before != after
    }
}

/// Classify every accepted source ref against the destination.
pub fn classify(
    source: &RefSnapshot,
    destination: &RefSnapshot,
    rules: &AcceptRules,
) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (name, source_oid) in source.iter() {
        if !rules.accepts(name) {
            changes.skipped.push(name.to_string());
            continue;
        }

        match destination.get(name) {
            None => changes.added.push(AddedRef {
                name: name.to_string(),
                source: source_oid.clone(),
            }),
            Some(destination_oid) if destination_oid == source_oid => {
                changes.unchanged.push(name.to_string())
            }
            Some(destination_oid) => changes.updated.push(UpdatedRef {
                name: name.to_string(),
                source: source_oid.clone(),
                destination: destination_oid.clone(),
            }),
        }
    }

    changes
}
