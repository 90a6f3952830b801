//! ui::output
//!
//! Terminal output for command results.
//!
//! # Design
//!
//! Results go to stdout and respect `--quiet`; diagnostics go through
//! `tracing` instead. `--json` output bypasses this module entirely.

use std::fmt::Display;

use crate::sync::classify::ChangeSet;
use crate::sync::orchestrator::{JobPlan, JobReport};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per added/updated ref, `+` for added and `~` for updated.
pub fn format_changes(changes: &ChangeSet, indent: &str) -> String {
    let mut lines = Vec::new();
    for r in &changes.updated {
        lines.push(format!(
            "{}~ {} ({} -> {})",
            indent,
            r.name,
            r.destination.short(8),
            r.source.short(8)
        ));
    }
    for r in &changes.added {
        lines.push(format!("{}+ {} ({})", indent, r.name, r.source.short(8)));
    }
    lines.join("\n")
}

/// Summary of a finished job.
pub fn format_job_report(report: &JobReport) -> String {
    let mut out = format!("{}:", report.job);
    for pass in &report.passes {
        out.push_str(&format!(
            "\n  {}: {} merged, {} added, {} up to date",
            pass.direction,
            pass.merged.len(),
            pass.copied.len(),
            pass.changes.unchanged.len()
        ));
    }
    out
}

/// What a job would change.
pub fn format_job_plan(plan: &JobPlan) -> String {
    let mut out = format!("{}:", plan.job);
    for pass in &plan.passes {
        out.push_str(&format!("\n  {}", pass.direction));
        if pass.branches.is_empty() && pass.tags.is_empty() {
            out.push_str(": nothing to do");
            continue;
        }
        if !pass.branches.is_empty() {
            out.push_str("\n    branches:\n");
            out.push_str(&format_changes(&pass.branches, "      "));
        }
        if !pass.tags.is_empty() {
            out.push_str("\n    tags:\n");
            out.push_str(&format_changes(&pass.tags, "      "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Oid;
    use crate::sync::classify::{AddedRef, UpdatedRef};
    use crate::sync::orchestrator::{PassDirection, PassPlan, PassReport};

    fn oid(c: char) -> Oid {
        Oid::new(c.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn format_list_prefixes_items() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
    }

    #[test]
    fn changes_list_updated_then_added() {
        let changes = ChangeSet {
            added: vec![AddedRef {
                name: "feature".into(),
                source: oid('c'),
            }],
            updated: vec![UpdatedRef {
                name: "main".into(),
                source: oid('a'),
                destination: oid('b'),
            }],
            ..ChangeSet::default()
        };
        assert_eq!(
            format_changes(&changes, ""),
            "~ main (bbbbbbbb -> aaaaaaaa)\n+ feature (cccccccc)"
        );
    }

    #[test]
    fn job_report_summarizes_passes() {
        let report = JobReport {
            job: "docs".into(),
            passes: vec![PassReport {
                direction: PassDirection::OriginToMirror,
                changes: ChangeSet::default(),
                merged: vec!["main".into()],
                copied: Vec::new(),
            }],
        };
        assert_eq!(
            format_job_report(&report),
            "docs:\n  origin -> mirror: 1 merged, 0 added, 0 up to date"
        );
    }

    #[test]
    fn empty_plan_says_nothing_to_do() {
        let plan = JobPlan {
            job: "docs".into(),
            passes: vec![PassPlan {
                direction: PassDirection::MirrorToOrigin,
                branches: ChangeSet::default(),
                tags: ChangeSet::default(),
            }],
        };
        assert_eq!(format_job_plan(&plan), "docs:\n  mirror -> origin: nothing to do");
    }
}
