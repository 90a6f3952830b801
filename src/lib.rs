//! mirrorsync - Keep an origin and a mirror git repository in sync
//!
//! Each configured job pairs two remotes. A run diffs their branch listings,
//! copies branches the destination lacks, merges branches both sides moved,
//! then copies tags with the source side winning. It does this origin →
//! mirror and then mirror → origin, each direction with its own accept
//! rules.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to sync)
//! - [`sync`] - Snapshot → Classify → Replicate branches → Replicate tags
//! - [`core`] - Domain types, configuration and the workspace lock
//! - [`git`] - The working repository and the command runner seam
//! - [`ssh`] - SSH host trust
//! - [`logging`] - Process-wide logging context
//! - [`ui`] - Terminal output
//!
//! # Guarantees
//!
//! 1. Refs are only ever added or advanced, never deleted
//! 2. A merge that needs a human is never pushed
//! 3. Tags are replicated only after every branch of the pass succeeded
//! 4. Every failure exits with the documented code for its site

pub mod cli;
pub mod core;
pub mod git;
pub mod logging;
pub mod ssh;
pub mod sync;
pub mod ui;
