//! core
//!
//! Core domain types, configuration and locking for mirror-sync.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, RefKind, Side, Direction
//! - [`config`] - Configuration schema and loading
//! - [`lock`] - Exclusive workspace lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and validated once at load time

pub mod config;
pub mod lock;
pub mod types;
