//! Territory Core - Shared domain types.
//!
//! This crate provides the types shared by the territory manager components:
//! - `server` - JSON API consumed by the single-page frontend
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! database access, no HTTP. Territory geometry (polygon validation, bounding
//! boxes, map framing) lives here so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, geometry, territory and locale types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
