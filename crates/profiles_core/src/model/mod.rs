//! Profile domain model.
//!
//! # Responsibility
//! - Define the stored profile record and the criteria shapes used by
//!   list/update/delete.
//!
//! # Invariants
//! - Every profile is addressed by an opaque, immutable `ProfileId`.
//! - Deletion is physical; there are no tombstones.

pub mod profile;
