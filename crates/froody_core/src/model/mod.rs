//! Domain model for map-rendered entries.
//!
//! # Responsibility
//! - Define canonical data structures read by the map core.
//! - Keep geographic helpers next to the records that use them.
//!
//! # Invariants
//! - Every entry is identified by a stable backend `EntryId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod entry;
pub mod geo;
