//! Map marker/cluster coordination.
//!
//! # Responsibility
//! - Keep the marker store, cluster builder and render queue apart so each
//!   can be replaced or doubled in tests.
//!
//! # Invariants
//! - Only render jobs mutate the map surface.
//! - A cluster overlay is always built from one complete marker snapshot.

pub mod camera;
pub mod cluster;
pub mod marker;
pub mod scheduler;
pub mod surface;
pub mod sync;
pub mod viewport;
