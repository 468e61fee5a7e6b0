//! Use-case service layer.
//!
//! # Responsibility
//! - Expose map orchestration APIs to FFI/CLI callers.
//! - Keep storage and render-queue details behind repository/map contracts.

pub mod map_service;
