//! Core map logic for Froody.
//! This crate owns the marker/cluster state shown on the entry map.

pub mod config;
pub mod db;
pub mod logging;
pub mod map;
pub mod model;
pub mod repo;
pub mod service;

pub use config::MapConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use map::cluster::{Cluster, ClusterBuilder, ClusterOverlay, OverlayId, RadiusClusterBuilder};
pub use map::marker::{Marker, MarkerChange, MarkerStore, SharedMarkerStore};
pub use map::scheduler::{ManualScheduler, RenderJob, RenderScheduler, RenderThread, ScheduleError};
pub use map::surface::{MapCanvas, MapSurface};
pub use map::viewport::{Viewport, ViewportListener};
pub use model::entry::{Entry, EntryId, EntryValidationError};
pub use model::geo::{BoundingBox, GeoPoint};
pub use repo::entry_cache::{EntryCache, SqliteEntryCache};
pub use repo::settings_repo::{LastLocation, MapSettingsStore, SqliteMapSettings};
pub use repo::{CacheError, CacheResult};
pub use service::map_service::{MapService, PrepareOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
