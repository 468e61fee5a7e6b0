//! Map tuning knobs.
//!
//! Defaults mirror the values the mobile client ships with; hosts may
//! override individual fields before constructing a `MapService`.

use std::time::Duration;

/// Below this zoom a 5-character geohash block no longer fits the viewport.
pub const ZOOMLEVEL_BLOCK5_THRESHOLD: u8 = 13;
/// Zoom used by `zoom_to_position` when the caller gives none.
pub const DEFAULT_POSITION_ZOOM: u8 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub min_zoom: u8,
    pub default_position_zoom: u8,
    /// Delay before a bounding-box fit is applied on the render thread.
    pub bounding_box_zoom_delay: Duration,
    /// Pixel radius inside which markers collapse into one cluster.
    pub cluster_radius_px: f64,
    /// Zoom level at which cluster distances are measured.
    pub cluster_reference_zoom: u8,
    /// Icon resource name handed to every cluster overlay.
    pub cluster_icon: String,
    /// Geohash precision for viewport block notifications.
    pub block_geohash_precision: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_zoom: ZOOMLEVEL_BLOCK5_THRESHOLD,
            default_position_zoom: DEFAULT_POSITION_ZOOM,
            bounding_box_zoom_delay: Duration::from_millis(100),
            cluster_radius_px: 100.0,
            cluster_reference_zoom: ZOOMLEVEL_BLOCK5_THRESHOLD,
            cluster_icon: "green_circle".to_string(),
            block_geohash_precision: 5,
        }
    }
}
