//! Cluster overlay construction.
//!
//! # Responsibility
//! - Build a complete, immutable cluster overlay from a marker snapshot.
//!
//! # Invariants
//! - Builders never read or mutate a previous overlay.
//! - For the same marker set the cluster layout is identical; only the
//!   overlay id differs between builds.

use crate::map::marker::Marker;
use crate::model::geo::GeoPoint;
use std::f64::consts::PI;
use uuid::Uuid;

const TILE_SIZE_PX: f64 = 256.0;
/// Web Mercator latitude limit.
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// Identity of one overlay installed on the map surface.
pub type OverlayId = Uuid;

/// Group of nearby markers drawn as one icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Centroid of the member positions.
    pub position: GeoPoint,
    pub markers: Vec<Marker>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// A single-member cluster is drawn as its marker.
    pub fn is_single(&self) -> bool {
        self.markers.len() == 1
    }
}

/// Immutable overlay built from one marker snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOverlay {
    pub id: OverlayId,
    pub icon: String,
    pub clusters: Vec<Cluster>,
}

impl ClusterOverlay {
    pub fn marker_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }
}

/// Produces a fresh overlay for a marker snapshot.
pub trait ClusterBuilder: Send + Sync {
    fn build(&self, markers: &[Marker]) -> ClusterOverlay;
}

/// Greedy radius clusterer.
///
/// Markers are visited in entry id order; every marker not yet assigned seeds
/// a cluster and absorbs all unassigned markers within `radius_px`, measured
/// in Web Mercator pixels at `reference_zoom`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusClusterBuilder {
    radius_px: f64,
    reference_zoom: u8,
    icon: String,
}

impl RadiusClusterBuilder {
    pub fn new(radius_px: f64, reference_zoom: u8, icon: impl Into<String>) -> Self {
        Self {
            radius_px: radius_px.max(0.0),
            reference_zoom,
            icon: icon.into(),
        }
    }
}

impl ClusterBuilder for RadiusClusterBuilder {
    fn build(&self, markers: &[Marker]) -> ClusterOverlay {
        let mut ordered = markers.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|marker| marker.entry_id);

        let projected = ordered
            .iter()
            .map(|marker| project_to_pixels(marker.position, self.reference_zoom))
            .collect::<Vec<_>>();
        let radius_sq = self.radius_px * self.radius_px;
        let mut assigned = vec![false; ordered.len()];
        let mut clusters = Vec::new();

        for seed in 0..ordered.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;
            let mut members = vec![ordered[seed].clone()];

            for candidate in (seed + 1)..ordered.len() {
                if assigned[candidate] {
                    continue;
                }
                let dx = projected[candidate].0 - projected[seed].0;
                let dy = projected[candidate].1 - projected[seed].1;
                if dx * dx + dy * dy <= radius_sq {
                    assigned[candidate] = true;
                    members.push(ordered[candidate].clone());
                }
            }

            clusters.push(Cluster {
                position: centroid(&members),
                markers: members,
            });
        }

        ClusterOverlay {
            id: Uuid::new_v4(),
            icon: self.icon.clone(),
            clusters,
        }
    }
}

/// Projects a WGS84 point to Web Mercator pixel coordinates at `zoom`.
pub fn project_to_pixels(point: GeoPoint, zoom: u8) -> (f64, f64) {
    let world_size = TILE_SIZE_PX * 2_f64.powi(i32::from(zoom));
    let latitude = point
        .latitude
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let x = (point.longitude + 180.0) / 360.0 * world_size;
    let sin_lat = (latitude * PI / 180.0).sin();
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * world_size;
    (x, y)
}

fn centroid(markers: &[Marker]) -> GeoPoint {
    let count = markers.len().max(1) as f64;
    let (lat_sum, lon_sum) = markers.iter().fold((0.0, 0.0), |(lat, lon), marker| {
        (lat + marker.position.latitude, lon + marker.position.longitude)
    });
    GeoPoint::new(lat_sum / count, lon_sum / count)
}

#[cfg(test)]
mod tests {
    use super::{project_to_pixels, ClusterBuilder, RadiusClusterBuilder};
    use crate::map::marker::Marker;
    use crate::model::entry::Entry;
    use crate::model::geo::GeoPoint;

    fn marker(id: i64, latitude: f64, longitude: f64) -> Marker {
        Marker::from_entry(&Entry::new(id, latitude, longitude))
    }

    #[test]
    fn projection_maps_origin_to_world_center() {
        let (x, y) = project_to_pixels(GeoPoint::new(0.0, 0.0), 1);
        assert!((x - 256.0).abs() < 1e-9);
        assert!((y - 256.0).abs() < 1e-9);
    }

    #[test]
    fn nearby_markers_share_one_cluster() {
        let builder = RadiusClusterBuilder::new(100.0, 13, "green_circle");
        let overlay = builder.build(&[
            marker(1, 48.0, 14.0),
            marker(2, 48.0, 14.01),
            marker(3, 47.0, 9.0),
        ]);

        assert_eq!(overlay.icon, "green_circle");
        assert_eq!(overlay.clusters.len(), 2);
        assert_eq!(overlay.clusters[0].len(), 2);
        assert!(overlay.clusters[1].is_single());
        assert_eq!(overlay.marker_count(), 3);
        assert!((overlay.clusters[0].position.longitude - 14.005).abs() < 1e-9);
    }

    #[test]
    fn layout_is_independent_of_input_order() {
        let builder = RadiusClusterBuilder::new(100.0, 13, "green_circle");
        let forward = builder.build(&[marker(1, 48.0, 14.0), marker(2, 48.0, 14.05)]);
        let backward = builder.build(&[marker(2, 48.0, 14.05), marker(1, 48.0, 14.0)]);

        assert_eq!(forward.clusters, backward.clusters);
        assert_ne!(forward.id, backward.id);
    }

    #[test]
    fn empty_snapshot_builds_empty_overlay() {
        let builder = RadiusClusterBuilder::new(100.0, 13, "green_circle");
        let overlay = builder.build(&[]);
        assert!(overlay.clusters.is_empty());
        assert_eq!(overlay.marker_count(), 0);
    }
}
