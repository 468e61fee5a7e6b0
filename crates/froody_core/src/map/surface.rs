//! Map rendering surface contract and the render-thread canvas.
//!
//! # Responsibility
//! - Describe the subset of the map library the core drives.
//! - Track which cluster overlay is currently installed.
//!
//! # Invariants
//! - `MapCanvas` is only touched from render jobs, i.e. on the render thread.
//! - At most one cluster overlay is active; a swap removes the old one before
//!   the new one is added.

use crate::map::cluster::{ClusterOverlay, OverlayId};
use crate::model::geo::{BoundingBox, GeoPoint};
use std::sync::Arc;

/// Map library operations required by the core.
pub trait MapSurface: Send {
    fn add_overlay(&mut self, overlay: Arc<ClusterOverlay>);
    /// Returns whether an overlay with `id` was installed.
    fn remove_overlay(&mut self, id: OverlayId) -> bool;
    /// Requests a redraw.
    fn invalidate(&mut self);
    fn set_center(&mut self, center: GeoPoint);
    fn set_zoom(&mut self, zoom: u8);
    fn set_min_zoom(&mut self, zoom: u8);
    fn zoom_to_bounding_box(&mut self, bbox: &BoundingBox, animated: bool);
    fn set_rotation_gesture_enabled(&mut self, enabled: bool);
}

/// Render-thread state: the surface plus the active cluster overlay.
pub struct MapCanvas {
    surface: Box<dyn MapSurface>,
    active_cluster: Option<Arc<ClusterOverlay>>,
}

impl MapCanvas {
    pub fn new(surface: Box<dyn MapSurface>) -> Self {
        Self {
            surface,
            active_cluster: None,
        }
    }

    pub fn surface_mut(&mut self) -> &mut dyn MapSurface {
        self.surface.as_mut()
    }

    pub fn active_cluster(&self) -> Option<&Arc<ClusterOverlay>> {
        self.active_cluster.as_ref()
    }

    /// Replaces the active cluster overlay.
    ///
    /// Call order on the surface: remove -> invalidate -> add -> invalidate.
    /// The remove step is skipped when no overlay was active yet.
    pub fn swap_cluster_overlay(&mut self, overlay: Arc<ClusterOverlay>) {
        if let Some(previous) = self.active_cluster.take() {
            self.surface.remove_overlay(previous.id);
        }
        self.surface.invalidate();
        self.surface.add_overlay(Arc::clone(&overlay));
        self.active_cluster = Some(overlay);
        self.surface.invalidate();
    }
}

/// Surface that records every call, for tests and headless hosts.
pub mod recording {
    use super::MapSurface;
    use crate::map::cluster::{ClusterOverlay, OverlayId};
    use crate::model::geo::{BoundingBox, GeoPoint};
    use std::sync::{Arc, Mutex, PoisonError};

    /// One recorded surface call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum SurfaceCall {
        AddOverlay(OverlayId),
        RemoveOverlay(OverlayId),
        Invalidate,
        SetCenter(GeoPoint),
        SetZoom(u8),
        SetMinZoom(u8),
        ZoomToBoundingBox { bbox: BoundingBox, animated: bool },
        SetRotationGestureEnabled(bool),
    }

    /// Shared view of what a `RecordingSurface` has seen.
    #[derive(Debug, Clone, Default)]
    pub struct SurfaceLog {
        calls: Arc<Mutex<Vec<SurfaceCall>>>,
        overlays: Arc<Mutex<Vec<Arc<ClusterOverlay>>>>,
    }

    impl SurfaceLog {
        pub fn calls(&self) -> Vec<SurfaceCall> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Overlays currently installed on the surface.
        pub fn installed_overlays(&self) -> Vec<Arc<ClusterOverlay>> {
            self.overlays
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub fn clear_calls(&self) {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }

        fn push(&self, call: SurfaceCall) {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(call);
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        log: SurfaceLog,
    }

    impl RecordingSurface {
        pub fn new() -> (Self, SurfaceLog) {
            let log = SurfaceLog::default();
            (Self { log: log.clone() }, log)
        }
    }

    impl MapSurface for RecordingSurface {
        fn add_overlay(&mut self, overlay: Arc<ClusterOverlay>) {
            self.log.push(SurfaceCall::AddOverlay(overlay.id));
            self.log
                .overlays
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(overlay);
        }

        fn remove_overlay(&mut self, id: OverlayId) -> bool {
            self.log.push(SurfaceCall::RemoveOverlay(id));
            let mut overlays = self
                .log
                .overlays
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let before = overlays.len();
            overlays.retain(|overlay| overlay.id != id);
            overlays.len() != before
        }

        fn invalidate(&mut self) {
            self.log.push(SurfaceCall::Invalidate);
        }

        fn set_center(&mut self, center: GeoPoint) {
            self.log.push(SurfaceCall::SetCenter(center));
        }

        fn set_zoom(&mut self, zoom: u8) {
            self.log.push(SurfaceCall::SetZoom(zoom));
        }

        fn set_min_zoom(&mut self, zoom: u8) {
            self.log.push(SurfaceCall::SetMinZoom(zoom));
        }

        fn zoom_to_bounding_box(&mut self, bbox: &BoundingBox, animated: bool) {
            self.log.push(SurfaceCall::ZoomToBoundingBox {
                bbox: *bbox,
                animated,
            });
        }

        fn set_rotation_gesture_enabled(&mut self, enabled: bool) {
            self.log.push(SurfaceCall::SetRotationGestureEnabled(enabled));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::{RecordingSurface, SurfaceCall};
    use super::MapCanvas;
    use crate::map::cluster::{ClusterBuilder, RadiusClusterBuilder};
    use std::sync::Arc;

    #[test]
    fn swap_removes_previous_overlay_between_redraws() {
        let (surface, log) = RecordingSurface::new();
        let mut canvas = MapCanvas::new(Box::new(surface));
        let builder = RadiusClusterBuilder::new(100.0, 13, "green_circle");

        let first = Arc::new(builder.build(&[]));
        let second = Arc::new(builder.build(&[]));
        canvas.swap_cluster_overlay(Arc::clone(&first));
        log.clear_calls();
        canvas.swap_cluster_overlay(Arc::clone(&second));

        assert_eq!(
            log.calls(),
            vec![
                SurfaceCall::RemoveOverlay(first.id),
                SurfaceCall::Invalidate,
                SurfaceCall::AddOverlay(second.id),
                SurfaceCall::Invalidate,
            ]
        );
        let installed = log.installed_overlays();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].id, second.id);
        assert_eq!(canvas.active_cluster().map(|overlay| overlay.id), Some(second.id));
    }
}
