//! Map use-case service.
//!
//! # Responsibility
//! - Apply entry changes to the marker store and trigger overlay resyncs.
//! - Restore and persist the viewport through the settings store.
//! - Forward scroll/zoom events to viewport listeners.
//!
//! # Invariants
//! - Store mutations succeed whether or not a map view is attached.
//! - `bulk_load` schedules exactly one resync regardless of input size.
//! - Not thread-safe; callers serialize access (`&mut self` on mutations).

use crate::config::MapConfig;
use crate::map::camera::{
    austria_bounding_box, post_zoom_to_bounding_box, post_zoom_to_position, HAGENBERG,
};
use crate::map::cluster::{ClusterBuilder, RadiusClusterBuilder};
use crate::map::marker::{Marker, MarkerChange, SharedMarkerStore};
use crate::map::scheduler::RenderScheduler;
use crate::map::sync::ViewSynchronizer;
use crate::map::viewport::{Viewport, ViewportListener, ViewportNotifier};
use crate::model::entry::{Entry, EntryId};
use crate::model::geo::{encode_geohash, BoundingBox, GeoPoint};
use crate::repo::entry_cache::EntryCache;
use crate::repo::settings_repo::{LastLocation, MapSettingsStore};
use crate::repo::CacheResult;
use log::{info, warn};
use std::sync::Arc;

/// Summary of `MapService::prepare`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareOutcome {
    /// Cached entries read (deleted ones included).
    pub loaded_entries: usize,
    pub markers: usize,
    pub restored_location: Option<LastLocation>,
}

pub struct MapService {
    config: MapConfig,
    store: SharedMarkerStore,
    synchronizer: ViewSynchronizer,
    notifier: ViewportNotifier,
    viewport: Option<Viewport>,
    rotation_gesture_enabled: bool,
}

impl MapService {
    /// Creates a service clustering with `RadiusClusterBuilder` from `config`.
    pub fn new(config: MapConfig) -> Self {
        let builder = RadiusClusterBuilder::new(
            config.cluster_radius_px,
            config.cluster_reference_zoom,
            config.cluster_icon.clone(),
        );
        Self::with_builder(config, Arc::new(builder))
    }

    pub fn with_builder(config: MapConfig, builder: Arc<dyn ClusterBuilder>) -> Self {
        Self {
            config,
            store: SharedMarkerStore::new(),
            synchronizer: ViewSynchronizer::new(builder),
            notifier: ViewportNotifier::new(),
            viewport: None,
            rotation_gesture_enabled: false,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Attaches the render queue of a freshly created map view.
    ///
    /// Posts the one-time surface setup: minimum zoom and a disabled rotation
    /// gesture.
    pub fn attach_view(&mut self, scheduler: Arc<dyn RenderScheduler>) {
        let min_zoom = self.config.min_zoom;
        let rotation_enabled = self.rotation_gesture_enabled;
        let posted = scheduler.post(Box::new(move |canvas| {
            let surface = canvas.surface_mut();
            surface.set_min_zoom(min_zoom);
            surface.set_rotation_gesture_enabled(rotation_enabled);
        }));
        if let Err(err) = posted {
            warn!("event=map_attach module=map status=error error={err}");
        }
        self.synchronizer.attach(scheduler);
        info!("event=map_attach module=map status=ok min_zoom={min_zoom}");
    }

    /// Detaches the map view. Later mutations only update the store.
    pub fn detach_view(&mut self) {
        if self.synchronizer.detach().is_some() {
            info!("event=map_detach module=map status=ok");
        }
    }

    pub fn has_view(&self) -> bool {
        self.synchronizer.scheduler().is_some()
    }

    /// Bulk-loads the entry cache and restores the last saved viewport.
    pub fn prepare(
        &mut self,
        cache: &dyn EntryCache,
        settings: &dyn MapSettingsStore,
    ) -> CacheResult<PrepareOutcome> {
        let loaded_entries = self.load_entries_from_cache(cache)?;

        let restored_location = settings.load_last_location()?;
        if let Some(location) = restored_location {
            self.zoom_to_position_with_zoom(
                location.center.latitude,
                location.center.longitude,
                location.zoom,
            );
        }

        let outcome = PrepareOutcome {
            loaded_entries,
            markers: self.marker_count(),
            restored_location,
        };
        info!(
            "event=map_prepare module=map status=ok loaded={} markers={} restored_location={}",
            outcome.loaded_entries,
            outcome.markers,
            outcome.restored_location.is_some()
        );
        Ok(outcome)
    }

    /// Reads every cached entry and bulk-loads it. Returns the entry count.
    pub fn load_entries_from_cache(&mut self, cache: &dyn EntryCache) -> CacheResult<usize> {
        let entries = cache.get_all_cached_entries()?;
        self.bulk_load(&entries);
        Ok(entries.len())
    }

    /// Applies `add_or_update` to each entry, then schedules one resync.
    pub fn bulk_load<'a>(&mut self, entries: impl IntoIterator<Item = &'a Entry>) {
        for entry in entries {
            self.add_or_update_entry(entry, false);
        }
        self.recluster();
    }

    /// Replaces the marker of `entry`; soft-deleted entries lose their marker.
    pub fn add_or_update_entry(&mut self, entry: &Entry, auto_refresh: bool) -> MarkerChange {
        let change = self.store.lock().add_or_update(entry);
        if auto_refresh {
            self.recluster();
        }
        change
    }

    /// Removes the marker of `entry`; resyncs only when one existed.
    pub fn remove_entry(&mut self, entry: &Entry) -> bool {
        self.remove_entry_id(entry.entry_id)
    }

    pub fn remove_entry_id(&mut self, entry_id: EntryId) -> bool {
        let removed = self.store.lock().remove(entry_id);
        if !removed {
            return false;
        }
        self.recluster();
        true
    }

    /// Empties the store without resyncing.
    pub fn clear_entries(&mut self) {
        self.store.lock().clear();
    }

    /// Schedules a rebuild of the cluster overlay. The job reads the store
    /// when it runs, so mutations made before that are included.
    ///
    /// Returns whether a render job was queued.
    pub fn recluster(&self) -> bool {
        self.synchronizer.resync(&self.store)
    }

    pub fn marker_count(&self) -> usize {
        self.store.lock().len()
    }

    pub fn contains_entry(&self, entry_id: EntryId) -> bool {
        self.store.lock().contains(entry_id)
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.store.snapshot()
    }

    /// Centers on a position with the configured default zoom.
    pub fn zoom_to_position(&self, latitude: f64, longitude: f64) -> bool {
        self.zoom_to_position_with_zoom(latitude, longitude, self.config.default_position_zoom)
    }

    /// Returns `false` when no map view is attached or its queue is closed.
    pub fn zoom_to_position_with_zoom(&self, latitude: f64, longitude: f64, zoom: u8) -> bool {
        let Some(scheduler) = self.synchronizer.scheduler() else {
            warn!("event=map_zoom module=map status=skip reason=map_view_missing");
            return false;
        };
        match post_zoom_to_position(
            scheduler.as_ref(),
            GeoPoint::new(latitude, longitude),
            zoom,
        ) {
            Ok(()) => true,
            Err(err) => {
                warn!("event=map_zoom module=map status=error error={err}");
                false
            }
        }
    }

    pub fn zoom_to_bounding_box(&self, bbox: BoundingBox) -> bool {
        let Some(scheduler) = self.synchronizer.scheduler() else {
            warn!("event=map_zoom_bbox module=map status=skip reason=map_view_missing");
            return false;
        };
        match post_zoom_to_bounding_box(
            scheduler.as_ref(),
            bbox,
            self.config.bounding_box_zoom_delay,
        ) {
            Ok(()) => true,
            Err(err) => {
                warn!("event=map_zoom_bbox module=map status=error error={err}");
                false
            }
        }
    }

    pub fn zoom_to_austria(&self) -> bool {
        self.zoom_to_bounding_box(austria_bounding_box())
    }

    pub fn zoom_to_hgb(&self) -> bool {
        self.zoom_to_position(HAGENBERG.latitude, HAGENBERG.longitude)
    }

    pub fn set_rotation_gesture_enabled(&mut self, enabled: bool) {
        self.rotation_gesture_enabled = enabled;
        let Some(scheduler) = self.synchronizer.scheduler() else {
            return;
        };
        if let Err(err) = scheduler.post(Box::new(move |canvas| {
            canvas.surface_mut().set_rotation_gesture_enabled(enabled);
        })) {
            warn!("event=map_rotation module=map status=error error={err}");
        }
    }

    pub fn rotation_gesture_enabled(&self) -> bool {
        self.rotation_gesture_enabled
    }

    pub fn add_viewport_listener(&mut self, listener: Arc<dyn ViewportListener>) {
        self.notifier.subscribe(listener);
    }

    pub fn on_scroll(&mut self, viewport: Viewport) {
        self.apply_viewport(viewport);
    }

    pub fn on_zoom(&mut self, viewport: Viewport) {
        self.apply_viewport(viewport);
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn current_zoom_level(&self) -> Option<u8> {
        self.viewport.map(|viewport| viewport.zoom)
    }

    pub fn map_center_geohash(&self, precision: usize) -> Option<String> {
        self.viewport
            .and_then(|viewport| encode_geohash(viewport.center, precision))
    }

    /// Persists the last reported viewport. Returns `false` when none is known.
    pub fn save_last_location(&self, settings: &dyn MapSettingsStore) -> CacheResult<bool> {
        let Some(viewport) = self.viewport else {
            return Ok(false);
        };
        settings.save_last_location(&LastLocation {
            center: viewport.center,
            zoom: viewport.zoom,
        })?;
        Ok(true)
    }

    fn apply_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.notifier
            .notify(&viewport, self.config.block_geohash_precision);
    }
}
