use froody_core::map::surface::recording::{RecordingSurface, SurfaceCall, SurfaceLog};
use froody_core::{
    ClusterBuilder, ClusterOverlay, Entry, ManualScheduler, MapCanvas, MapConfig, MapService,
    Marker, RadiusClusterBuilder, RenderScheduler, RenderThread,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CountingBuilder {
    inner: RadiusClusterBuilder,
    builds: AtomicUsize,
}

impl ClusterBuilder for CountingBuilder {
    fn build(&self, markers: &[Marker]) -> ClusterOverlay {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.inner.build(markers)
    }
}

struct Harness {
    service: MapService,
    scheduler: Arc<ManualScheduler>,
    builder: Arc<CountingBuilder>,
    log: SurfaceLog,
}

impl Harness {
    fn builds(&self) -> usize {
        self.builder.builds.load(Ordering::SeqCst)
    }
}

fn attached_service() -> Harness {
    let builder = Arc::new(CountingBuilder {
        inner: RadiusClusterBuilder::new(100.0, 13, "green_circle"),
        builds: AtomicUsize::new(0),
    });
    let (surface, log) = RecordingSurface::new();
    let scheduler = Arc::new(ManualScheduler::new(MapCanvas::new(Box::new(surface))));
    let mut service = MapService::with_builder(MapConfig::default(), builder.clone());
    service.attach_view(scheduler.clone() as Arc<dyn RenderScheduler>);

    // Drain the attach setup job so tests only see their own work.
    scheduler.run_pending();
    log.clear_calls();

    Harness {
        service,
        scheduler,
        builder,
        log,
    }
}

fn deleted(mut entry: Entry) -> Entry {
    entry.soft_delete();
    entry
}

#[test]
fn attach_posts_surface_setup() {
    let (surface, log) = RecordingSurface::new();
    let scheduler = Arc::new(ManualScheduler::new(MapCanvas::new(Box::new(surface))));
    let mut service = MapService::new(MapConfig::default());
    service.attach_view(scheduler.clone());
    scheduler.run_pending();

    assert!(service.has_view());
    assert_eq!(
        log.calls(),
        vec![
            SurfaceCall::SetMinZoom(13),
            SurfaceCall::SetRotationGestureEnabled(false),
        ]
    );
}

#[test]
fn bulk_load_batches_into_one_overlay_build() {
    let mut harness = attached_service();
    let entries = vec![Entry::new(1, 48.0, 14.0), Entry::new(2, 47.0, 9.0)];

    harness.service.bulk_load(&entries);

    assert_eq!(harness.service.marker_count(), 2);
    assert_eq!(harness.scheduler.pending_len(), 1);
    assert_eq!(harness.scheduler.run_pending(), 1);
    assert_eq!(harness.builds(), 1);

    let installed = harness.log.installed_overlays();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].marker_count(), 2);
}

#[test]
fn update_to_deleted_removes_marker_and_schedules_two_resyncs() {
    let mut harness = attached_service();

    harness
        .service
        .add_or_update_entry(&Entry::new(1, 48.0, 14.0), true);
    harness
        .service
        .add_or_update_entry(&deleted(Entry::new(1, 48.0, 14.0)), true);

    assert_eq!(harness.service.marker_count(), 0);
    assert_eq!(harness.scheduler.pending_len(), 2);

    harness.scheduler.run_pending();
    let installed = harness.log.installed_overlays();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].marker_count(), 0);
}

#[test]
fn removing_unknown_entry_is_a_no_op() {
    let mut harness = attached_service();

    assert!(!harness.service.remove_entry(&Entry::new(99, 48.0, 14.0)));
    assert_eq!(harness.scheduler.pending_len(), 0);
    assert_eq!(harness.service.marker_count(), 0);
}

#[test]
fn add_or_update_twice_keeps_one_marker() {
    let mut harness = attached_service();
    let entry = Entry::new(5, 48.0, 14.0);

    harness.service.add_or_update_entry(&entry, false);
    harness.service.add_or_update_entry(&entry, false);

    assert_eq!(harness.service.marker_count(), 1);
    assert_eq!(harness.scheduler.pending_len(), 0);
}

#[test]
fn bulk_load_then_remove_matches_direct_load() {
    let a = Entry::new(1, 48.0, 14.0);
    let b = Entry::new(2, 47.0, 9.0);
    let c = Entry::new(3, 46.6, 13.8);

    let mut first = attached_service();
    first.service.bulk_load([&a, &b, &c]);
    assert!(first.service.remove_entry(&b));

    let mut second = attached_service();
    second.service.bulk_load([&a, &c]);

    assert_eq!(first.service.markers(), second.service.markers());
}

#[test]
fn store_tracks_last_write_per_entry() {
    let mut harness = attached_service();
    let writes = vec![
        Entry::new(1, 48.0, 14.0),
        Entry::new(2, 47.0, 9.0),
        deleted(Entry::new(1, 48.0, 14.0)),
        Entry::new(3, 46.6, 13.8),
        Entry::new(2, 47.5, 9.5),
        deleted(Entry::new(4, 48.2, 16.3)),
        Entry::new(1, 48.1, 14.1),
    ];
    for entry in &writes {
        harness.service.add_or_update_entry(entry, false);
    }
    harness.service.remove_entry_id(3);

    let markers = harness.service.markers();
    let ids = markers.iter().map(|marker| marker.entry_id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(markers[0].position.latitude, 48.1);
    assert_eq!(markers[1].position.latitude, 47.5);
}

#[test]
fn resync_swaps_overlay_in_remove_redraw_add_redraw_order() {
    let mut harness = attached_service();
    harness
        .service
        .add_or_update_entry(&Entry::new(1, 48.0, 14.0), true);
    harness.scheduler.run_pending();
    let first = harness.log.installed_overlays()[0].id;
    harness.log.clear_calls();

    harness
        .service
        .add_or_update_entry(&Entry::new(2, 47.0, 9.0), true);
    harness.scheduler.run_pending();
    let second = harness.log.installed_overlays()[0].id;

    assert_ne!(first, second);
    assert_eq!(
        harness.log.calls(),
        vec![
            SurfaceCall::RemoveOverlay(first),
            SurfaceCall::Invalidate,
            SurfaceCall::AddOverlay(second),
            SurfaceCall::Invalidate,
        ]
    );
}

#[test]
fn queued_resyncs_leave_latest_snapshot_installed() {
    let mut harness = attached_service();
    harness
        .service
        .add_or_update_entry(&Entry::new(1, 48.0, 14.0), true);
    harness
        .service
        .add_or_update_entry(&Entry::new(2, 47.0, 9.0), true);
    harness
        .service
        .add_or_update_entry(&Entry::new(3, 46.6, 13.8), true);

    assert_eq!(harness.scheduler.run_pending(), 3);
    assert_eq!(harness.builds(), 3);
    let installed = harness.log.installed_overlays();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].marker_count(), 3);
}

#[test]
fn queued_resync_includes_later_writes_without_refresh() {
    let mut harness = attached_service();
    harness
        .service
        .add_or_update_entry(&Entry::new(1, 48.0, 14.0), true);
    harness
        .service
        .add_or_update_entry(&Entry::new(2, 47.0, 9.0), false);

    assert_eq!(harness.scheduler.run_pending(), 1);
    let installed = harness.log.installed_overlays();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].marker_count(), 2);
}

#[test]
fn queued_resync_sees_clear_made_before_it_runs() {
    let mut harness = attached_service();
    harness.service.bulk_load(&[Entry::new(1, 48.0, 14.0)]);
    harness.service.clear_entries();

    assert_eq!(harness.scheduler.run_pending(), 1);
    assert_eq!(harness.service.marker_count(), 0);
    assert_eq!(harness.log.installed_overlays()[0].marker_count(), 0);
}

#[test]
fn clear_does_not_resync() {
    let mut harness = attached_service();
    harness.service.bulk_load(&[Entry::new(1, 48.0, 14.0)]);
    harness.scheduler.run_pending();

    harness.service.clear_entries();
    assert_eq!(harness.service.marker_count(), 0);
    assert_eq!(harness.scheduler.pending_len(), 0);

    assert!(harness.service.recluster());
    harness.scheduler.run_pending();
    assert_eq!(harness.log.installed_overlays()[0].marker_count(), 0);
}

#[test]
fn mutations_without_view_update_store_only() {
    let mut service = MapService::new(MapConfig::default());

    service.add_or_update_entry(&Entry::new(1, 48.0, 14.0), true);
    service.bulk_load(&[Entry::new(2, 47.0, 9.0)]);

    assert!(!service.has_view());
    assert_eq!(service.marker_count(), 2);
    assert!(!service.recluster());
    assert!(!service.zoom_to_position(48.0, 14.0));
    assert!(!service.zoom_to_austria());
}

#[test]
fn detached_view_stops_scheduling() {
    let mut harness = attached_service();
    harness.service.detach_view();

    harness
        .service
        .add_or_update_entry(&Entry::new(1, 48.0, 14.0), true);
    assert_eq!(harness.service.marker_count(), 1);
    assert_eq!(harness.scheduler.pending_len(), 0);
}

#[test]
fn bounding_box_zoom_is_delayed_and_issued_twice_without_animation() {
    let harness = attached_service();
    let bbox = froody_core::map::camera::austria_bounding_box();

    assert!(harness.service.zoom_to_austria());
    assert_eq!(harness.scheduler.run_pending(), 0);
    assert_eq!(
        harness.scheduler.pending_due_times(),
        vec![Duration::from_millis(100)]
    );
    assert_eq!(harness.scheduler.advance(Duration::from_millis(100)), 1);

    assert_eq!(
        harness.log.calls(),
        vec![
            SurfaceCall::ZoomToBoundingBox {
                bbox,
                animated: false
            },
            SurfaceCall::ZoomToBoundingBox {
                bbox,
                animated: false
            },
        ]
    );
}

#[test]
fn zoom_to_position_sets_center_then_default_zoom() {
    let harness = attached_service();

    assert!(harness.service.zoom_to_hgb());
    harness.scheduler.run_pending();

    assert_eq!(
        harness.log.calls(),
        vec![
            SurfaceCall::SetCenter(froody_core::map::camera::HAGENBERG),
            SurfaceCall::SetZoom(16),
        ]
    );
}

#[test]
fn rotation_gesture_toggle_reaches_surface() {
    let mut harness = attached_service();

    harness.service.set_rotation_gesture_enabled(true);
    harness.scheduler.run_pending();

    assert!(harness.service.rotation_gesture_enabled());
    assert_eq!(
        harness.log.calls(),
        vec![SurfaceCall::SetRotationGestureEnabled(true)]
    );
}

#[test]
fn closed_render_thread_drops_posts_but_keeps_store() {
    let (surface, log) = RecordingSurface::new();
    let render = Arc::new(RenderThread::spawn(MapCanvas::new(Box::new(surface))).unwrap());
    let mut service = MapService::new(MapConfig::default());
    service.attach_view(render.clone());
    render.shutdown();

    assert_eq!(
        log.calls(),
        vec![
            SurfaceCall::SetMinZoom(13),
            SurfaceCall::SetRotationGestureEnabled(false),
        ]
    );

    service.add_or_update_entry(&Entry::new(1, 48.0, 14.0), true);
    assert_eq!(service.marker_count(), 1);
    assert!(service.has_view());
    assert!(!service.recluster());
    assert!(!service.zoom_to_position(48.0, 14.0));
    assert!(!service.zoom_to_austria());
    assert!(log.installed_overlays().is_empty());
}
