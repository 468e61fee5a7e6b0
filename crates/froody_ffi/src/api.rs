//! FFI map API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the map session (markers, clusters, camera) to Dart via FRB.
//! - Own the process-wide render thread and the frame the Dart side polls.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - All map mutations are serialized through one session mutex.

use froody_core::db::open_db;
use froody_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    BoundingBox, CacheResult, ClusterOverlay, Entry, GeoPoint, MapCanvas, MapConfig, MapService, MapSurface,
    OverlayId, RenderThread, SqliteEntryCache, SqliteMapSettings, Viewport,
};
use log::{error, info};
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const MAP_DB_FILE_NAME: &str = "froody_map.sqlite3";
const FRAME_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

static MAP_SESSION: Lazy<Mutex<Option<MapSession>>> = Lazy::new(|| Mutex::new(None));

struct MapSession {
    service: MapService,
    render: Arc<RenderThread>,
    frame: Arc<Mutex<FrameState>>,
    /// Migrated connection reused by every call of this session.
    conn: Connection,
}

/// What the Dart map widget should currently draw.
#[derive(Default)]
struct FrameState {
    overlay: Option<Arc<ClusterOverlay>>,
    center: Option<GeoPoint>,
    zoom: Option<u8>,
    min_zoom: u8,
    rotation_enabled: bool,
    redraws: u64,
}

/// Map surface that publishes render-thread state for polling.
struct FrameSurface {
    frame: Arc<Mutex<FrameState>>,
}

impl FrameSurface {
    fn with_frame(&self, f: impl FnOnce(&mut FrameState)) {
        let mut frame = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *frame);
    }
}

impl MapSurface for FrameSurface {
    fn add_overlay(&mut self, overlay: Arc<ClusterOverlay>) {
        self.with_frame(|frame| frame.overlay = Some(overlay));
    }

    fn remove_overlay(&mut self, id: OverlayId) -> bool {
        let mut removed = false;
        self.with_frame(|frame| {
            if frame.overlay.as_ref().is_some_and(|overlay| overlay.id == id) {
                frame.overlay = None;
                removed = true;
            }
        });
        removed
    }

    fn invalidate(&mut self) {
        self.with_frame(|frame| frame.redraws += 1);
    }

    fn set_center(&mut self, center: GeoPoint) {
        self.with_frame(|frame| frame.center = Some(center));
    }

    fn set_zoom(&mut self, zoom: u8) {
        self.with_frame(|frame| frame.zoom = Some(zoom.max(frame.min_zoom)));
    }

    fn set_min_zoom(&mut self, zoom: u8) {
        self.with_frame(|frame| frame.min_zoom = zoom);
    }

    fn zoom_to_bounding_box(&mut self, bbox: &BoundingBox, _animated: bool) {
        let bbox = *bbox;
        self.with_frame(|frame| frame.center = Some(bbox.center()));
    }

    fn set_rotation_gesture_enabled(&mut self, enabled: bool) {
        self.with_frame(|frame| frame.rotation_enabled = enabled);
    }
}

/// Entry shape accepted from Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntryInput {
    pub entry_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub entry_type: i32,
    pub description: String,
    pub was_deleted: bool,
}

/// One cluster as drawn by Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct MapClusterItem {
    pub latitude: f64,
    pub longitude: f64,
    pub entry_ids: Vec<i64>,
    /// Cluster icon for groups, marker icon for single entries.
    pub icon: String,
}

/// Snapshot of the frame the Dart side should render.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrameResponse {
    pub clusters: Vec<MapClusterItem>,
    pub center_latitude: Option<f64>,
    pub center_longitude: Option<f64>,
    pub zoom: Option<u8>,
    pub rotation_enabled: bool,
    /// Number of redraw requests seen so far; changes whenever Dart should repaint.
    pub frame_version: u64,
    pub message: String,
}

/// Generic action response envelope for map calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapActionResponse {
    pub ok: bool,
    pub marker_count: u32,
    pub message: String,
}

impl MapActionResponse {
    fn success(message: impl Into<String>, marker_count: usize) -> Self {
        Self {
            ok: true,
            marker_count: u32::try_from(marker_count).unwrap_or(u32::MAX),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            marker_count: 0,
            message: message.into(),
        }
    }
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Exposes the core crate version.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Sync call; may create the log directory.
/// - Idempotent for the same `level + log_dir`; a different config is an error.
/// - Never panics; returns an empty string on success and the error otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Creates the map session: render thread, cache bulk-load, viewport restore.
///
/// # FFI contract
/// - Sync call; opens the map database and spawns the render thread.
/// - Calling again replaces the previous session.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_open() -> MapActionResponse {
    let db_path = resolve_map_db_path();
    match open_session(db_path) {
        Ok(session) => {
            let count = session.service.marker_count();
            *lock_session() = Some(session);
            MapActionResponse::success("Map opened.", count)
        }
        Err(err) => {
            error!("event=map_open module=ffi status=error error={err}");
            MapActionResponse::failure(format!("map_open failed: {err}"))
        }
    }
}

/// Adds, updates or (for `was_deleted`) removes one entry marker.
///
/// # FFI contract
/// - Sync call; only queues render work when `auto_refresh` is set.
/// - Rejects out-of-range coordinates without touching the map.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_add_or_update_entry(entry: MapEntryInput, auto_refresh: bool) -> MapActionResponse {
    let entry = to_core_entry(entry);
    if let Err(err) = entry.validate() {
        return MapActionResponse::failure(format!("map_add_or_update_entry failed: {err}"));
    }
    with_session("map_add_or_update_entry", |session| {
        session.service.add_or_update_entry(&entry, auto_refresh);
        Ok("Entry applied.".to_string())
    })
}

/// Bulk-loads entries with one cluster rebuild.
///
/// # FFI contract
/// - Sync call; queues exactly one render job for `Some(_)`.
/// - `None` is a no-op that still reports the current marker count.
/// - One invalid entry rejects the whole batch.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_add_entries(entries: Option<Vec<MapEntryInput>>) -> MapActionResponse {
    let Some(entries) = entries else {
        return with_session("map_add_entries", |_session| Ok("Nothing to add.".to_string()));
    };
    let entries = entries.into_iter().map(to_core_entry).collect::<Vec<_>>();
    if let Some(err) = entries.iter().find_map(|entry| entry.validate().err()) {
        return MapActionResponse::failure(format!("map_add_entries failed: {err}"));
    }
    with_session("map_add_entries", |session| {
        session.service.bulk_load(&entries);
        Ok(format!("Loaded {} entries.", entries.len()))
    })
}

/// Removes one entry marker.
///
/// # FFI contract
/// - Sync call; queues a rebuild only when the marker existed.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_remove_entry(entry_id: i64) -> MapActionResponse {
    with_session("map_remove_entry", |session| {
        if session.service.remove_entry_id(entry_id) {
            Ok("Entry removed.".to_string())
        } else {
            Ok("Entry not on map.".to_string())
        }
    })
}

/// Clears all markers without rebuilding clusters.
///
/// # FFI contract
/// - Sync call, non-blocking; the drawn overlay stays until the next rebuild.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_clear() -> MapActionResponse {
    with_session("map_clear", |session| {
        session.service.clear_entries();
        Ok("Markers cleared.".to_string())
    })
}

/// Rebuilds the cluster overlay from the current markers.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Fails when the render thread is gone.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_recluster() -> MapActionResponse {
    with_session("map_recluster", |session| {
        if session.service.recluster() {
            Ok("Recluster scheduled.".to_string())
        } else {
            Err("render queue unavailable".to_string())
        }
    })
}

/// Reloads every entry from the block cache.
///
/// # FFI contract
/// - Sync call, DB-backed execution on the session connection.
/// - Queues one rebuild for the whole reload.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_reload_cache() -> MapActionResponse {
    with_session("map_reload_cache", |session| {
        let cache = SqliteEntryCache::try_new(&session.conn).map_err(|err| err.to_string())?;
        let loaded = session
            .service
            .load_entries_from_cache(&cache)
            .map_err(|err| err.to_string())?;
        Ok(format!("Reloaded {loaded} cached entries."))
    })
}

/// Centers the map, using the default zoom when `zoom` is `None`.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_zoom_to_position(latitude: f64, longitude: f64, zoom: Option<u8>) -> MapActionResponse {
    with_session("map_zoom_to_position", |session| {
        let posted = match zoom {
            Some(zoom) => session
                .service
                .zoom_to_position_with_zoom(latitude, longitude, zoom),
            None => session.service.zoom_to_position(latitude, longitude),
        };
        if posted {
            Ok("Zoom scheduled.".to_string())
        } else {
            Err("render queue unavailable".to_string())
        }
    })
}

/// Fits the map to Austria after the settle delay.
///
/// # FFI contract
/// - Sync call, non-blocking; the fit runs on the render thread later.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_zoom_to_austria() -> MapActionResponse {
    with_session("map_zoom_to_austria", |session| {
        if session.service.zoom_to_austria() {
            Ok("Zoom scheduled.".to_string())
        } else {
            Err("render queue unavailable".to_string())
        }
    })
}

/// Toggles the rotation gesture.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_set_rotation_enabled(enabled: bool) -> MapActionResponse {
    with_session("map_set_rotation_enabled", |session| {
        session.service.set_rotation_gesture_enabled(enabled);
        Ok("Rotation updated.".to_string())
    })
}

/// Reports a scroll/zoom gesture and persists the viewport.
///
/// # FFI contract
/// - Sync call; one small upsert on the session connection.
/// - Out-of-range centers are rejected and neither applied nor saved.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_on_viewport_changed(latitude: f64, longitude: f64, zoom: u8) -> MapActionResponse {
    let center = GeoPoint::new(latitude, longitude);
    if !center.is_valid() {
        return MapActionResponse::failure(format!(
            "map_on_viewport_changed failed: center {latitude},{longitude} out of range"
        ));
    }
    with_session("map_on_viewport_changed", |session| {
        session.service.on_zoom(Viewport { center, zoom });
        save_viewport(session).map_err(|err| err.to_string())?;
        Ok("Viewport saved.".to_string())
    })
}

/// Returns the frame after all queued render jobs have run.
///
/// # FFI contract
/// - Sync call; blocks until the render queue drains (bounded by a timeout).
/// - Returns an empty frame with a message when the map is not open.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_clusters() -> MapFrameResponse {
    let guard = lock_session();
    let Some(session) = guard.as_ref() else {
        return empty_frame("map is not open");
    };
    if let Err(err) = session.render.wait_for_idle(FRAME_WAIT_TIMEOUT) {
        return empty_frame(&format!("map_clusters failed: {err}"));
    }

    let frame = session
        .frame
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let clusters = frame
        .overlay
        .as_ref()
        .map(|overlay| {
            overlay
                .clusters
                .iter()
                .map(|cluster| MapClusterItem {
                    latitude: cluster.position.latitude,
                    longitude: cluster.position.longitude,
                    entry_ids: cluster.markers.iter().map(|marker| marker.entry_id).collect(),
                    icon: match cluster.markers.as_slice() {
                        [single] => single.icon.clone(),
                        _ => overlay.icon.clone(),
                    },
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    MapFrameResponse {
        message: format!("{} cluster(s).", clusters.len()),
        clusters,
        center_latitude: frame.center.map(|center| center.latitude),
        center_longitude: frame.center.map(|center| center.longitude),
        zoom: frame.zoom,
        rotation_enabled: frame.rotation_enabled,
        frame_version: frame.redraws,
    }
}

/// Stops the render thread and drops the session.
///
/// # FFI contract
/// - Sync call; joins the render thread.
/// - Closing twice reports a failure envelope.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn map_close() -> MapActionResponse {
    let session = lock_session().take();
    match session {
        Some(session) => {
            session.render.shutdown();
            info!("event=map_close module=ffi status=ok");
            MapActionResponse::success("Map closed.", 0)
        }
        None => MapActionResponse::failure("map is not open"),
    }
}

fn open_session(db_path: PathBuf) -> Result<MapSession, String> {
    let conn = open_db(&db_path).map_err(|err| format!("map DB open failed: {err}"))?;

    let frame = Arc::new(Mutex::new(FrameState::default()));
    let surface = FrameSurface {
        frame: Arc::clone(&frame),
    };
    let render = Arc::new(
        RenderThread::spawn(MapCanvas::new(Box::new(surface)))
            .map_err(|err| format!("render thread spawn failed: {err}"))?,
    );

    let mut service = MapService::new(MapConfig::default());
    service.attach_view(render.clone());
    {
        let cache = SqliteEntryCache::try_new(&conn).map_err(|err| err.to_string())?;
        let settings = SqliteMapSettings::try_new(&conn).map_err(|err| err.to_string())?;
        service
            .prepare(&cache, &settings)
            .map_err(|err| format!("map prepare failed: {err}"))?;
    }

    Ok(MapSession {
        service,
        render,
        frame,
        conn,
    })
}

fn save_viewport(session: &MapSession) -> CacheResult<bool> {
    let settings = SqliteMapSettings::try_new(&session.conn)?;
    session.service.save_last_location(&settings)
}

fn with_session(
    operation: &str,
    f: impl FnOnce(&mut MapSession) -> Result<String, String>,
) -> MapActionResponse {
    let mut guard = lock_session();
    let Some(session) = guard.as_mut() else {
        return MapActionResponse::failure(format!("{operation} failed: map is not open"));
    };
    match f(session) {
        Ok(message) => MapActionResponse::success(message, session.service.marker_count()),
        Err(err) => MapActionResponse::failure(format!("{operation} failed: {err}")),
    }
}

fn lock_session() -> std::sync::MutexGuard<'static, Option<MapSession>> {
    MAP_SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

fn empty_frame(message: &str) -> MapFrameResponse {
    MapFrameResponse {
        clusters: Vec::new(),
        center_latitude: None,
        center_longitude: None,
        zoom: None,
        rotation_enabled: false,
        frame_version: 0,
        message: message.to_string(),
    }
}

fn to_core_entry(input: MapEntryInput) -> Entry {
    let mut entry = Entry::new(input.entry_id, input.latitude, input.longitude);
    entry.entry_type = input.entry_type;
    entry.description = input.description;
    entry.was_deleted = input.was_deleted;
    entry
}

fn resolve_map_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var("FROODY_DB_PATH") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(MAP_DB_FILE_NAME)
}
