//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `froody_core` linkage without the Flutter runtime.
//! - Run one headless map pass: cache -> markers -> clusters.

use froody_core::db::open_db_in_memory;
use froody_core::map::surface::recording::RecordingSurface;
use froody_core::{
    Entry, MapCanvas, MapConfig, MapService, RenderThread, SqliteEntryCache, SqliteMapSettings,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

fn main() -> ExitCode {
    println!("froody_core ping={}", froody_core::ping());
    println!("froody_core version={}", froody_core::core_version());

    match run_headless_map() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("headless map failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_headless_map() -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let cache = SqliteEntryCache::try_new(&conn)?;
    let settings = SqliteMapSettings::try_new(&conn)?;
    cache.upsert_entries(&[
        Entry::new(1, 48.0, 14.0),
        Entry::new(2, 48.0, 14.001),
        Entry::new(3, 47.0, 9.0),
    ])?;

    let (surface, log) = RecordingSurface::new();
    let render = Arc::new(RenderThread::spawn(MapCanvas::new(Box::new(surface)))?);
    let mut service = MapService::new(MapConfig::default());
    service.attach_view(render.clone());
    let outcome = service.prepare(&cache, &settings)?;
    render.wait_for_idle(Duration::from_secs(2))?;

    println!(
        "map loaded={} markers={}",
        outcome.loaded_entries, outcome.markers
    );
    for overlay in log.installed_overlays() {
        for cluster in &overlay.clusters {
            println!(
                "cluster lat={:.5} lon={:.5} size={}",
                cluster.position.latitude,
                cluster.position.longitude,
                cluster.len()
            );
        }
    }
    Ok(())
}
