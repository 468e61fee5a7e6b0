use froody_core::{GeoPoint, MapConfig, MapService, Viewport, ViewportListener};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct BlockRecorder {
    seen: Mutex<Vec<(u8, String)>>,
}

impl ViewportListener for BlockRecorder {
    fn on_viewport_changed(&self, viewport: &Viewport, center_block: &str) {
        self.seen
            .lock()
            .unwrap()
            .push((viewport.zoom, center_block.to_string()));
    }
}

#[test]
fn scroll_and_zoom_notify_listeners_with_center_block() {
    let recorder = Arc::new(BlockRecorder::default());
    let mut service = MapService::new(MapConfig::default());
    service.add_viewport_listener(recorder.clone());

    service.on_scroll(Viewport {
        center: GeoPoint::new(48.0, 14.0),
        zoom: 13,
    });
    service.on_zoom(Viewport {
        center: GeoPoint::new(48.0, 14.0),
        zoom: 15,
    });

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![(13, "u29cn".to_string()), (15, "u29cn".to_string())]
    );
}

#[test]
fn current_zoom_and_center_geohash_follow_last_event() {
    let mut service = MapService::new(MapConfig::default());
    assert_eq!(service.current_zoom_level(), None);
    assert_eq!(service.map_center_geohash(5), None);

    service.on_zoom(Viewport {
        center: GeoPoint::new(47.0, 9.0),
        zoom: 14,
    });

    assert_eq!(service.current_zoom_level(), Some(14));
    assert_eq!(service.map_center_geohash(5).as_deref(), Some("u0q7k"));
}
