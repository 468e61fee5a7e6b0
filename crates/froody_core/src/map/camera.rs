//! Camera navigation helpers.
//!
//! Camera calls are posted to the render queue like every other surface
//! mutation.

use crate::map::scheduler::{RenderScheduler, ScheduleError};
use crate::model::geo::{BoundingBox, GeoPoint};
use std::time::Duration;

/// Hagenberg im Muehlkreis, the project's home town.
pub const HAGENBERG: GeoPoint = GeoPoint {
    latitude: 48.368399,
    longitude: 14.513167,
};

const AUSTRIA_OUTLINE: [GeoPoint; 4] = [
    GeoPoint {
        latitude: 47.254028,
        longitude: 9.399102,
    },
    GeoPoint {
        latitude: 46.532729,
        longitude: 14.053614,
    },
    GeoPoint {
        latitude: 48.035731,
        longitude: 17.365241,
    },
    GeoPoint {
        latitude: 49.197737,
        longitude: 15.266852,
    },
];

/// Box spanning the western, southern, eastern and northern tips of Austria.
pub fn austria_bounding_box() -> BoundingBox {
    BoundingBox::new(49.197737, 17.365241, 46.532729, 9.399102)
}

/// Returns the corner points `austria_bounding_box` is derived from.
pub fn austria_outline() -> &'static [GeoPoint] {
    &AUSTRIA_OUTLINE
}

/// Posts "center on `center`, then zoom to `zoom`".
pub fn post_zoom_to_position(
    scheduler: &dyn RenderScheduler,
    center: GeoPoint,
    zoom: u8,
) -> Result<(), ScheduleError> {
    scheduler.post(Box::new(move |canvas| {
        let surface = canvas.surface_mut();
        surface.set_center(center);
        surface.set_zoom(zoom);
    }))
}

/// Posts a bounding-box fit after `delay`.
///
/// The fit is issued twice without animation: the map library can drop the
/// first fit while its layout is still settling.
pub fn post_zoom_to_bounding_box(
    scheduler: &dyn RenderScheduler,
    bbox: BoundingBox,
    delay: Duration,
) -> Result<(), ScheduleError> {
    scheduler.post_delayed(
        delay,
        Box::new(move |canvas| {
            let surface = canvas.surface_mut();
            surface.zoom_to_bounding_box(&bbox, false);
            surface.zoom_to_bounding_box(&bbox, false);
        }),
    )
}
