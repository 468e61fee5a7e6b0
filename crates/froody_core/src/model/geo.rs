//! Geographic primitives shared by the entry model and the map layer.
//!
//! # Responsibility
//! - Represent WGS84 points and axis-aligned bounding boxes.
//! - Encode/decode geohash cells used for cache blocks and map center lookups
//!   (cell math comes from the `geohash` crate).
//!
//! # Invariants
//! - Geohash strings only use the base32 alphabet `0-9 b-h j k m n p-z`.
//! - `BoundingBox::from_geo_points` always yields `north >= south` and
//!   `east >= west`.

use geohash::Coord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Longest geohash precision accepted by encode/validate.
pub const GEOHASH_MAX_PRECISION: usize = 12;

static GEOHASH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9b-hjkmnp-z]{1,12}$").expect("geohash pattern must compile")
});

/// WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns whether both components lie inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Axis-aligned geographic box (north/east/south/west edges in degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn new(north: f64, east: f64, south: f64, west: f64) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    /// Returns the smallest box containing every point, or `None` for an
    /// empty input.
    pub fn from_geo_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.latitude, first.longitude, first.latitude, first.longitude);
        for point in &points[1..] {
            bbox.north = bbox.north.max(point.latitude);
            bbox.south = bbox.south.min(point.latitude);
            bbox.east = bbox.east.max(point.longitude);
            bbox.west = bbox.west.min(point.longitude);
        }
        Some(bbox)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }
}

/// Encodes a point as a geohash of `precision` characters.
///
/// `precision` is clamped to `1..=GEOHASH_MAX_PRECISION`. Returns `None` for
/// points outside WGS84 bounds.
pub fn encode_geohash(point: GeoPoint, precision: usize) -> Option<String> {
    if !point.is_valid() {
        return None;
    }
    let precision = precision.clamp(1, GEOHASH_MAX_PRECISION);
    geohash::encode(
        Coord {
            x: point.longitude,
            y: point.latitude,
        },
        precision,
    )
    .ok()
}

/// Decodes a geohash into the bounding box of its cell.
///
/// Returns `None` for malformed input.
pub fn decode_geohash_bbox(hash: &str) -> Option<BoundingBox> {
    if !is_valid_geohash(hash) {
        return None;
    }
    let cell = geohash::decode_bbox(hash).ok()?;
    let (min, max) = (cell.min(), cell.max());
    Some(BoundingBox::new(max.y, max.x, min.y, min.x))
}

/// Decodes a geohash into the center point of its cell.
pub fn decode_geohash(hash: &str) -> Option<GeoPoint> {
    decode_geohash_bbox(hash).map(|bbox| bbox.center())
}

pub fn is_valid_geohash(hash: &str) -> bool {
    GEOHASH_PATTERN.is_match(hash)
}
