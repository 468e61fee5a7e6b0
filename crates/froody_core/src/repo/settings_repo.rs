//! Last map viewport persistence.

use crate::model::geo::GeoPoint;
use crate::repo::{ensure_table, CacheError, CacheResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Viewport saved when the map was last moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastLocation {
    pub center: GeoPoint,
    pub zoom: u8,
}

/// Settings contract read once at map initialization.
///
/// Implementations reject centers outside WGS84 bounds on save, so a stored
/// location always loads back.
pub trait MapSettingsStore {
    fn load_last_location(&self) -> CacheResult<Option<LastLocation>>;
    fn save_last_location(&self, location: &LastLocation) -> CacheResult<()>;
}

pub struct SqliteMapSettings<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMapSettings<'conn> {
    pub fn try_new(conn: &'conn Connection) -> CacheResult<Self> {
        ensure_table(conn, "map_settings")?;
        Ok(Self { conn })
    }
}

impl MapSettingsStore for SqliteMapSettings<'_> {
    fn load_last_location(&self) -> CacheResult<Option<LastLocation>> {
        let row = self
            .conn
            .query_row(
                "SELECT last_latitude, last_longitude, last_zoom FROM map_settings WHERE id = 1;",
                [],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((latitude, longitude, zoom)) = row else {
            return Ok(None);
        };
        let center = GeoPoint::new(latitude, longitude);
        if !center.is_valid() {
            return Err(CacheError::InvalidData(format!(
                "invalid last location {latitude},{longitude} in map_settings"
            )));
        }
        let zoom = u8::try_from(zoom).map_err(|_| {
            CacheError::InvalidData(format!("invalid last zoom `{zoom}` in map_settings"))
        })?;

        Ok(Some(LastLocation { center, zoom }))
    }

    fn save_last_location(&self, location: &LastLocation) -> CacheResult<()> {
        let center = location.center;
        if !center.is_valid() {
            return Err(CacheError::InvalidData(format!(
                "refusing to save last location {},{} outside WGS84 bounds",
                center.latitude, center.longitude
            )));
        }
        self.conn.execute(
            "INSERT INTO map_settings (id, last_latitude, last_longitude, last_zoom)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                last_latitude = excluded.last_latitude,
                last_longitude = excluded.last_longitude,
                last_zoom = excluded.last_zoom,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![center.latitude, center.longitude, i64::from(location.zoom)],
        )?;
        Ok(())
    }
}
