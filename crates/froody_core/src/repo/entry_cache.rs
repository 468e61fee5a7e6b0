//! Block cache of entries fetched from the backend.
//!
//! # Responsibility
//! - Persist entries grouped by their 5-character geohash block.
//! - Serve the "all cached entries" snapshot the map bulk-loads at startup.
//!
//! # Invariants
//! - One row per `entry_id`; upserts replace the previous row.
//! - Soft-deleted entries stay cached so the map can drop their markers.

use crate::model::entry::{Entry, EntryId};
use crate::repo::{ensure_table, CacheError, CacheResult};
use log::{debug, info};
use rusqlite::{params, Connection, Row};

const ENTRY_SELECT_SQL: &str = "SELECT
    entry_id,
    geohash,
    latitude,
    longitude,
    entry_type,
    distribution_type,
    certification_type,
    description,
    contact_info,
    user_id,
    creation_date,
    last_modified_date,
    was_deleted
FROM cached_entries";

/// Read side of the entry cache consumed by the map.
pub trait EntryCache {
    fn get_all_cached_entries(&self) -> CacheResult<Vec<Entry>>;
}

/// SQLite-backed entry cache.
pub struct SqliteEntryCache<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryCache<'conn> {
    /// Wraps a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> CacheResult<Self> {
        ensure_table(conn, "cached_entries")?;
        Ok(Self { conn })
    }

    /// Inserts or replaces entries in one transaction.
    ///
    /// Returns the number of rows written.
    pub fn upsert_entries(&self, entries: &[Entry]) -> CacheResult<usize> {
        for entry in entries {
            entry.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cached_entries (
                    entry_id,
                    block_geohash,
                    geohash,
                    latitude,
                    longitude,
                    entry_type,
                    distribution_type,
                    certification_type,
                    description,
                    contact_info,
                    user_id,
                    creation_date,
                    last_modified_date,
                    was_deleted
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT(entry_id) DO UPDATE SET
                    block_geohash = excluded.block_geohash,
                    geohash = excluded.geohash,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    entry_type = excluded.entry_type,
                    distribution_type = excluded.distribution_type,
                    certification_type = excluded.certification_type,
                    description = excluded.description,
                    contact_info = excluded.contact_info,
                    user_id = excluded.user_id,
                    creation_date = excluded.creation_date,
                    last_modified_date = excluded.last_modified_date,
                    was_deleted = excluded.was_deleted,
                    cached_at = (strftime('%s', 'now') * 1000);",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.entry_id,
                    entry.block_geohash(),
                    entry.geohash.as_str(),
                    entry.latitude,
                    entry.longitude,
                    entry.entry_type,
                    entry.distribution_type,
                    entry.certification_type,
                    entry.description.as_str(),
                    entry.contact_info.as_str(),
                    entry.user_id,
                    entry.creation_date,
                    entry.last_modified_date,
                    bool_to_int(entry.was_deleted),
                ])?;
            }
        }
        tx.commit()?;

        info!(
            "event=cache_upsert module=cache status=ok count={}",
            entries.len()
        );
        Ok(entries.len())
    }

    /// Returns cached entries of one geohash block, ordered by id.
    pub fn entries_in_block(&self, block_geohash: &str) -> CacheResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL} WHERE block_geohash = ?1 ORDER BY entry_id ASC;"
        ))?;
        let mut rows = stmt.query([block_geohash])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    pub fn get_entry(&self, entry_id: EntryId) -> CacheResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE entry_id = ?1;"))?;
        let mut rows = stmt.query([entry_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_entry_row(row)?)),
            None => Ok(None),
        }
    }

    /// Hard-removes one entry from the cache. Returns whether a row existed.
    pub fn remove_entry(&self, entry_id: EntryId) -> CacheResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM cached_entries WHERE entry_id = ?1;", [entry_id])?;
        Ok(changed > 0)
    }

    pub fn clear(&self) -> CacheResult<()> {
        let removed = self.conn.execute("DELETE FROM cached_entries;", [])?;
        debug!("event=cache_clear module=cache status=ok removed={removed}");
        Ok(())
    }
}

impl EntryCache for SqliteEntryCache<'_> {
    fn get_all_cached_entries(&self) -> CacheResult<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} ORDER BY entry_id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_entry_row(row: &Row<'_>) -> CacheResult<Entry> {
    let was_deleted = match row.get::<_, i64>("was_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(CacheError::InvalidData(format!(
                "invalid was_deleted value `{other}` in cached_entries.was_deleted"
            )));
        }
    };

    let entry = Entry {
        entry_id: row.get("entry_id")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        geohash: row.get("geohash")?,
        entry_type: row.get("entry_type")?,
        distribution_type: row.get("distribution_type")?,
        certification_type: row.get("certification_type")?,
        description: row.get("description")?,
        contact_info: row.get("contact_info")?,
        user_id: row.get("user_id")?,
        creation_date: row.get("creation_date")?,
        last_modified_date: row.get("last_modified_date")?,
        was_deleted,
    };
    entry.validate()?;
    Ok(entry)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
