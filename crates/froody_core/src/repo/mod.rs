//! Persistence contracts for data the map reads at startup.
//!
//! # Responsibility
//! - Define the entry cache and map settings contracts consumed by the map.
//! - Keep SQL details out of the map/service layer.
//!
//! # Invariants
//! - Writes validate entries before touching SQLite.
//! - Reads reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::entry::EntryValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entry_cache;
pub mod settings_repo;

pub type CacheResult<T> = Result<T, CacheError>;

/// Error for cache and settings persistence.
#[derive(Debug)]
pub enum CacheError {
    Validation(EntryValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid cached data: {message}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<EntryValidationError> for CacheError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Fails when `table` is missing, i.e. the connection skipped migrations.
pub(crate) fn ensure_table(conn: &rusqlite::Connection, table: &str) -> CacheResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [table],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(CacheError::InvalidData(format!(
            "table `{table}` is missing; open the database through open_db"
        )))
    }
}
