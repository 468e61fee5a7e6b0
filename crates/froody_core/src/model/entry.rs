//! Entry domain model.
//!
//! # Responsibility
//! - Define the user-submitted geotagged record rendered on the map.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `entry_id` is assigned by the backend and never reused.
//! - `was_deleted` is the source of truth for tombstone state.
//! - Coordinates must lie inside WGS84 bounds.

use crate::model::geo::{encode_geohash, is_valid_geohash, GeoPoint};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Backend-assigned entry identifier.
pub type EntryId = i64;

/// Geohash precision of one cache block.
pub const BLOCK_GEOHASH_PRECISION: usize = 5;
/// Geohash precision stored on new entries.
pub const ENTRY_GEOHASH_PRECISION: usize = 9;

/// Canonical record for one user-submitted point of interest.
///
/// Serialized with camelCase keys to match the REST API payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub entry_id: EntryId,
    pub latitude: f64,
    pub longitude: f64,
    /// Geohash of the entry position; empty means "derive from coordinates".
    #[serde(default)]
    pub geohash: String,
    #[serde(default)]
    pub entry_type: i32,
    #[serde(default)]
    pub distribution_type: i32,
    #[serde(default)]
    pub certification_type: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact_info: String,
    pub user_id: Option<i64>,
    /// Unix epoch milliseconds.
    pub creation_date: Option<i64>,
    /// Unix epoch milliseconds.
    pub last_modified_date: Option<i64>,
    /// Soft delete tombstone reported by the backend.
    #[serde(default)]
    pub was_deleted: bool,
}

/// Validation errors for entry invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValidationError {
    InvalidCoordinates { latitude: f64, longitude: f64 },
    InvalidGeohash(String),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCoordinates {
                latitude,
                longitude,
            } => write!(
                f,
                "entry coordinates out of range: latitude={latitude} longitude={longitude}"
            ),
            Self::InvalidGeohash(value) => write!(f, "entry geohash is invalid: `{value}`"),
        }
    }
}

impl Error for EntryValidationError {}

impl Entry {
    /// Creates a visible entry at the given position.
    ///
    /// The geohash is derived from the coordinates; it stays empty when they
    /// are out of range, which `validate` reports.
    pub fn new(entry_id: EntryId, latitude: f64, longitude: f64) -> Self {
        Self {
            entry_id,
            latitude,
            longitude,
            geohash: encode_geohash(
                GeoPoint::new(latitude, longitude),
                ENTRY_GEOHASH_PRECISION,
            )
            .unwrap_or_default(),
            entry_type: 0,
            distribution_type: 0,
            certification_type: 0,
            description: String::new(),
            contact_info: String::new(),
            user_id: None,
            creation_date: None,
            last_modified_date: None,
            was_deleted: false,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Returns the geohash block this entry is cached under.
    ///
    /// Empty for entries whose coordinates fail validation.
    pub fn block_geohash(&self) -> String {
        if self.geohash.len() >= BLOCK_GEOHASH_PRECISION && is_valid_geohash(&self.geohash) {
            return self.geohash[..BLOCK_GEOHASH_PRECISION].to_string();
        }
        encode_geohash(self.position(), BLOCK_GEOHASH_PRECISION).unwrap_or_default()
    }

    /// Marks this entry as softly deleted.
    pub fn soft_delete(&mut self) {
        self.was_deleted = true;
    }

    pub fn is_active(&self) -> bool {
        !self.was_deleted
    }

    /// Validates coordinate and geohash invariants.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if !self.position().is_valid() {
            return Err(EntryValidationError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        if !self.geohash.is_empty() && !is_valid_geohash(&self.geohash) {
            return Err(EntryValidationError::InvalidGeohash(self.geohash.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryValidationError};

    #[test]
    fn new_entry_is_active_with_derived_geohash() {
        let entry = Entry::new(1, 48.0, 14.0);
        assert!(entry.is_active());
        assert_eq!(entry.geohash.len(), 9);
        assert_eq!(entry.block_geohash(), "u29cn");
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn soft_delete_marks_tombstone() {
        let mut entry = Entry::new(1, 48.0, 14.0);
        entry.soft_delete();
        assert!(!entry.is_active());
    }

    #[test]
    fn validate_rejects_out_of_range_coordinates() {
        let entry = Entry::new(1, 91.0, 14.0);
        assert!(entry.geohash.is_empty());
        assert!(entry.block_geohash().is_empty());
        assert!(matches!(
            entry.validate(),
            Err(EntryValidationError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn validate_rejects_malformed_geohash() {
        let mut entry = Entry::new(1, 48.0, 14.0);
        entry.geohash = "not-a-hash".to_string();
        assert!(matches!(
            entry.validate(),
            Err(EntryValidationError::InvalidGeohash(_))
        ));
    }

    #[test]
    fn block_geohash_falls_back_to_coordinates() {
        let mut entry = Entry::new(2, 47.0, 9.0);
        entry.geohash.clear();
        assert_eq!(entry.block_geohash(), "u0q7k");
    }
}
