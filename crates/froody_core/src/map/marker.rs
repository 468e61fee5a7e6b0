//! Marker store: the authoritative set of markers shown on the map.
//!
//! # Responsibility
//! - Wrap entries into display markers.
//! - Apply add/update/remove with update-by-replace semantics.
//!
//! # Invariants
//! - At most one marker per `EntryId`; the map key is the identity.
//! - Soft-deleted entries never have a marker.
//! - The store never triggers rendering itself; callers decide when to resync.
//! - Render jobs read the store through `SharedMarkerStore` when they run,
//!   never through a copy taken at scheduling time.

use crate::model::entry::{Entry, EntryId};
use crate::model::geo::GeoPoint;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Display wrapper binding one entry to a map position.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub entry_id: EntryId,
    pub position: GeoPoint,
    /// Icon resource used to draw this marker.
    pub icon: String,
    pub title: String,
}

impl Marker {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            entry_id: entry.entry_id,
            position: entry.position(),
            icon: format!("entry_type_{}", entry.entry_type),
            title: entry.description.clone(),
        }
    }
}

/// Outcome of one `add_or_update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerChange {
    Inserted,
    Replaced,
    /// A previous marker was dropped because the entry is soft-deleted.
    Removed,
    /// Soft-deleted entry with no marker to drop.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct MarkerStore {
    markers: BTreeMap<EntryId, Marker>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the marker of `entry`, or drops it when `entry` is soft-deleted.
    pub fn add_or_update(&mut self, entry: &Entry) -> MarkerChange {
        let previous = self.markers.remove(&entry.entry_id);

        if entry.was_deleted {
            return match previous {
                Some(_) => MarkerChange::Removed,
                None => MarkerChange::Unchanged,
            };
        }

        self.markers.insert(entry.entry_id, Marker::from_entry(entry));
        match previous {
            Some(_) => MarkerChange::Replaced,
            None => MarkerChange::Inserted,
        }
    }

    /// Removes the marker of `entry_id`. Returns whether one existed.
    pub fn remove(&mut self, entry_id: EntryId) -> bool {
        self.markers.remove(&entry_id).is_some()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn contains(&self, entry_id: EntryId) -> bool {
        self.markers.contains_key(&entry_id)
    }

    pub fn get(&self, entry_id: EntryId) -> Option<&Marker> {
        self.markers.get(&entry_id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Returns sorted entry ids.
    pub fn entry_ids(&self) -> Vec<EntryId> {
        self.markers.keys().copied().collect()
    }

    /// Copies the current markers in entry id order.
    pub fn snapshot(&self) -> Vec<Marker> {
        self.markers.values().cloned().collect()
    }
}

/// Marker store handle shared between the owning service and render jobs.
#[derive(Debug, Clone, Default)]
pub struct SharedMarkerStore {
    inner: Arc<Mutex<MarkerStore>>,
}

impl SharedMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store, recovering from a poisoned lock.
    pub fn lock(&self) -> MutexGuard<'_, MarkerStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Vec<Marker> {
        self.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerChange, MarkerStore, SharedMarkerStore};
    use crate::model::entry::Entry;

    #[test]
    fn add_then_update_replaces_marker() {
        let mut store = MarkerStore::new();
        assert_eq!(
            store.add_or_update(&Entry::new(1, 48.0, 14.0)),
            MarkerChange::Inserted
        );

        let moved = Entry::new(1, 48.5, 14.5);
        assert_eq!(store.add_or_update(&moved), MarkerChange::Replaced);
        assert_eq!(store.len(), 1);
        let marker = store.get(1).expect("marker should exist");
        assert_eq!(marker.position.latitude, 48.5);
    }

    #[test]
    fn deleted_entry_drops_existing_marker() {
        let mut store = MarkerStore::new();
        let mut entry = Entry::new(7, 48.0, 14.0);
        store.add_or_update(&entry);

        entry.soft_delete();
        assert_eq!(store.add_or_update(&entry), MarkerChange::Removed);
        assert!(store.is_empty());
        assert_eq!(store.add_or_update(&entry), MarkerChange::Unchanged);
    }

    #[test]
    fn remove_reports_presence() {
        let mut store = MarkerStore::new();
        store.add_or_update(&Entry::new(1, 48.0, 14.0));
        assert!(!store.remove(99));
        assert!(store.remove(1));
        assert!(!store.contains(1));
    }

    #[test]
    fn snapshot_is_sorted_by_entry_id() {
        let mut store = MarkerStore::new();
        for id in [3, 1, 2] {
            store.add_or_update(&Entry::new(id, 48.0, 14.0));
        }
        let ids = store
            .snapshot()
            .iter()
            .map(|marker| marker.entry_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.entry_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn shared_store_clones_see_later_writes() {
        let store = SharedMarkerStore::new();
        let reader = store.clone();
        store.lock().add_or_update(&Entry::new(1, 48.0, 14.0));
        assert_eq!(reader.snapshot().len(), 1);
        store.lock().clear();
        assert!(reader.lock().is_empty());
    }
}
