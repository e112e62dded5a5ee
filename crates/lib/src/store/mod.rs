//! Bounded store of reading positions
//!
//! [`ProgressStore`] keeps a single JSON object in a [`Medium`], mapping each
//! [`PageKey`] to a [`PositionRecord`]. Every mutation reads the whole mapping,
//! changes it and writes it back; there is no partial update at the medium
//! level.
//!
//! Two eviction rules bound the mapping:
//! - a count cap, applied on every [`save`](ProgressStore::save) by dropping
//!   the records with the oldest `saved_at` (ties by key order);
//! - a time-to-live, applied by [`sweep`](ProgressStore::sweep).

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{PageKey, backend::Medium, config::ProgressConfig};

mod errors;
mod record;

pub use errors::StoreError;
pub use record::{PositionMap, PositionRecord};
use record::StoredMap;


/// Typed access to the position mapping kept in a [`Medium`].
#[derive(Debug)]
pub struct ProgressStore {
    medium: Box<dyn Medium>,
    storage_key: String,
    max_entries: usize,
}

impl ProgressStore {
    /// Creates a store over `medium` keeping at most `max_entries` records
    /// under `storage_key`.
    pub fn new(
        medium: impl Medium + 'static,
        storage_key: impl Into<String>,
        max_entries: usize,
    ) -> Self {
        Self {
            medium: Box::new(medium),
            storage_key: storage_key.into(),
            max_entries,
        }
    }

    pub fn from_config(medium: impl Medium + 'static, config: &ProgressConfig) -> Self {
        Self::new(medium, config.storage_key.clone(), config.max_entries)
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Reads the mapping, reporting unreadable or unparsable content.
    ///
    /// A missing entry is an empty mapping, not an error.
    pub fn try_load(&self) -> Result<PositionMap, StoreError> {
        let stored = self.read()?;
        Ok(stored
            .into_iter()
            .map(|(key, stored)| (key, stored.record()))
            .collect())
    }

    /// Reads the mapping as persisted, numbers untouched.
    fn read(&self) -> Result<StoredMap, StoreError> {
        let raw = self
            .medium
            .get(&self.storage_key)
            .map_err(|source| self.persistence_failure("read", source))?;

        match raw {
            None => Ok(StoredMap::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::CorruptData {
                storage_key: self.storage_key.clone(),
                source,
            }),
        }
    }

    /// Reads the mapping, recovering any failure as an empty mapping.
    pub fn load(&self) -> PositionMap {
        self.try_load().unwrap_or_else(|err| {
            warn!(error = %err, storage_key = %self.storage_key, "Ignoring unreadable reading positions");
            PositionMap::new()
        })
    }

    /// The record for one page, if any.
    pub fn get(&self, key: &PageKey) -> Option<PositionRecord> {
        self.load().get(key).copied()
    }

    /// Number of remembered pages.
    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upserts `key -> {offset, now}` and enforces the count cap.
    ///
    /// Corrupt existing content is replaced. If the medium cannot be read the
    /// write is skipped so unreadable data is never clobbered blindly.
    ///
    /// # Returns
    /// The number of records evicted to stay within `max_entries`.
    pub fn save(&self, key: &PageKey, offset: u64, now: u64) -> Result<usize, StoreError> {
        let mut map = match self.read() {
            Ok(map) => map,
            Err(err) if err.is_corrupt_data() => {
                warn!(error = %err, "Replacing corrupt reading positions");
                StoredMap::new()
            }
            Err(err) => return Err(err),
        };

        map.insert(key.clone(), PositionRecord::new(offset, now).into());
        let evicted = evict_oldest(&mut map, self.max_entries);
        self.write(&map)?;

        debug!(%key, offset, entries = map.len(), evicted = evicted.len(), "Saved reading position");
        Ok(evicted.len())
    }

    /// Deletes one page's record.
    ///
    /// # Returns
    /// `true` if a record was removed. Nothing is written otherwise.
    pub fn remove(&self, key: &PageKey) -> Result<bool, StoreError> {
        let mut map = self.read()?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.write(&map)?;
        debug!(%key, "Removed reading position");
        Ok(true)
    }

    /// Moves an existing record's `saved_at` to `now`, keeping its offset as
    /// stored.
    ///
    /// # Returns
    /// `true` if the page had a record. Nothing is written otherwise.
    pub fn touch(&self, key: &PageKey, now: u64) -> Result<bool, StoreError> {
        let mut map = self.read()?;
        let Some(stored) = map.get_mut(key) else {
            return Ok(false);
        };
        stored.touch(now);
        self.write(&map)?;
        debug!(%key, now, "Refreshed reading position");
        Ok(true)
    }

    /// Deletes the whole mapping from the medium.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.medium
            .remove(&self.storage_key)
            .map_err(|source| self.persistence_failure("clear", source))?;
        debug!(storage_key = %self.storage_key, "Cleared all reading positions");
        Ok(())
    }

    /// Removes every record with `now - saved_at > threshold`.
    ///
    /// The mapping is written back once, and only if something expired.
    /// Surviving records keep their persisted text.
    ///
    /// # Returns
    /// The number of records removed.
    pub fn sweep(&self, now: u64, threshold: Duration) -> Result<usize, StoreError> {
        let threshold_ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
        let mut map = self.read()?;

        let before = map.len();
        map.retain(|_, stored| !stored.record().is_expired(now, threshold_ms));
        let removed = before - map.len();

        if removed > 0 {
            self.write(&map)?;
            info!(removed, remaining = map.len(), "Swept expired reading positions");
        }
        Ok(removed)
    }

    fn write(&self, map: &StoredMap) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(map).map_err(|source| StoreError::SerializationFailed { source })?;
        self.medium
            .set(&self.storage_key, &raw)
            .map_err(|source| self.persistence_failure("write", source))
    }

    fn persistence_failure(
        &self,
        operation: &'static str,
        source: crate::backend::MediumError,
    ) -> StoreError {
        StoreError::PersistenceFailure {
            storage_key: self.storage_key.clone(),
            operation,
            source,
        }
    }
}

/// Drops the oldest records until at most `max_entries` remain.
///
/// Oldest means smallest `saved_at`; equal timestamps go in key order.
fn evict_oldest(map: &mut StoredMap, max_entries: usize) -> Vec<PageKey> {
    let excess = map.len().saturating_sub(max_entries);
    if excess == 0 {
        return Vec::new();
    }

    let mut by_age: Vec<(u64, PageKey)> = map
        .iter()
        .map(|(key, stored)| (stored.saved_at(), key.clone()))
        .collect();
    by_age.sort();

    by_age
        .into_iter()
        .take(excess)
        .map(|(_, key)| {
            map.remove(&key);
            key
        })
        .collect()
}
