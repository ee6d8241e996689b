//! Cache Store Module
//!
//! Maps source ids to their latest rendered front page.

use std::collections::HashMap;

use axum::body::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

use crate::cache::{CacheEntry, CacheStats, MAX_SOURCE_ID_LENGTH};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// In-memory store of one image per source.
///
/// Shared as `Arc<RwLock<CacheStore>>`: the refresh task takes the write lock
/// only to swap in a finished entry, request handlers take read locks.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Source id to latest entry
    entries: HashMap<String, CacheEntry>,
    /// Refresh outcome counters
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Put ==
    /// Stores the image for a source, replacing any previous entry whole.
    ///
    /// # Arguments
    /// * `id` - Source identifier
    /// * `png` - Fully encoded PNG bytes
    /// * `edition` - Date of the edition the image was rendered from
    /// * `fetched_at` - When the image was produced
    pub fn put(
        &mut self,
        id: &str,
        png: Bytes,
        edition: NaiveDate,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Source id cannot be empty".to_string(),
            ));
        }
        if id.len() > MAX_SOURCE_ID_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Source id exceeds maximum length of {} bytes",
                MAX_SOURCE_ID_LENGTH
            )));
        }

        self.entries
            .insert(id.to_string(), CacheEntry::new(png, edition, fetched_at));
        self.stats.record_update();
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Returns the PNG bytes for a source.
    ///
    /// The returned `Bytes` is a cheap clone of the stored buffer.
    pub fn get(&self, id: &str) -> Result<Bytes> {
        self.entries
            .get(id)
            .map(|entry| entry.png.clone())
            .ok_or_else(|| CacheError::NotAvailable(id.to_string()))
    }

    // == Entry ==
    /// Returns the full entry for a source, if any.
    pub fn entry(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    // == Has ==
    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    // == Record Exhausted ==
    /// Counts a source refresh that found no usable edition.
    ///
    /// The existing entry for the source, if any, is left in place.
    pub fn record_exhausted(&mut self) {
        self.stats.record_exhausted();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
