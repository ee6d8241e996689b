//! Cache Entry Module
//!
//! A single rendered front page.

use axum::body::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

// == Cache Entry ==
/// PNG bytes for one source plus the edition they were produced from.
///
/// `Bytes` is immutable and reference counted, so a reader holding a clone
/// keeps a complete buffer even after the entry is replaced.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded PNG image
    pub png: Bytes,
    /// Edition date the document was fetched for
    pub edition: NaiveDate,
    /// When the entry was stored
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    pub fn new(png: Bytes, edition: NaiveDate, fetched_at: DateTime<Utc>) -> Self {
        Self {
            png,
            edition,
            fetched_at,
        }
    }

    /// Size of the encoded image in bytes.
    pub fn len(&self) -> usize {
        self.png.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }
}
