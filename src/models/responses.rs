//! Response DTOs for the front page server API
//!
//! Defines the structure of outgoing JSON bodies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::cache::{CacheStats, CacheStore};

/// Cache state of one configured source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    /// Source identifier
    pub id: String,
    /// Whether an image is available to serve
    pub cached: bool,
    /// Edition date of the cached image
    pub edition: Option<NaiveDate>,
    /// When the cached image was produced
    pub fetched_at: Option<DateTime<Utc>>,
}

impl SourceStatus {
    /// Reads the status of `id` from the store.
    pub fn from_store(id: &str, store: &CacheStore) -> Self {
        let entry = store.entry(id);
        Self {
            id: id.to_string(),
            cached: entry.is_some(),
            edition: entry.map(|e| e.edition),
            fetched_at: entry.map(|e| e.fetched_at),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Successful image stores since startup
    pub updates: u64,
    /// Source refreshes that found no edition
    pub exhausted: u64,
    /// Sources with an image available
    pub total_entries: usize,
    /// updates / (updates + exhausted)
    pub success_rate: f64,
    /// Daily refresh time, `HH:MM`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_time: Option<String>,
    /// IANA timezone of the refresh time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Source the next front page request will be served from
    pub next_source: Option<String>,
    /// Per-source cache state in rotation order
    pub sources: Vec<SourceStatus>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, sources: Vec<SourceStatus>) -> Self {
        Self {
            updates: stats.updates,
            exhausted: stats.exhausted,
            total_entries: stats.total_entries,
            success_rate: stats.success_rate(),
            refresh_time: None,
            timezone: None,
            next_source: None,
            sources,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
