//! API Handlers
//!
//! HTTP request handlers for each front page server endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::cache::{CacheStore, RotationCursor};
use crate::config::{RefreshSpec, Settings};
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, SourceStatus, StatsResponse};

/// Header naming the source a front page was served from
pub const SOURCE_HEADER: &str = "x-frontpage-source";

/// Application state shared across all handlers.
///
/// The cache is written by the refresh task and read by handlers; the
/// rotation cursor is advanced by every front page request.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe image cache
    pub cache: Arc<RwLock<CacheStore>>,
    /// Round-robin pointer over configured sources
    pub rotation: Arc<RotationCursor>,
    /// Daily refresh schedule, reported by `/stats`
    pub refresh: Option<RefreshSpec>,
}

impl AppState {
    /// Creates a new AppState with the given cache and rotation order.
    pub fn new(cache: CacheStore, sources: Vec<String>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            rotation: Arc::new(RotationCursor::new(sources)),
            refresh: None,
        }
    }

    /// Creates a new AppState from configuration with an empty cache.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            refresh: Some(settings.refresh),
            ..Self::new(CacheStore::new(), settings.source_ids())
        }
    }
}

/// Handler for GET /
///
/// Serves the cached front page of the next source in the rotation.
/// The rotation advances even when that source has no image yet.
pub async fn front_page_handler(State(state): State<AppState>) -> Result<Response> {
    let source = state
        .rotation
        .advance()
        .ok_or_else(|| CacheError::NotAvailable("no sources configured".to_string()))?
        .to_string();

    let png = match state.cache.read().await.get(&source) {
        Ok(png) => png,
        Err(e) => {
            warn!(%source, "Front page requested before it was fetched");
            return Err(e);
        }
    };

    let mut response = (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response();
    // Ids that are not valid header text are served without the header
    if let Ok(value) = HeaderValue::try_from(source.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SOURCE_HEADER), value);
    }
    Ok(response)
}

/// Handler for GET /stats
///
/// Returns refresh counters and the cache state of every source.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    // Acquire read lock for stats
    let cache = state.cache.read().await;
    let sources = state
        .rotation
        .sources()
        .iter()
        .map(|id| SourceStatus::from_store(id, &cache))
        .collect();

    let mut response = StatsResponse::new(&cache.stats(), sources);
    response.refresh_time = state.refresh.map(|r| r.time.format("%H:%M").to_string());
    response.timezone = state.refresh.map(|r| r.timezone.name().to_string());
    response.next_source = state
        .rotation
        .sources()
        .get(state.rotation.position())
        .cloned();

    Json(response)
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
