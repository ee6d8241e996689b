//! Per-source refresh with date lookback.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use chrono_tz::Tz;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::config::{ImageLimits, Settings, SourceSpec};
use crate::error::{FetchError, RefreshError};
use crate::pipeline::fetch::DocumentFetcher;
use crate::pipeline::render::PageRenderer;
use crate::pipeline::transform::{encode_png, transform};

/// Result of one pass over all sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// Fetches, renders and caches front pages.
pub struct FetchPipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    renderer: Arc<dyn PageRenderer>,
    clock: Arc<dyn Clock>,
    limits: ImageLimits,
    timezone: Tz,
    max_lookback_days: u32,
    fetch_timeout: Duration,
}

impl FetchPipeline {
    pub fn new(
        settings: &Settings,
        fetcher: Arc<dyn DocumentFetcher>,
        renderer: Arc<dyn PageRenderer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            clock,
            limits: settings.image,
            timezone: settings.refresh.timezone,
            max_lookback_days: settings.max_lookback_days,
            fetch_timeout: settings.fetch_timeout,
        }
    }

    /// Edition dates to try, newest first, starting from today in the
    /// refresh timezone.
    pub fn candidate_dates(&self) -> Vec<NaiveDate> {
        let today = self.clock.now().with_timezone(&self.timezone).date_naive();
        (0..self.max_lookback_days)
            .filter_map(|days_ago| today.checked_sub_days(Days::new(u64::from(days_ago))))
            .collect()
    }

    /// Refreshes every source in configured order.
    ///
    /// Failures are logged per source and never abort the pass.
    pub async fn refresh_all(&self, sources: &[SourceSpec], cache: &Arc<RwLock<CacheStore>>) -> PassSummary {
        let mut summary = PassSummary::default();
        for source in sources {
            match self.refresh_source(source, cache).await {
                Ok(_) => summary.refreshed += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Tries each candidate date until one yields an image, then stores it.
    ///
    /// Returns the edition date that was cached. On exhaustion the existing
    /// cache entry is kept.
    pub async fn refresh_source(
        &self,
        source: &SourceSpec,
        cache: &Arc<RwLock<CacheStore>>,
    ) -> Result<NaiveDate, RefreshError> {
        let dates = self.candidate_dates();

        for date in &dates {
            let url = source.url_for(*date);
            info!(source = %source.id, %date, "Fetching {}", url);

            let png = match self.produce(source, &url).await {
                Ok(png) => png,
                Err(e) => {
                    warn!(source = %source.id, %date, "Attempt failed: {}", e);
                    continue;
                }
            };

            let size = png.len();
            let stored = {
                let mut guard = cache.write().await;
                guard.put(&source.id, png, *date, self.clock.now())
            };
            if let Err(e) = stored {
                error!(source = %source.id, "Cache rejected image: {}", e);
                return Err(RefreshError::Rejected {
                    source_id: source.id.clone(),
                    reason: e.to_string(),
                });
            }

            info!(source = %source.id, %date, bytes = size, "Finished fetching {}", url);
            return Ok(*date);
        }

        error!(
            source = %source.id,
            attempts = dates.len(),
            "No edition available, keeping previous image"
        );
        cache.write().await.record_exhausted();

        Err(RefreshError::ExhaustedLookback {
            source_id: source.id.clone(),
            attempts: dates.len() as u32,
        })
    }

    /// One attempt: download, render, crop/resize and encode.
    async fn produce(&self, source: &SourceSpec, url: &str) -> Result<axum::body::Bytes, FetchError> {
        let doc = self.bounded(self.fetcher.fetch(url)).await?;
        if !doc.is_success() {
            return Err(FetchError::HttpStatus(doc.status));
        }

        let page = self
            .bounded(self.renderer.render_first_page(doc.body, self.limits.dpi))
            .await?;

        let crop = source.crop;
        let limits = self.limits;
        tokio::task::spawn_blocking(move || encode_png(&transform(page, crop.as_ref(), &limits)))
            .await
            .map_err(|e| FetchError::Image(format!("transform task failed: {e}")))?
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T, FetchError>>) -> Result<T, FetchError> {
        tokio::time::timeout(self.fetch_timeout, fut)
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout.as_secs()))?
    }
}
