//! Daily Refresh Task
//!
//! Runs a refresh pass at startup, then once a day at the configured
//! wall-clock time in the configured timezone.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::config::{RefreshSpec, SourceSpec};
use crate::pipeline::{FetchPipeline, PassSummary};

/// Step used to walk out of a DST gap.
const GAP_STEP_MINUTES: i64 = 15;

// == Delay Computation ==

/// Next instant at which the refresh time occurs, at or after `now`.
///
/// Today's `HH:MM` is used unless it already passed, in which case
/// tomorrow's is. The offset is the one in effect at the target instant.
pub fn next_refresh(now: DateTime<Utc>, spec: &RefreshSpec) -> DateTime<Tz> {
    let local_now = now.with_timezone(&spec.timezone);
    let today = local_now.date_naive();

    let target = resolve_local(today, spec);
    if target >= local_now {
        return target;
    }

    match today.succ_opt() {
        Some(tomorrow) => resolve_local(tomorrow, spec),
        None => target,
    }
}

/// Time remaining until the next refresh.
pub fn get_delay(now: DateTime<Utc>, spec: &RefreshSpec) -> Duration {
    (next_refresh(now, spec).with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Maps a local date and the refresh time to an instant.
///
/// Ambiguous times (clocks falling back) take the earlier instant. Times
/// skipped by a spring-forward gap move to the first valid time after it.
fn resolve_local(date: NaiveDate, spec: &RefreshSpec) -> DateTime<Tz> {
    let mut naive = date.and_time(spec.time);
    loop {
        match spec.timezone.from_local_datetime(&naive) {
            LocalResult::Single(t) => return t,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => naive += chrono::Duration::minutes(GAP_STEP_MINUTES),
        }
    }
}

// == Scheduler ==

/// Drives refresh passes over all sources.
#[derive(Clone)]
pub struct RefreshScheduler {
    pipeline: Arc<FetchPipeline>,
    sources: Arc<Vec<SourceSpec>>,
    cache: Arc<RwLock<CacheStore>>,
    spec: RefreshSpec,
    clock: Arc<dyn Clock>,
}

impl RefreshScheduler {
    pub fn new(
        pipeline: Arc<FetchPipeline>,
        sources: Vec<SourceSpec>,
        cache: Arc<RwLock<CacheStore>>,
        spec: RefreshSpec,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pipeline,
            sources: Arc::new(sources),
            cache,
            spec,
            clock,
        }
    }

    /// Refreshes every source once.
    ///
    /// The pass runs on its own task so a panic inside it is logged instead
    /// of taking the schedule down with it.
    pub async fn run_pass(&self) -> PassSummary {
        let pipeline = Arc::clone(&self.pipeline);
        let sources = Arc::clone(&self.sources);
        let cache = Arc::clone(&self.cache);

        info!("Refreshing {} sources", sources.len());
        let mut pass = AbortOnDrop(tokio::spawn(async move {
            pipeline.refresh_all(&sources, &cache).await
        }));

        match (&mut pass.0).await {
            Ok(summary) => {
                info!(
                    refreshed = summary.refreshed,
                    failed = summary.failed,
                    "Refresh pass complete"
                );
                summary
            }
            Err(e) => {
                error!("Refresh pass aborted: {}", e);
                PassSummary {
                    refreshed: 0,
                    failed: self.sources.len(),
                }
            }
        }
    }

    /// Delay until the next pass, never re-targeting an instant already fired.
    fn arm(&self, last_fired: Option<DateTime<Utc>>) -> (DateTime<Utc>, Duration) {
        let now = self.clock.now();
        let mut target = next_refresh(now, &self.spec).with_timezone(&Utc);

        if let Some(prev) = last_fired {
            if target <= prev {
                target = next_refresh(prev + chrono::Duration::seconds(1), &self.spec)
                    .with_timezone(&Utc);
            }
        }

        let delay = (target - now).to_std().unwrap_or(Duration::ZERO);
        (target, delay)
    }
}

/// Spawns the refresh loop.
///
/// The loop runs an initial pass immediately, then sleeps until the next
/// refresh time, runs a pass, and re-arms, regardless of how the pass went.
/// Sending `true` on `shutdown` (or dropping the sender) stops it, including
/// mid-pass.
///
/// # Returns
/// A JoinHandle that completes once the loop has stopped.
pub fn spawn_refresh_task(scheduler: RefreshScheduler, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting refresh scheduler for {} sources, daily at {} {}",
            scheduler.sources.len(),
            scheduler.spec.time.format("%H:%M"),
            scheduler.spec.timezone
        );

        let mut last_fired = None;
        loop {
            tokio::select! {
                _ = scheduler.run_pass() => {}
                _ = stopped(&mut shutdown) => break,
            }

            let (target, delay) = scheduler.arm(last_fired);
            info!("Refresh scheduled {} seconds from now...", delay.as_secs());
            debug!(%target, "Next refresh instant");

            tokio::select! {
                _ = tokio::time::sleep(delay) => last_fired = Some(target),
                _ = stopped(&mut shutdown) => break,
            }
        }

        info!("Refresh scheduler stopped");
    })
}

/// Aborts the wrapped task when a pass is abandoned on shutdown.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender means nobody can ask for a stop any more; treat it as one.
    let _ = shutdown.wait_for(|stop| *stop).await;
}
