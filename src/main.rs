//! Front Page Cache - daily newspaper front pages served in rotation
//!
//! Binary entry point: loads settings, starts the refresh task and the
//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frontpage_cache::api::{create_router, AppState};
use frontpage_cache::clock::SystemClock;
use frontpage_cache::config::Settings;
use frontpage_cache::pipeline::{FetchPipeline, HttpFetcher, PdftoppmRenderer};
use frontpage_cache::tasks::{spawn_refresh_task, RefreshScheduler};

/// Main entry point for the front page server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate settings (fatal on error)
/// 3. Create the empty cache and rotation
/// 4. Start the refresh task (first pass runs immediately)
/// 5. Serve HTTP until SIGINT/SIGTERM, then stop the refresh task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frontpage_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Front Page Cache Server");

    let settings = Settings::from_env().context("loading configuration")?;
    info!(
        "Configuration loaded: sources={}, refresh={} {}, lookback={} days, dpi={}, max={}x{}",
        settings.sources.len(),
        settings.refresh.time.format("%H:%M"),
        settings.refresh.timezone,
        settings.max_lookback_days,
        settings.image.dpi,
        settings.image.max_width,
        settings.image.max_height
    );

    let state = AppState::from_settings(&settings);

    let clock = Arc::new(SystemClock);
    let fetcher = HttpFetcher::new(settings.fetch_timeout).context("building http client")?;
    let pipeline = FetchPipeline::new(
        &settings,
        Arc::new(fetcher),
        Arc::new(PdftoppmRenderer::new(settings.renderer.clone())),
        clock.clone(),
    );
    let scheduler = RefreshScheduler::new(
        Arc::new(pipeline),
        settings.sources.clone(),
        state.cache.clone(),
        settings.refresh,
        clock,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_handle = spawn_refresh_task(scheduler, shutdown_rx);
    info!("Refresh task started");

    let app = create_router(state);

    let addr = SocketAddr::new(settings.web.host, settings.web.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    // Stop the refresh task and wait for it to wind down
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh_handle.await {
        warn!("Refresh task ended abnormally: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
