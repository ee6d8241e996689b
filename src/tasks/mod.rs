//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the server.
//!
//! # Tasks
//! - Daily refresh: re-fetches every front page at the configured time

mod scheduler;

pub use scheduler::{get_delay, next_refresh, spawn_refresh_task, RefreshScheduler};
