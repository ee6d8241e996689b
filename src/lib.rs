//! Front Page Cache - daily newspaper front pages served in rotation
//!
//! Fetches each configured front page PDF once a day, renders the first page
//! to a cropped and resized PNG, keeps the latest image per source in memory
//! and serves them round-robin over HTTP.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod tasks;

pub use api::AppState;
pub use config::Settings;
pub use tasks::spawn_refresh_task;
