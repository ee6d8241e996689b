//! API Module
//!
//! HTTP handlers and routing for the front page server.
//!
//! # Endpoints
//! - `GET /` - Front page of the next source in rotation (PNG)
//! - `GET /stats` - Refresh counters and per-source cache state
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
