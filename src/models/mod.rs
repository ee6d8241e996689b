//! Response models for the front page server API
//!
//! JSON bodies of the status endpoints. The front page itself is served as
//! raw PNG bytes.

pub mod responses;

// Re-export commonly used types
pub use responses::{HealthResponse, SourceStatus, StatsResponse};
