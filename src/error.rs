//! Error types for the front page server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Config Error ==
/// Invalid settings. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// == Fetch Error ==
/// Failure of a single fetch attempt for one candidate date.
///
/// Every variant is recoverable by the lookback loop.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The attempt exceeded the configured timeout
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// The server answered with a non-success status
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// The document could not be rasterized
    #[error("Render error: {0}")]
    Render(String),

    /// Crop, resize or PNG encoding failed
    #[error("Image error: {0}")]
    Image(String),
}

// == Refresh Error ==
/// Outcome of a source refresh where no candidate date produced an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("All {attempts} lookback attempts failed for source {source_id}")]
    ExhaustedLookback { source_id: String, attempts: u32 },

    /// The cache refused the produced image
    #[error("Cache rejected image for source {source_id}: {reason}")]
    Rejected { source_id: String, reason: String },
}

// == Cache Error Enum ==
/// Errors surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No image has been produced for the source yet
    #[error("Front page not yet available: {0}")]
    NotAvailable(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache and HTTP operations.
pub type Result<T> = std::result::Result<T, CacheError>;
