//! Document retrieval over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::Client;

use crate::error::FetchError;

/// Raw response for a document request.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub status: u16,
    pub body: Bytes,
}

impl FetchedDocument {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves documents by URL.
///
/// A non-2xx status is returned as a value, not an error. Errors are reserved
/// for transport failures.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError>;
}

/// `DocumentFetcher` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(format!("building http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(FetchedDocument { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        let doc = |status| FetchedDocument {
            status,
            body: Bytes::new(),
        };
        assert!(doc(200).is_success());
        assert!(doc(204).is_success());
        assert!(!doc(199).is_success());
        assert!(!doc(304).is_success());
        assert!(!doc(404).is_success());
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();

        // Port 9 on loopback (discard) is closed in test environments.
        let err = fetcher.fetch("http://127.0.0.1:9/front.pdf").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
