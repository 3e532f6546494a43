//! Stub collaborators for `RequestValidator::with_parts`.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use skillgate_core::{GateError, Result};
use skillgate_verify::{CertUrlPolicy, CertificateFetcher};

/// Fetcher returning a fixed response and counting calls.
#[derive(Debug)]
pub struct StubFetcher {
    response: Result<Bytes>,
    calls: AtomicUsize,
    last_url: Mutex<Option<String>>,
}

impl StubFetcher {
    /// Serves `pem` for every URL.
    pub fn serving(pem: impl Into<Bytes>) -> Self {
        Self::with_response(Ok(pem.into()))
    }

    /// Fails every fetch with a transport error.
    pub fn failing(message: &str) -> Self {
        Self::with_response(Err(GateError::transport(message)))
    }

    fn with_response(response: Result<Bytes>) -> Self {
        Self { response, calls: AtomicUsize::new(0), last_url: Mutex::new(None) }
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URL of the most recent fetch.
    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().ok().and_then(|url| url.clone())
    }
}

#[async_trait]
impl CertificateFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_url.lock() {
            *last = Some(url.to_string());
        }
        self.response.clone()
    }
}

/// Policy accepting every URL, for isolating later pipeline stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAnyUrl;

impl CertUrlPolicy for AllowAnyUrl {
    fn is_allowed(&self, _url: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_counts_calls_and_records_url() {
        let fetcher = StubFetcher::serving("pem");

        let body = fetcher.fetch("https://example.com/cert.pem").await.unwrap();

        assert_eq!(body.as_ref(), b"pem");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fetcher.last_url().as_deref(), Some("https://example.com/cert.pem"));
    }

    #[tokio::test]
    async fn failing_stub_returns_transport_error() {
        let fetcher = StubFetcher::failing("connection reset");
        let err = fetcher.fetch("https://example.com/cert.pem").await.unwrap_err();

        assert_eq!(err.code(), "E1002");
    }
}
