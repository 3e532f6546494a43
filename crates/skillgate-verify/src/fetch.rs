//! Retrieval of the signing certificate.
//!
//! The fetch is bounded in time (connect plus read) and in size, follows no
//! redirects and treats any non-2xx status as a transport failure. The URL has
//! already passed the allow-list when it reaches this module.

use std::time::Instant;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use skillgate_core::{GateError, Result, ValidatorConfig};
use tracing::{debug, info_span, warn, Instrument};

/// Largest certificate body accepted. Real signing chains are a few KiB.
pub const MAX_CERTIFICATE_BYTES: usize = 256 * 1024;

const USER_AGENT: &str = concat!("skillgate/", env!("CARGO_PKG_VERSION"));

/// Source of PEM certificate bytes for an allow-listed URL.
#[async_trait]
pub trait CertificateFetcher: Send + Sync + std::fmt::Debug {
    /// Retrieves the raw bytes served at `url`.
    ///
    /// # Errors
    ///
    /// Returns `GateError::TransportFailure` when the bytes cannot be
    /// obtained within the configured bound.
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// HTTPS fetcher backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpCertificateFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpCertificateFetcher {
    /// Builds a fetcher honouring the configured timeout and TLS policy.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: &ValidatorConfig) -> Result<Self> {
        if config.insecure_skip_verify {
            warn!("TLS verification of the certificate host is disabled");
        }

        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(config.fetch_timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| GateError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout_secs: config.fetch_timeout.as_secs() })
    }

    fn categorize(&self, error: &reqwest::Error) -> GateError {
        if error.is_timeout() {
            GateError::transport(format!("timed out after {}s", self.timeout_secs))
        } else if error.is_connect() {
            GateError::transport(format!("connection failed: {error}"))
        } else {
            GateError::transport(error.to_string())
        }
    }
}

#[async_trait]
impl CertificateFetcher for HttpCertificateFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let span = info_span!("certificate_fetch", url = %url);

        async move {
            let start = Instant::now();

            let mut response =
                self.client.get(url).send().await.map_err(|e| self.categorize(&e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(GateError::transport(format!("unexpected status {status}")));
            }

            if response.content_length().is_some_and(|len| len > MAX_CERTIFICATE_BYTES as u64) {
                return Err(GateError::transport("certificate exceeds size limit"));
            }

            let mut body = BytesMut::new();
            while let Some(chunk) = response.chunk().await.map_err(|e| self.categorize(&e))? {
                if body.len() + chunk.len() > MAX_CERTIFICATE_BYTES {
                    return Err(GateError::transport("certificate exceeds size limit"));
                }
                body.extend_from_slice(&chunk);
            }

            debug!(
                bytes = body.len(),
                duration_ms = start.elapsed().as_millis(),
                "Fetched signing certificate"
            );

            Ok(body.freeze())
        }
        .instrument(span)
        .await
    }
}
