//! Request validation pipeline.
//!
//! Runs URL policy, fetch, certificate, signature and freshness checks in
//! that order and stops at the first failure. Each validation is independent;
//! nothing is cached between requests.

use std::{fmt, sync::Arc};

use skillgate_core::{
    Clock, GateError, IncomingRequest, Result, SystemClock, ValidatorConfig, Verdict,
};
use tracing::{debug, instrument, warn};

use crate::{
    cert_url::{AllowListPolicy, CertUrlPolicy},
    certificate::SigningCertificate,
    fetch::{CertificateFetcher, HttpCertificateFetcher},
    freshness::FreshnessWindow,
    signature::verify_body_signature,
};

/// Decides whether an inbound request really comes from the platform.
///
/// Cheap to clone; all parts are shared behind `Arc`.
#[derive(Clone)]
pub struct RequestValidator {
    config: Arc<ValidatorConfig>,
    policy: Arc<dyn CertUrlPolicy>,
    fetcher: Arc<dyn CertificateFetcher>,
    clock: Arc<dyn Clock>,
    freshness: FreshnessWindow,
}

impl fmt::Debug for RequestValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestValidator")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl RequestValidator {
    /// Creates a validator with the HTTPS fetcher, the allow-list policy and
    /// the system clock.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let fetcher = HttpCertificateFetcher::new(&config)?;
        let policy = AllowListPolicy::from_config(&config);

        Ok(Self::with_parts(config, Arc::new(policy), Arc::new(fetcher), Arc::new(SystemClock)))
    }

    /// Creates a validator from explicit parts.
    pub fn with_parts(
        config: ValidatorConfig,
        policy: Arc<dyn CertUrlPolicy>,
        fetcher: Arc<dyn CertificateFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let freshness = FreshnessWindow::new(config.freshness_window);
        Self { config: Arc::new(config), policy, fetcher, clock, freshness }
    }

    /// Configuration this validator enforces.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates `request` and returns a single verdict.
    #[instrument(name = "validate_request", skip_all)]
    pub async fn validate(&self, request: &IncomingRequest) -> Verdict {
        if self.config.skip_validation {
            warn!("Request validation is disabled, accepting without checks");
            return Verdict::Accept;
        }

        let verdict = Verdict::from(self.run(request).await);
        log_verdict(&verdict);
        verdict
    }

    async fn run(&self, request: &IncomingRequest) -> Result<()> {
        let url = request.signature_cert_chain_url().unwrap_or_default();
        if !self.policy.is_allowed(url) {
            return Err(GateError::policy_violation(url));
        }

        let pem = self.fetcher.fetch(url).await?;

        let certificate = SigningCertificate::from_pem(&pem)?;
        certificate.check_identity(self.clock.now_utc(), &self.config.required_subject_name)?;

        let signature =
            request.signature().ok_or_else(|| GateError::signature("missing Signature header"))?;
        verify_body_signature(certificate.public_key(), signature, request.body())?;

        self.freshness.check(request.claimed_timestamp(), self.clock.now_utc())
    }
}

fn log_verdict(verdict: &Verdict) {
    match verdict.error() {
        None => debug!("Request accepted"),
        Some(error) => warn!(
            code = error.code(),
            kind = %error.kind(),
            reason = %error,
            "Request rejected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use http::{HeaderMap, HeaderValue};
    use skillgate_core::TestClock;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CertificateFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GateError::transport("connection refused"))
        }
    }

    fn request_with_url(url: &'static str) -> IncomingRequest {
        let mut headers = HeaderMap::new();
        headers.insert("signaturecertchainurl", HeaderValue::from_static(url));
        headers.insert("signature", HeaderValue::from_static("c2lnbmF0dXJl"));
        IncomingRequest::new(headers, Bytes::from_static(b"{}"), Utc::now())
    }

    fn validator(config: ValidatorConfig, fetcher: Arc<CountingFetcher>) -> RequestValidator {
        let policy = AllowListPolicy::from_config(&config);
        RequestValidator::with_parts(config, Arc::new(policy), fetcher, Arc::new(TestClock::new()))
    }

    #[tokio::test]
    async fn missing_url_header_is_policy_violation() {
        let fetcher = Arc::new(CountingFetcher::default());
        let validator = validator(ValidatorConfig::default(), fetcher.clone());
        let request = IncomingRequest::new(HeaderMap::new(), Bytes::new(), Utc::now());

        let verdict = validator.validate(&request).await;

        assert!(matches!(verdict, Verdict::Reject(GateError::PolicyViolation { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_transport_failure() {
        let fetcher = Arc::new(CountingFetcher::default());
        let validator = validator(ValidatorConfig::default(), fetcher.clone());
        let request = request_with_url("https://s3.amazonaws.com/echo.api/echo-api-cert.pem");

        let verdict = validator.validate(&request).await;

        assert!(matches!(verdict, Verdict::Reject(GateError::TransportFailure { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn skip_validation_accepts_without_fetching() {
        let fetcher = Arc::new(CountingFetcher::default());
        let config = ValidatorConfig { skip_validation: true, ..Default::default() };
        let validator = validator(config, fetcher.clone());
        let request = request_with_url("http://evil.example.com/cert.pem");

        assert_eq!(validator.validate(&request).await, Verdict::Accept);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
