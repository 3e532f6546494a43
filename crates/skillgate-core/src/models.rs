//! Request, configuration and verdict types.
//!
//! `IncomingRequest` is the immutable capture of an inbound POST: headers,
//! the fully buffered body, and the timestamp the sender claims. The body is
//! a reference-counted `Bytes`, so the digest pass and the application
//! handler read the same buffer.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::{error::GateError, CERT_CHAIN_URL_HEADER, SIGNATURE_HEADER};

/// Host serving the platform's signing certificates.
pub const DEFAULT_CERT_HOST: &str = "s3.amazonaws.com";

/// Path every signing certificate URL must start with.
pub const DEFAULT_CERT_PATH_PREFIX: &str = "/echo.api/";

/// Subject alternative name the signing certificate must carry.
pub const DEFAULT_SUBJECT_NAME: &str = "echo-api.amazon.com";

/// Default bound on the certificate fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default replay window.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(150);

/// Inbound request captured for validation.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    headers: HeaderMap,
    body: Bytes,
    claimed_timestamp: DateTime<Utc>,
}

impl IncomingRequest {
    /// Captures a request from its parts.
    pub fn new(headers: HeaderMap, body: Bytes, claimed_timestamp: DateTime<Utc>) -> Self {
        Self { headers, body, claimed_timestamp }
    }

    /// Looks up a header by name (case-insensitive). Non-UTF-8 values are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// URL of the signing certificate chain, if supplied.
    pub fn signature_cert_chain_url(&self) -> Option<&str> {
        self.header(CERT_CHAIN_URL_HEADER)
    }

    /// Base64 body signature, if supplied.
    pub fn signature(&self) -> Option<&str> {
        self.header(SIGNATURE_HEADER)
    }

    /// All captured headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes exactly as received.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Timestamp the sender claims the request was issued at.
    pub fn claimed_timestamp(&self) -> DateTime<Utc> {
        self.claimed_timestamp
    }
}

/// Policy the validator enforces.
///
/// Constructed once at startup and shared read-only across validations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Only host certificate URLs may point at. `host:443` is equivalent.
    pub allowed_cert_host: String,
    /// Required prefix of the certificate URL path.
    pub allowed_cert_path_prefix: String,
    /// Subject alternative name the certificate must carry.
    pub required_subject_name: String,
    /// Upper bound on the certificate fetch.
    pub fetch_timeout: Duration,
    /// Disables TLS verification of the certificate host. Test-only.
    pub insecure_skip_verify: bool,
    /// Maximum distance between the claimed timestamp and now.
    pub freshness_window: Duration,
    /// Accepts every request without checks. Test-only.
    pub skip_validation: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allowed_cert_host: DEFAULT_CERT_HOST.to_string(),
            allowed_cert_path_prefix: DEFAULT_CERT_PATH_PREFIX.to_string(),
            required_subject_name: DEFAULT_SUBJECT_NAME.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            insecure_skip_verify: false,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            skip_validation: false,
        }
    }
}

/// Outcome of validating one request.
///
/// A rejection always carries the error that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Verdict {
    /// Request is authentic and fresh.
    Accept,
    /// Request must be dropped.
    Reject(GateError),
}

impl Verdict {
    /// Returns true for `Accept`.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Human-readable rejection reason for logs.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Accept => None,
            Self::Reject(error) => Some(error.to_string()),
        }
    }

    /// The rejection error, if any.
    pub fn error(&self) -> Option<&GateError> {
        match self {
            Self::Accept => None,
            Self::Reject(error) => Some(error),
        }
    }

    /// Converts into a `Result` for `?` propagation.
    pub fn into_result(self) -> Result<(), GateError> {
        match self {
            Self::Accept => Ok(()),
            Self::Reject(error) => Err(error),
        }
    }
}

impl From<Result<(), GateError>> for Verdict {
    fn from(result: Result<(), GateError>) -> Self {
        match result {
            Ok(()) => Self::Accept,
            Err(error) => Self::Reject(error),
        }
    }
}
