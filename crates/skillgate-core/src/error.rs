//! Error taxonomy for request authentication.
//!
//! Every rejection the gate can produce is a `GateError` variant with a
//! stable code and a coarse `ErrorKind` used by the HTTP layer to pick the
//! response status. `Display` output is the log reason; it is never shown to
//! the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using `GateError`.
pub type Result<T> = std::result::Result<T, GateError>;

/// Reasons a certificate fails the temporal or identity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityFailure {
    /// Current time is before the certificate's `not_before`.
    NotYetValid {
        /// Start of the validity window
        not_before: DateTime<Utc>,
    },
    /// Current time is after the certificate's `not_after`.
    Expired {
        /// End of the validity window
        not_after: DateTime<Utc>,
    },
    /// The required name is not among the subject alternative names.
    SubjectNameAbsent {
        /// Name the certificate was expected to carry
        expected: String,
    },
}

impl fmt::Display for IdentityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetValid { not_before } => {
                write!(f, "certificate not valid before {}", not_before.to_rfc3339())
            },
            Self::Expired { not_after } => {
                write!(f, "certificate expired at {}", not_after.to_rfc3339())
            },
            Self::SubjectNameAbsent { expected } => {
                write!(f, "certificate subject alternative names do not include {expected}")
            },
        }
    }
}

/// Request authentication errors with codes for log disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    // Authenticity (E1001-E1005)
    /// Certificate chain URL missing or outside the allow-list (E1001).
    #[error("[E1001] Invalid cert URL: {url}")]
    PolicyViolation {
        /// URL as received, empty when the header was absent
        url: String,
    },

    /// Certificate could not be retrieved (E1002).
    #[error("[E1002] Certificate fetch failed: {message}")]
    TransportFailure {
        /// Underlying cause
        message: String,
    },

    /// Retrieved bytes are not a PEM-encoded X.509 certificate (E1003).
    #[error("[E1003] Malformed certificate: {reason}")]
    MalformedCertificate {
        /// Decode or parse failure
        reason: String,
    },

    /// Certificate outside its validity window or naming the wrong subject
    /// (E1004).
    #[error("[E1004] Certificate identity mismatch: {0}")]
    IdentityMismatch(IdentityFailure),

    /// Body signature missing, undecodable or not matching (E1005).
    #[error("[E1005] Signature invalid: {reason}")]
    SignatureInvalid {
        /// Verification failure
        reason: String,
    },

    // Request shape (E2001-E2004)
    /// Claimed timestamp outside the freshness window (E2001).
    #[error("[E2001] Stale request: timestamp is {skew_seconds}s away from now")]
    StaleRequest {
        /// Absolute distance between claimed timestamp and now
        skew_seconds: i64,
    },

    /// Payload could not be read or decoded (E2002).
    #[error("[E2002] Malformed request: {reason}")]
    MalformedRequest {
        /// Decode failure
        reason: String,
    },

    /// Envelope names an application this gate does not serve (E2003).
    #[error("[E2003] Application id mismatch: {application_id}")]
    ApplicationMismatch {
        /// Application id found in the envelope
        application_id: String,
    },

    /// No skill is registered under the requested path (E2004).
    #[error("[E2004] Unknown skill: {skill}")]
    UnknownSkill {
        /// Skill path segment as requested
        skill: String,
    },

    // System (E3001)
    /// Validator could not be constructed (E3001).
    #[error("[E3001] Configuration error: {message}")]
    Configuration {
        /// What was wrong
        message: String,
    },
}

/// Coarse classification of a `GateError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Certificate URL not allow-listed.
    PolicyViolation,
    /// Network failure while fetching the certificate.
    TransportFailure,
    /// PEM or X.509 decode failure.
    MalformedCertificate,
    /// Expired, not yet valid, or wrong subject name.
    IdentityMismatch,
    /// Signature failed to verify.
    SignatureInvalid,
    /// Replay window exceeded.
    StaleRequest,
    /// Payload undecodable or for another application.
    MalformedRequest,
    /// Skill path not registered.
    UnknownSkill,
    /// Gate misconfigured.
    Configuration,
}

impl GateError {
    /// Creates a policy violation for the given URL.
    pub fn policy_violation(url: impl Into<String>) -> Self {
        Self::PolicyViolation { url: url.into() }
    }

    /// Creates a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure { message: message.into() }
    }

    /// Creates a malformed certificate error.
    pub fn malformed_certificate(reason: impl Into<String>) -> Self {
        Self::MalformedCertificate { reason: reason.into() }
    }

    /// Creates a signature error.
    pub fn signature(reason: impl Into<String>) -> Self {
        Self::SignatureInvalid { reason: reason.into() }
    }

    /// Creates a malformed request error.
    pub fn malformed_request(reason: impl Into<String>) -> Self {
        Self::MalformedRequest { reason: reason.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Returns the error code (E1001-E3001).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PolicyViolation { .. } => "E1001",
            Self::TransportFailure { .. } => "E1002",
            Self::MalformedCertificate { .. } => "E1003",
            Self::IdentityMismatch(_) => "E1004",
            Self::SignatureInvalid { .. } => "E1005",
            Self::StaleRequest { .. } => "E2001",
            Self::MalformedRequest { .. } => "E2002",
            Self::ApplicationMismatch { .. } => "E2003",
            Self::UnknownSkill { .. } => "E2004",
            Self::Configuration { .. } => "E3001",
        }
    }

    /// Returns the taxonomy bucket this error belongs to.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            Self::TransportFailure { .. } => ErrorKind::TransportFailure,
            Self::MalformedCertificate { .. } => ErrorKind::MalformedCertificate,
            Self::IdentityMismatch(_) => ErrorKind::IdentityMismatch,
            Self::SignatureInvalid { .. } => ErrorKind::SignatureInvalid,
            Self::StaleRequest { .. } => ErrorKind::StaleRequest,
            Self::MalformedRequest { .. } | Self::ApplicationMismatch { .. } => {
                ErrorKind::MalformedRequest
            },
            Self::UnknownSkill { .. } => ErrorKind::UnknownSkill,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Whether the failure concerns the authenticity of the sender rather
    /// than the shape or age of the request.
    pub const fn is_authenticity_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::PolicyViolation
                | ErrorKind::TransportFailure
                | ErrorKind::MalformedCertificate
                | ErrorKind::IdentityMismatch
                | ErrorKind::SignatureInvalid
        )
    }
}

impl From<IdentityFailure> for GateError {
    fn from(failure: IdentityFailure) -> Self {
        Self::IdentityMismatch(failure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PolicyViolation => write!(f, "policy_violation"),
            Self::TransportFailure => write!(f, "transport_failure"),
            Self::MalformedCertificate => write!(f, "malformed_certificate"),
            Self::IdentityMismatch => write!(f, "identity_mismatch"),
            Self::SignatureInvalid => write!(f, "signature_invalid"),
            Self::StaleRequest => write!(f, "stale_request"),
            Self::MalformedRequest => write!(f, "malformed_request"),
            Self::UnknownSkill => write!(f, "unknown_skill"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
