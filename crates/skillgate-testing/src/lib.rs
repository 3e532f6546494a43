//! Test infrastructure for the skill request gate.
//!
//! Provides a fixture signing authority that issues certificates and signs
//! bodies the way the platform does, stub collaborators for the validator,
//! and builders for envelopes and captured requests.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fetcher;
pub mod fixtures;

pub use fetcher::{AllowAnyUrl, StubFetcher};
pub use fixtures::{
    ecdsa_certificate_pem, request_headers, CertificateBuilder, EnvelopeBuilder, TestAuthority,
    TEST_CERT_URL,
};
pub use skillgate_core::{Clock, TestClock};
