//! Core domain types for the skill request gate.
//!
//! Provides the captured inbound request, the validator configuration, the
//! verdict produced once per request, and the error taxonomy every other
//! crate reports failures through.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod time;

pub use error::{ErrorKind, GateError, IdentityFailure, Result};
pub use models::{IncomingRequest, ValidatorConfig, Verdict};
pub use time::{Clock, SystemClock, TestClock};

/// Header carrying the URL of the signing certificate chain.
pub const CERT_CHAIN_URL_HEADER: &str = "SignatureCertChainUrl";

/// Header carrying the base64-encoded body signature.
pub const SIGNATURE_HEADER: &str = "Signature";
