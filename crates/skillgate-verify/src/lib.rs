//! Authenticity and freshness checks for inbound skill requests.
//!
//! A request is accepted only when every step passes, in order:
//!
//! 1. **Certificate URL** - the `SignatureCertChainUrl` header must point at
//!    the allow-listed host and path ([`cert_url`]).
//! 2. **Fetch** - the certificate is downloaded with a bounded timeout
//!    ([`fetch`]).
//! 3. **Certificate** - PEM/X.509 decode, validity window and subject
//!    alternative name ([`certificate`]).
//! 4. **Signature** - RSA PKCS#1 v1.5 over the SHA-1 digest of the raw body
//!    ([`signature`]).
//! 5. **Freshness** - the claimed timestamp must be within the replay window
//!    ([`freshness`]).
//!
//! [`RequestValidator`] runs the steps and turns the first failure into a
//! [`Verdict::Reject`](skillgate_core::Verdict). Every failure is final; no
//! step is retried.
//!
//! # Example
//!
//! ```no_run
//! use skillgate_core::{IncomingRequest, ValidatorConfig};
//! use skillgate_verify::RequestValidator;
//!
//! # async fn example(request: IncomingRequest) -> Result<(), skillgate_core::GateError> {
//! let validator = RequestValidator::new(ValidatorConfig::default())?;
//! let verdict = validator.validate(&request).await;
//! if let Some(reason) = verdict.reason() {
//!     eprintln!("dropping request: {reason}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cert_url;
pub mod certificate;
pub mod fetch;
pub mod freshness;
pub mod signature;
pub mod validator;

pub use cert_url::{AllowListPolicy, CertUrlPolicy};
pub use certificate::{CertificateKey, SigningCertificate};
pub use fetch::{CertificateFetcher, HttpCertificateFetcher};
pub use freshness::FreshnessWindow;
pub use validator::RequestValidator;
