//! PEM/X.509 decoding and the identity checks on the signing certificate.
//!
//! Only the leaf certificate is inspected: the first PEM block must be a
//! `CERTIFICATE`, its validity window must contain "now", and its subject
//! alternative names must include the platform's DNS name exactly.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rsa::{pkcs8::DecodePublicKey, RsaPublicKey};
use skillgate_core::{GateError, IdentityFailure, Result};
use x509_parser::{
    certificate::X509Certificate,
    extensions::GeneralName,
    pem::parse_x509_pem,
    public_key::PublicKey,
    time::ASN1Time,
    x509::SubjectPublicKeyInfo,
};

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Public key carried by the signing certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateKey {
    /// RSA key, the only kind the platform signs with.
    Rsa(RsaPublicKey),
    /// Any other key algorithm, kept so the signature step can report it.
    Unsupported {
        /// Dotted OID of the key algorithm
        algorithm: String,
    },
}

/// Owned view of a parsed signing certificate.
#[derive(Debug, Clone)]
pub struct SigningCertificate {
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    subject_alt_names: BTreeSet<String>,
    public_key: CertificateKey,
}

impl SigningCertificate {
    /// Decodes the first PEM block and parses it as X.509.
    ///
    /// # Errors
    ///
    /// Returns `GateError::MalformedCertificate` when no PEM block is found,
    /// the block is not a certificate, or the DER does not parse.
    pub fn from_pem(bytes: &[u8]) -> Result<Self> {
        let (_, pem) = parse_x509_pem(bytes)
            .map_err(|e| GateError::malformed_certificate(format!("no PEM block found: {e}")))?;

        if pem.label != PEM_CERTIFICATE_LABEL {
            return Err(GateError::malformed_certificate(format!(
                "unexpected PEM block {}",
                pem.label
            )));
        }

        let cert = pem
            .parse_x509()
            .map_err(|e| GateError::malformed_certificate(format!("invalid X.509: {e}")))?;

        Self::from_x509(&cert)
    }

    fn from_x509(cert: &X509Certificate<'_>) -> Result<Self> {
        let validity = cert.validity();
        let not_before = to_utc(&validity.not_before)?;
        let not_after = to_utc(&validity.not_after)?;

        let subject_alt_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect(),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                return Err(GateError::malformed_certificate(format!(
                    "invalid subject alternative name extension: {e}"
                )))
            },
        };

        let public_key = decode_key(cert.public_key())?;

        Ok(Self { not_before, not_after, subject_alt_names, public_key })
    }

    /// Checks the validity window and the subject alternative name.
    ///
    /// Both window bounds are inclusive and compared at whole-second
    /// resolution, the resolution of X.509 validity times.
    ///
    /// # Errors
    ///
    /// Returns `GateError::IdentityMismatch` naming the first failed check.
    pub fn check_identity(&self, now: DateTime<Utc>, required_name: &str) -> Result<()> {
        let now = now.timestamp();

        if now < self.not_before.timestamp() {
            return Err(IdentityFailure::NotYetValid { not_before: self.not_before }.into());
        }

        if now > self.not_after.timestamp() {
            return Err(IdentityFailure::Expired { not_after: self.not_after }.into());
        }

        if !self.subject_alt_names.contains(required_name) {
            return Err(
                IdentityFailure::SubjectNameAbsent { expected: required_name.to_string() }.into()
            );
        }

        Ok(())
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of the validity window.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// DNS subject alternative names.
    pub fn subject_alt_names(&self) -> &BTreeSet<String> {
        &self.subject_alt_names
    }

    /// Public key the body signature is verified against.
    pub fn public_key(&self) -> &CertificateKey {
        &self.public_key
    }
}

fn to_utc(time: &ASN1Time) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| GateError::malformed_certificate("validity time out of range"))
}

fn decode_key(spki: &SubjectPublicKeyInfo<'_>) -> Result<CertificateKey> {
    match spki.parsed() {
        Ok(PublicKey::RSA(_)) => RsaPublicKey::from_public_key_der(spki.raw)
            .map(CertificateKey::Rsa)
            .map_err(|e| GateError::malformed_certificate(format!("invalid RSA key: {e}"))),
        Ok(_) | Err(_) => Ok(CertificateKey::Unsupported {
            algorithm: spki.algorithm.algorithm.to_id_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn window_certificate(
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> SigningCertificate {
        SigningCertificate {
            not_before,
            not_after,
            subject_alt_names: BTreeSet::from(["echo-api.amazon.com".to_string()]),
            public_key: CertificateKey::Unsupported { algorithm: "1.2.840.10045.2.1".to_string() },
        }
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).map(|t| t.with_timezone(&Utc)).unwrap()
    }

    #[test]
    fn validity_bounds_compare_whole_seconds() {
        let not_before = at("2026-03-01T00:00:00Z");
        let not_after = at("2026-03-31T00:00:00Z");
        let cert = window_certificate(not_before, not_after);

        let late_in_last_second = not_after + TimeDelta::milliseconds(400);
        assert!(cert.check_identity(late_in_last_second, "echo-api.amazon.com").is_ok());
        assert!(cert.check_identity(not_before, "echo-api.amazon.com").is_ok());

        let next_second = not_after + TimeDelta::seconds(1);
        assert!(matches!(
            cert.check_identity(next_second, "echo-api.amazon.com"),
            Err(GateError::IdentityMismatch(IdentityFailure::Expired { .. }))
        ));

        let before_start = not_before - TimeDelta::milliseconds(1);
        assert!(matches!(
            cert.check_identity(before_start, "echo-api.amazon.com"),
            Err(GateError::IdentityMismatch(IdentityFailure::NotYetValid { .. }))
        ));
    }

    #[test]
    fn empty_input_has_no_pem_block() {
        let err = SigningCertificate::from_pem(b"").unwrap_err();
        assert_eq!(err.code(), "E1003");
    }

    #[test]
    fn plain_text_has_no_pem_block() {
        let err = SigningCertificate::from_pem(b"<html>Access Denied</html>").unwrap_err();
        assert!(matches!(err, GateError::MalformedCertificate { .. }));
    }

    #[test]
    fn pem_with_wrong_label_is_rejected() {
        let pem = b"-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
        let err = SigningCertificate::from_pem(pem).unwrap_err();

        assert!(matches!(err, GateError::MalformedCertificate { .. }));
    }

    #[test]
    fn certificate_block_with_garbage_der_is_rejected() {
        let pem = b"-----BEGIN CERTIFICATE-----\nZ2FyYmFnZQ==\n-----END CERTIFICATE-----\n";
        let err = SigningCertificate::from_pem(pem).unwrap_err();

        assert!(err.to_string().contains("invalid X.509"));
    }
}
