#![no_main]

//! Fuzz target for certificate parsing and identity checks.
//!
//! Whatever the fetched bytes are, parsing either yields a certificate or a
//! `MalformedCertificate` error, and the identity and signature checks on a
//! parsed certificate return errors rather than panicking.

use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use skillgate_core::{models::DEFAULT_SUBJECT_NAME, GateError};
use skillgate_verify::{signature::verify_body_signature, SigningCertificate};

fuzz_target!(|data: &[u8]| {
    match SigningCertificate::from_pem(data) {
        Ok(certificate) => {
            let _ = certificate.check_identity(Utc::now(), DEFAULT_SUBJECT_NAME);
            let _ = verify_body_signature(certificate.public_key(), "AAAA", data);
        },
        Err(err) => {
            assert!(
                matches!(err, GateError::MalformedCertificate { .. }),
                "unexpected error kind: {err:?}"
            );
        },
    }
});
