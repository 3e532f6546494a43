//! Body signature verification.
//!
//! The platform signs the SHA-1 digest of the raw body with RSASSA-PKCS1-v1_5.
//! This is the platform's fixed scheme and must be reproduced exactly.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::Pkcs1v15Sign;
use sha1::{Digest, Sha1};
use skillgate_core::{GateError, Result};

use crate::certificate::CertificateKey;

/// Verifies `signature_b64` over `body` with the certificate's key.
///
/// # Errors
///
/// Returns `GateError::SignatureInvalid` when the signature does not decode,
/// the key is not RSA, or the cryptographic check fails.
pub fn verify_body_signature(key: &CertificateKey, signature_b64: &str, body: &[u8]) -> Result<()> {
    let signature = STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| GateError::signature(format!("signature is not valid base64: {e}")))?;

    if signature.is_empty() {
        return Err(GateError::signature("signature is empty"));
    }

    let public_key = match key {
        CertificateKey::Rsa(public_key) => public_key,
        CertificateKey::Unsupported { algorithm } => {
            return Err(GateError::signature(format!("certificate key {algorithm} is not RSA")));
        },
    };

    let digest = Sha1::digest(body);

    public_key
        .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &signature)
        .map_err(|_| GateError::signature("signature does not match body"))
}
