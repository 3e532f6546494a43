//! Signing authority, certificate and envelope builders.
//!
//! `TestAuthority` holds a fixed 2048-bit RSA key. Certificates it issues are
//! self-signed with that key, so a body signed by the authority verifies
//! against any certificate it produced.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use http::{HeaderMap, HeaderName, HeaderValue};
use rcgen::{CertificateParams, KeyPair};
use rsa::{pkcs8::DecodePrivateKey, Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{json, Value};
use sha1::{Digest, Sha1};
use skillgate_core::{
    models::DEFAULT_SUBJECT_NAME, IncomingRequest, CERT_CHAIN_URL_HEADER, SIGNATURE_HEADER,
};
use time::OffsetDateTime;
use uuid::Uuid;

/// PKCS#8 PEM of the fixture signing key.
pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");

/// Allow-listed certificate URL used by default in fixtures.
pub const TEST_CERT_URL: &str = "https://s3.amazonaws.com/echo.api/echo-api-cert.pem";

/// Fixture key holder that issues certificates and signs bodies.
pub struct TestAuthority {
    private_key: RsaPrivateKey,
    key_pair: KeyPair,
}

impl std::fmt::Debug for TestAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestAuthority").finish_non_exhaustive()
    }
}

impl TestAuthority {
    /// Loads the fixture key.
    pub fn new() -> Result<Self> {
        let private_key =
            RsaPrivateKey::from_pkcs8_pem(SIGNING_KEY_PEM).context("fixture key is not PKCS#8")?;
        let key_pair = KeyPair::from_pem(SIGNING_KEY_PEM).context("fixture key rejected by rcgen")?;
        Ok(Self { private_key, key_pair })
    }

    /// Starts a certificate valid from a day ago to a day ahead, naming the
    /// platform.
    pub fn certificate(&self) -> CertificateBuilder<'_> {
        let now = Utc::now();
        CertificateBuilder {
            authority: self,
            subject_alt_names: vec![DEFAULT_SUBJECT_NAME.to_string()],
            not_before: now - TimeDelta::days(1),
            not_after: now + TimeDelta::days(1),
        }
    }

    /// Base64 RSA PKCS#1 v1.5 signature over the SHA-1 digest of `body`.
    pub fn sign_body(&self, body: &[u8]) -> Result<String> {
        let digest = Sha1::digest(body);
        let signature = self
            .private_key
            .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
            .context("failed to sign body")?;
        Ok(STANDARD.encode(signature))
    }

    /// Headers for a request signed by this authority.
    pub fn signed_headers(&self, body: &[u8], cert_url: &str) -> Result<HeaderMap> {
        request_headers(cert_url, &self.sign_body(body)?)
    }

    /// Captured request carrying a valid signature and the default URL.
    pub fn signed_request(
        &self,
        body: impl Into<Bytes>,
        claimed_timestamp: DateTime<Utc>,
    ) -> Result<IncomingRequest> {
        let body = body.into();
        let headers = self.signed_headers(&body, TEST_CERT_URL)?;
        Ok(IncomingRequest::new(headers, body, claimed_timestamp))
    }
}

/// Builds the two authentication headers.
pub fn request_headers(cert_url: &str, signature: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_bytes(CERT_CHAIN_URL_HEADER.as_bytes())?,
        HeaderValue::from_str(cert_url)?,
    );
    headers.insert(
        HeaderName::from_bytes(SIGNATURE_HEADER.as_bytes())?,
        HeaderValue::from_str(signature)?,
    );
    Ok(headers)
}

/// PEM of a valid certificate whose key is ECDSA rather than RSA.
pub fn ecdsa_certificate_pem() -> Result<String> {
    let key_pair = KeyPair::generate().context("failed to generate ECDSA key")?;
    let params = CertificateParams::new(vec![DEFAULT_SUBJECT_NAME.to_string()])?;
    Ok(params.self_signed(&key_pair)?.pem())
}

/// Builder for certificates issued by a `TestAuthority`.
#[derive(Debug)]
pub struct CertificateBuilder<'a> {
    authority: &'a TestAuthority,
    subject_alt_names: Vec<String>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl CertificateBuilder<'_> {
    /// Replaces the DNS subject alternative names.
    #[must_use]
    pub fn subject_alt_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subject_alt_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the start of the validity window.
    #[must_use]
    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = at;
        self
    }

    /// Sets the end of the validity window.
    #[must_use]
    pub fn not_after(mut self, at: DateTime<Utc>) -> Self {
        self.not_after = at;
        self
    }

    /// Issues the certificate and returns it as PEM.
    pub fn pem(self) -> Result<String> {
        let mut params = CertificateParams::new(self.subject_alt_names)?;
        params.not_before = OffsetDateTime::from_unix_timestamp(self.not_before.timestamp())?;
        params.not_after = OffsetDateTime::from_unix_timestamp(self.not_after.timestamp())?;

        let cert = params.self_signed(&self.authority.key_pair)?;
        Ok(cert.pem())
    }
}

/// Builder for the JSON envelope the platform posts.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    application_id: String,
    request_type: String,
    timestamp: DateTime<Utc>,
    with_session: bool,
}

impl EnvelopeBuilder {
    /// Launch request for `amzn1.ask.skill.test`, stamped now.
    pub fn new() -> Self {
        Self {
            application_id: "amzn1.ask.skill.test".to_string(),
            request_type: "LaunchRequest".to_string(),
            timestamp: Utc::now(),
            with_session: true,
        }
    }

    /// Sets the application id in session and context.
    #[must_use]
    pub fn application_id(mut self, id: impl Into<String>) -> Self {
        self.application_id = id.into();
        self
    }

    /// Sets `request.type`.
    #[must_use]
    pub fn request_type(mut self, kind: impl Into<String>) -> Self {
        self.request_type = kind.into();
        self
    }

    /// Sets `request.timestamp`.
    #[must_use]
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at;
        self
    }

    /// Omits the `session` object, as for audio player events.
    #[must_use]
    pub fn without_session(mut self) -> Self {
        self.with_session = false;
        self
    }

    /// Envelope as a JSON value.
    pub fn json(&self) -> Value {
        let mut envelope = json!({
            "version": "1.0",
            "context": {
                "System": {
                    "application": { "applicationId": self.application_id }
                }
            },
            "request": {
                "type": self.request_type,
                "requestId": format!("amzn1.echo-api.request.{}", Uuid::new_v4()),
                "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                "locale": "en-US"
            }
        });

        if self.with_session {
            envelope["session"] = json!({
                "new": true,
                "sessionId": format!("amzn1.echo-api.session.{}", Uuid::new_v4()),
                "application": { "applicationId": self.application_id }
            });
        }

        envelope
    }

    /// Envelope serialized as request body bytes.
    pub fn body(&self) -> Bytes {
        Bytes::from(self.json().to_string())
    }
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
