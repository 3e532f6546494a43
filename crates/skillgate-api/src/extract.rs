//! Axum extractor that authenticates a skill request before the handler runs.
//!
//! The skill is resolved from the path first; unregistered skills are
//! refused before the body is read. The body is then read once into `Bytes`.
//! The same buffer is digested for the signature check and handed to the
//! handler together with the decoded envelope, so handlers never see an
//! unverified payload.

use axum::{
    body::to_bytes,
    extract::{FromRef, FromRequest, FromRequestParts, Path, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use skillgate_core::{ErrorKind, GateError, IncomingRequest};
use tracing::{info, warn};

use crate::{envelope::RequestEnvelope, state::GateState};

const DEV_BYPASS_PARAM: &str = "_dev";

/// Skill request that passed every configured check.
#[derive(Debug, Clone)]
pub struct VerifiedRequest {
    /// Registered skill the request was routed to.
    pub skill: String,
    /// Decoded envelope.
    pub envelope: RequestEnvelope,
    /// Request headers as received.
    pub headers: HeaderMap,
    /// Raw body as received and verified.
    pub body: Bytes,
    /// True when the checks were skipped through the `_dev` bypass.
    pub dev_bypass: bool,
}

impl<S> FromRequest<S> for VerifiedRequest
where
    GateState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let gate = GateState::from_ref(state);
        let (mut parts, body) = req.into_parts();

        let requested = parts.uri.path().to_owned();
        let Path(skill) = Path::<String>::from_request_parts(&mut parts, state)
            .await
            .map_err(|_| GateError::UnknownSkill { skill: requested })?;
        let expected_application = gate
            .skill(&skill)
            .map(|app| app.application_id.clone())
            .ok_or_else(|| GateError::UnknownSkill { skill: skill.clone() })?;

        let body = to_bytes(body, gate.max_body_bytes)
            .await
            .map_err(|e| GateError::malformed_request(format!("failed to read body: {e}")))?;

        let envelope = RequestEnvelope::from_slice(&body)?;

        let dev_bypass = gate.allow_dev_bypass && dev_flag(parts.uri.query());
        if dev_bypass {
            warn!(
                request_id = %envelope.request.request_id,
                "Dev bypass requested, skipping authenticity and freshness checks"
            );
        } else {
            let request =
                IncomingRequest::new(parts.headers.clone(), body.clone(), envelope.timestamp());
            gate.validator.validate(&request).await.into_result()?;
        }

        if !envelope.matches_application(&expected_application) {
            return Err(GateError::ApplicationMismatch {
                application_id: envelope.application_id().unwrap_or_default().to_string(),
            }
            .into());
        }

        Ok(Self { skill, envelope, headers: parts.headers, body, dev_bypass })
    }
}

/// Whether the query string carries a non-empty `_dev` parameter.
fn dev_flag(query: Option<&str>) -> bool {
    query.is_some_and(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .any(|(key, value)| key == DEV_BYPASS_PARAM && !value.is_empty())
    })
}

/// Rejection carrying the reason a skill request was refused.
///
/// The response body is generic; the reason only reaches the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRejection(pub GateError);

impl GateRejection {
    /// Status code sent to the caller.
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::PolicyViolation
            | ErrorKind::TransportFailure
            | ErrorKind::MalformedCertificate
            | ErrorKind::IdentityMismatch
            | ErrorKind::SignatureInvalid => StatusCode::UNAUTHORIZED,
            ErrorKind::StaleRequest | ErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
            ErrorKind::UnknownSkill => StatusCode::NOT_FOUND,
            ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GateError> for GateRejection {
    fn from(error: GateError) -> Self {
        Self(error)
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::UNAUTHORIZED => "Not Authorized",
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::NOT_FOUND => "Not Found",
            _ => "Internal Server Error",
        };

        info!(
            status = status.as_u16(),
            code = self.0.code(),
            reason = %self.0,
            "Skill request refused"
        );

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use skillgate_core::IdentityFailure;

    use super::*;

    #[test]
    fn dev_flag_requires_non_empty_value() {
        assert!(dev_flag(Some("_dev=1")));
        assert!(dev_flag(Some("a=b&_dev=true")));
        assert!(!dev_flag(Some("_dev=")));
        assert!(!dev_flag(Some("_dev")));
        assert!(!dev_flag(Some("dev=1")));
        assert!(!dev_flag(None));
    }

    #[test]
    fn authenticity_failures_map_to_unauthorized() {
        let errors = [
            GateError::policy_violation("http://x"),
            GateError::transport("timeout"),
            GateError::malformed_certificate("no PEM block"),
            GateError::from(IdentityFailure::SubjectNameAbsent { expected: "x".into() }),
            GateError::signature("mismatch"),
        ];

        for error in errors {
            assert_eq!(GateRejection(error).status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn request_shape_failures_map_to_bad_request() {
        let errors = [
            GateError::StaleRequest { skew_seconds: 200 },
            GateError::malformed_request("eof"),
            GateError::ApplicationMismatch { application_id: "x".into() },
        ];

        for error in errors {
            assert_eq!(GateRejection(error).status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn unknown_skill_maps_to_not_found() {
        let rejection = GateRejection(GateError::UnknownSkill { skill: "nope".into() });
        assert_eq!(rejection.status(), StatusCode::NOT_FOUND);
    }
}
