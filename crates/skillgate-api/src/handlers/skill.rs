//! Skill endpoint handler.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, instrument};

use crate::{envelope::ResponseEnvelope, extract::VerifiedRequest};

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Request types the platform sends to skills.
fn is_known_request_type(request_type: &str) -> bool {
    matches!(request_type, "LaunchRequest" | "IntentRequest" | "SessionEndedRequest")
        || request_type.starts_with("AudioPlayer.")
}

/// Acknowledges a verified skill request.
///
/// Intent handling belongs to the application behind the gate; this handler
/// only confirms the request type is one the platform defines.
#[instrument(
    name = "skill_request",
    skip(verified),
    fields(
        skill = %verified.skill,
        request_id = %verified.envelope.request.request_id,
        request_type = %verified.envelope.request_type(),
        dev_bypass = verified.dev_bypass,
    )
)]
pub async fn handle_skill_request(verified: VerifiedRequest) -> Response {
    if !is_known_request_type(verified.envelope.request_type()) {
        return (StatusCode::BAD_REQUEST, "Invalid request.").into_response();
    }

    info!(body_bytes = verified.body.len(), "Verified skill request");

    (
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
        Json(ResponseEnvelope::acknowledge()),
    )
        .into_response()
}
