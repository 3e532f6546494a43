//! JSON envelopes exchanged with the voice platform.
//!
//! Only the fields the gate needs are modelled; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillgate_core::{GateError, Result};

/// Inbound request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Envelope format version.
    pub version: String,
    /// Session block; absent for out-of-session events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// Device and application context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    /// The request itself.
    pub request: RequestBody,
}

/// Session block of a request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Whether this request opened the session.
    #[serde(default)]
    pub new: bool,
    /// Session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Application the session belongs to.
    #[serde(default)]
    pub application: Option<Application>,
}

/// Context block of a request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// System context.
    #[serde(rename = "System", default)]
    pub system: Option<SystemContext>,
}

/// System part of the context block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemContext {
    /// Application the request targets.
    #[serde(default)]
    pub application: Option<Application>,
}

/// Application reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Platform-assigned application id.
    pub application_id: String,
}

/// Request block of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    /// Request type, e.g. `LaunchRequest` or `IntentRequest`.
    #[serde(rename = "type")]
    pub request_type: String,
    /// Unique request id.
    pub request_id: String,
    /// Time the platform issued the request.
    pub timestamp: DateTime<Utc>,
    /// Locale of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl RequestEnvelope {
    /// Decodes an envelope from the raw request body.
    ///
    /// # Errors
    ///
    /// Returns `GateError::MalformedRequest` if the body is not a valid
    /// envelope.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| GateError::malformed_request(format!("invalid envelope: {e}")))
    }

    /// Request type.
    pub fn request_type(&self) -> &str {
        &self.request.request_type
    }

    /// Timestamp the platform claims for this request.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.request.timestamp
    }

    /// Application id, from the session if present, else from the context.
    pub fn application_id(&self) -> Option<&str> {
        self.session_application_id().or_else(|| self.context_application_id())
    }

    /// Whether either application id in the envelope equals `expected`.
    pub fn matches_application(&self, expected: &str) -> bool {
        self.session_application_id() == Some(expected)
            || self.context_application_id() == Some(expected)
    }

    fn session_application_id(&self) -> Option<&str> {
        self.session.as_ref()?.application.as_ref().map(|app| app.application_id.as_str())
    }

    fn context_application_id(&self) -> Option<&str> {
        let system = self.context.as_ref()?.system.as_ref()?;
        system.application.as_ref().map(|app| app.application_id.as_str())
    }
}

/// Outbound response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Envelope format version.
    pub version: String,
    /// Response block.
    pub response: ResponseBody,
}

/// Response block of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    /// Speech to render, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    /// Whether the platform should close the session.
    pub should_end_session: bool,
}

/// Plain-text speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpeech {
    /// Always `PlainText`.
    #[serde(rename = "type")]
    pub speech_type: String,
    /// Text to speak.
    pub text: String,
}

impl ResponseEnvelope {
    /// Empty acknowledgement that ends the session.
    pub fn acknowledge() -> Self {
        Self {
            version: "1.0".to_string(),
            response: ResponseBody { output_speech: None, should_end_session: true },
        }
    }

    /// Response speaking `text`.
    #[must_use]
    pub fn with_speech(mut self, text: impl Into<String>) -> Self {
        self.response.output_speech =
            Some(OutputSpeech { speech_type: "PlainText".to_string(), text: text.into() });
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn launch(session_app: Option<&str>, context_app: Option<&str>) -> RequestEnvelope {
        let mut value = json!({
            "version": "1.0",
            "request": {
                "type": "LaunchRequest",
                "requestId": "amzn1.echo-api.request.1",
                "timestamp": "2026-03-01T12:00:00Z"
            }
        });
        if let Some(id) = session_app {
            value["session"] = json!({ "new": true, "application": { "applicationId": id } });
        }
        if let Some(id) = context_app {
            value["context"] = json!({ "System": { "application": { "applicationId": id } } });
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_platform_envelope() {
        let body = br#"{
            "version": "1.0",
            "session": {
                "new": false,
                "sessionId": "amzn1.echo-api.session.1",
                "application": { "applicationId": "amzn1.ask.skill.abc" },
                "user": { "userId": "amzn1.ask.account.x" }
            },
            "request": {
                "type": "IntentRequest",
                "requestId": "amzn1.echo-api.request.1",
                "timestamp": "2026-03-01T12:00:00Z",
                "locale": "en-US",
                "intent": { "name": "HelloIntent" }
            }
        }"#;

        let envelope = RequestEnvelope::from_slice(body).unwrap();

        assert_eq!(envelope.request_type(), "IntentRequest");
        assert_eq!(envelope.application_id(), Some("amzn1.ask.skill.abc"));
        assert_eq!(envelope.timestamp().to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }

    #[test]
    fn rejects_non_json_body() {
        let err = RequestEnvelope::from_slice(b"not json").unwrap_err();
        assert_eq!(err.code(), "E2002");
    }

    #[test]
    fn rejects_envelope_without_timestamp() {
        let body = br#"{"version":"1.0","request":{"type":"LaunchRequest","requestId":"r"}}"#;
        assert!(RequestEnvelope::from_slice(body).is_err());
    }

    #[test]
    fn application_id_falls_back_to_context() {
        let envelope = launch(None, Some("amzn1.ask.skill.ctx"));

        assert_eq!(envelope.application_id(), Some("amzn1.ask.skill.ctx"));
        assert!(envelope.matches_application("amzn1.ask.skill.ctx"));
    }

    #[test]
    fn either_application_id_may_match() {
        let envelope = launch(Some("amzn1.ask.skill.a"), Some("amzn1.ask.skill.b"));

        assert!(envelope.matches_application("amzn1.ask.skill.a"));
        assert!(envelope.matches_application("amzn1.ask.skill.b"));
        assert!(!envelope.matches_application("amzn1.ask.skill.c"));
    }

    #[test]
    fn envelope_without_ids_matches_nothing() {
        assert!(!launch(None, None).matches_application("amzn1.ask.skill.a"));
    }

    #[test]
    fn acknowledgement_serializes_in_platform_shape() {
        let value = serde_json::to_value(ResponseEnvelope::acknowledge().with_speech("Hi")).unwrap();

        assert_eq!(value["version"], "1.0");
        assert_eq!(value["response"]["shouldEndSession"], true);
        assert_eq!(value["response"]["outputSpeech"]["type"], "PlainText");
        assert_eq!(value["response"]["outputSpeech"]["text"], "Hi");
    }
}
