//! Health check handlers for service monitoring.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::state::GateState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Whether request validation is enforced
    pub validation_enforced: bool,
    /// Skills registered with the gate
    pub skills: Vec<String>,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving with every check enforced
    Healthy,
    /// Serving with validation disabled or the dev bypass enabled
    Degraded,
}

/// Health check endpoint handler.
///
/// Reports `degraded` when the gate is running with a bypass, so a
/// misconfigured deployment is visible to monitoring.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<GateState>) -> Response {
    let validation_enforced =
        !state.validator.config().skip_validation && !state.allow_dev_bypass;

    let response = HealthResponse {
        status: if validation_enforced { HealthStatus::Healthy } else { HealthStatus::Degraded },
        timestamp: state.clock.now_utc(),
        validation_enforced,
        skills: state.skills.keys().cloned().collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    debug!(status = ?response.status, "Health check completed");

    (StatusCode::OK, Json(response)).into_response()
}

/// Liveness check endpoint for orchestrator probes.
#[instrument(name = "liveness_check", skip(state))]
pub async fn liveness_check(State(state): State<GateState>) -> Response {
    debug!("Performing liveness check");

    let response = serde_json::json!({
        "status": "alive",
        "timestamp": state.clock.now_utc(),
        "service": "skillgate"
    });

    (StatusCode::OK, Json(response)).into_response()
}
