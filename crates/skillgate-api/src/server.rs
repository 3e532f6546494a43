//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging, in a span carrying the request ID
//! 3. Timeout enforcement
//! 4. Handler execution, where skill routes run the `VerifiedRequest`
//!    extractor first
//!
//! # Graceful Shutdown
//!
//! On SIGINT or SIGTERM the server stops accepting connections and lets
//! in-flight requests finish.

use std::net::SocketAddr;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Span};
use uuid::Uuid;

use crate::{config::Config, handlers, state::GateState};

/// Creates the Axum router with all routes and middleware.
///
/// Skill endpoints are mounted at `{echo_prefix}{skill}` and accept POST
/// only. Skills missing from the state's table answer 404.
///
/// # Example
///
/// ```no_run
/// use skillgate_api::{create_router, Config, GateState};
/// use skillgate_verify::RequestValidator;
///
/// # fn build() -> anyhow::Result<()> {
/// let config = Config::default();
/// let validator = RequestValidator::new(config.to_validator_config())?;
/// let app = create_router(GateState::from_config(validator, &config), &config);
/// # let _ = app;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: GateState, config: &Config) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/live", get(handlers::liveness_check));

    let skill_path = format!("{}/{{skill}}", config.echo_prefix.trim_end_matches('/'));
    let skill_routes = Router::new().route(&skill_path, post(handlers::handle_skill_request));

    Router::new()
        .merge(health_routes)
        .merge(skill_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Identifier assigned to each inbound request.
///
/// Stored in request extensions, recorded on the request span and echoed in
/// the `X-Request-Id` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for correlating gate logs with platform retries.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", header_value);
    }

    response
}

fn request_span(req: &Request) -> Span {
    let request_id = req.extensions().get::<RequestId>().map_or("", |id| id.0.as_str());
    info_span!(
        "http_request",
        method = %req.method(),
        uri = %req.uri().path(),
        request_id = %request_id,
    )
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or the server
/// fails while running.
pub async fn start_server(
    state: GateState,
    config: &Config,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let app = create_router(state, config);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(echo_prefix = %config.echo_prefix, "HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http, routing::get, Extension};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn request_id_reaches_handlers_and_response() {
        let app = Router::new()
            .route("/id", get(|Extension(id): Extension<RequestId>| async move { id.0 }))
            .layer(middleware::from_fn(inject_request_id));

        let request = http::Request::builder().uri("/id").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        let header = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        assert_eq!(body, header.as_bytes());
        assert!(Uuid::parse_str(&header).is_ok());
    }
}
