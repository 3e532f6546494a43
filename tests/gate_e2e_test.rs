//! End-to-end tests through the real HTTPS fetcher.
//!
//! The platform certificate is served by a mock server. Everything else is
//! the production stack: `HttpCertificateFetcher`, certificate parsing,
//! signature and freshness checks, the extractor and the router.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeDelta, Utc};
use serde_json::Value;
use skillgate_api::{create_router, Config, GateState};
use skillgate_core::SystemClock;
use skillgate_testing::{AllowAnyUrl, EnvelopeBuilder, TestAuthority};
use skillgate_verify::{HttpCertificateFetcher, RequestValidator};
use tower::ServiceExt;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

const CERT_PATH: &str = "/echo.api/echo-api-cert.pem";

fn config() -> Config {
    Config::default().with_skill("helloworld", "amzn1.ask.skill.test")
}

async fn serve_certificate(pem: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path(CERT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(pem))
        .mount(&server)
        .await;
    server
}

/// Router whose validator fetches over the network. The URL policy is
/// relaxed because the mock server speaks plain HTTP on a random port.
fn router(config: &Config) -> Router {
    let validator_config = config.to_validator_config();
    let fetcher = HttpCertificateFetcher::new(&validator_config).unwrap();
    let validator = RequestValidator::with_parts(
        validator_config,
        Arc::new(AllowAnyUrl),
        Arc::new(fetcher),
        Arc::new(SystemClock),
    );
    create_router(GateState::from_config(validator, config), config)
}

fn signed_request(authority: &TestAuthority, cert_url: &str, body: bytes::Bytes) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/echo/helloworld")
        .header("SignatureCertChainUrl", cert_url)
        .header("Signature", authority.sign_body(&body).unwrap())
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn platform_request_passes_full_stack() {
    let authority = TestAuthority::new().unwrap();
    let server = serve_certificate(authority.certificate().pem().unwrap()).await;
    let cert_url = format!("{}{CERT_PATH}", server.uri());

    let request = signed_request(&authority, &cert_url, EnvelopeBuilder::new().body());
    let response = router(&config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["response"]["shouldEndSession"], true);
}

#[tokio::test]
async fn expired_served_certificate_is_not_authorized() {
    let authority = TestAuthority::new().unwrap();
    let pem = authority
        .certificate()
        .not_before(Utc::now() - TimeDelta::days(60))
        .not_after(Utc::now() - TimeDelta::days(1))
        .pem()
        .unwrap();
    let server = serve_certificate(pem).await;
    let cert_url = format!("{}{CERT_PATH}", server.uri());

    let request = signed_request(&authority, &cert_url, EnvelopeBuilder::new().body());
    let response = router(&config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_certificate_is_not_authorized() {
    let authority = TestAuthority::new().unwrap();
    let server = serve_certificate(authority.certificate().pem().unwrap()).await;
    let cert_url = format!("{}/echo.api/other.pem", server.uri());

    let request = signed_request(&authority, &cert_url, EnvelopeBuilder::new().body());
    let response = router(&config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn production_policy_refuses_mock_server() {
    let authority = TestAuthority::new().unwrap();
    let server = serve_certificate(authority.certificate().pem().unwrap()).await;
    let cert_url = format!("{}{CERT_PATH}", server.uri());

    let config = config();
    let validator = RequestValidator::new(config.to_validator_config()).unwrap();
    let app = create_router(GateState::from_config(validator, &config), &config);

    let request = signed_request(&authority, &cert_url, EnvelopeBuilder::new().body());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
