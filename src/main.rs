//! Skill request gate.
//!
//! Main entry point: loads configuration, builds the validator and serves the
//! skill routes until a shutdown signal arrives.

use anyhow::{Context, Result};
use skillgate_api::{Config, GateState};
use skillgate_verify::RequestValidator;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log)?;

    info!("Starting skill request gate");
    info!(
        cert_host = %config.cert_host,
        cert_path_prefix = %config.cert_path_prefix,
        required_subject_name = %config.required_subject_name,
        freshness_window_seconds = config.freshness_window_seconds,
        skills = ?config.skills.keys().collect::<Vec<_>>(),
        "Configuration loaded"
    );

    if config.skills.is_empty() {
        warn!("No skills configured; every skill request will be answered with 404");
    }
    if config.skip_validation {
        warn!("Request validation is disabled; every request will be accepted");
    }
    if config.allow_dev_bypass {
        warn!("Dev bypass is enabled; requests with a _dev parameter skip all checks");
    }
    if config.insecure_skip_verify {
        warn!("TLS verification of the certificate host is disabled");
    }

    let validator = RequestValidator::new(config.to_validator_config())
        .context("Failed to build request validator")?;
    let state = GateState::from_config(validator, &config);
    let addr = config.parse_server_addr()?;

    skillgate_api::start_server(state, &config, addr).await.context("Server failed")?;

    info!("Skill request gate shutdown complete");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` wins over the configured directive.
fn init_tracing(configured: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{configured},skillgate=debug,tower_http=debug")))
        .context("Invalid log filter directive")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}
