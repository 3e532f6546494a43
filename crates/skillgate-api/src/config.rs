//! Configuration management for the skill request gate.

use std::{collections::BTreeMap, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use skillgate_core::{
    models::{DEFAULT_CERT_HOST, DEFAULT_CERT_PATH_PREFIX, DEFAULT_SUBJECT_NAME},
    ValidatorConfig,
};

const CONFIG_FILE: &str = "skillgate.toml";
const ENV_PREFIX: &str = "SKILLGATE_";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed `SKILLGATE_` (highest priority)
/// 2. Configuration file (`skillgate.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// The defaults target the production platform: only certificates under
/// `https://s3.amazonaws.com/echo.api/` naming `echo-api.amazon.com` are
/// trusted, and every bypass is off. No skill is registered by default, so
/// every skill route answers 404 until `skills` is filled in:
///
/// ```toml
/// [skills.helloworld]
/// application_id = "amzn1.ask.skill.0000"
/// ```
///
/// or `SKILLGATE_SKILLS__HELLOWORLD__APPLICATION_ID=amzn1.ask.skill.0000`.
///
/// # Example
///
/// ```no_run
/// use skillgate_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `SKILLGATE_HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `SKILLGATE_PORT`
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `SKILLGATE_REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Path prefix under which skill endpoints are mounted.
    ///
    /// Environment variable: `SKILLGATE_ECHO_PREFIX`
    #[serde(default = "default_echo_prefix")]
    pub echo_prefix: String,
    /// Largest request body accepted, in bytes.
    ///
    /// Environment variable: `SKILLGATE_MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    // Certificate policy
    /// Only host certificate chain URLs may point at.
    ///
    /// Environment variable: `SKILLGATE_CERT_HOST`
    #[serde(default = "default_cert_host")]
    pub cert_host: String,
    /// Required path prefix of certificate chain URLs.
    ///
    /// Environment variable: `SKILLGATE_CERT_PATH_PREFIX`
    #[serde(default = "default_cert_path_prefix")]
    pub cert_path_prefix: String,
    /// Subject alternative name the signing certificate must carry.
    ///
    /// Environment variable: `SKILLGATE_REQUIRED_SUBJECT_NAME`
    #[serde(default = "default_subject_name")]
    pub required_subject_name: String,
    /// Certificate fetch timeout in seconds.
    ///
    /// Environment variable: `SKILLGATE_FETCH_TIMEOUT_SECONDS`
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    /// Skip TLS verification of the certificate host. Never in production.
    ///
    /// Environment variable: `SKILLGATE_INSECURE_SKIP_VERIFY`
    #[serde(default)]
    pub insecure_skip_verify: bool,

    // Request checks
    /// Replay window in seconds.
    ///
    /// Environment variable: `SKILLGATE_FRESHNESS_WINDOW_SECONDS`
    #[serde(default = "default_freshness_window")]
    pub freshness_window_seconds: u64,
    /// Accept every request without checks. Never in production.
    ///
    /// Environment variable: `SKILLGATE_SKIP_VALIDATION`
    #[serde(default)]
    pub skip_validation: bool,
    /// Honour the `_dev` query parameter, which skips all checks for that
    /// request. Never in production.
    ///
    /// Environment variable: `SKILLGATE_ALLOW_DEV_BYPASS`
    #[serde(default)]
    pub allow_dev_bypass: bool,
    /// Skills served under `echo_prefix`, keyed by path segment.
    ///
    /// Environment variable: `SKILLGATE_SKILLS__<NAME>__APPLICATION_ID`
    #[serde(default)]
    pub skills: BTreeMap<String, SkillApp>,

    // Logging
    /// Log filter directive.
    ///
    /// Environment variable: `SKILLGATE_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to the validator's configuration.
    pub fn to_validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            allowed_cert_host: self.cert_host.clone(),
            allowed_cert_path_prefix: self.cert_path_prefix.clone(),
            required_subject_name: self.required_subject_name.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_seconds),
            insecure_skip_verify: self.insecure_skip_verify,
            freshness_window: Duration::from_secs(self.freshness_window_seconds),
            skip_validation: self.skip_validation,
        }
    }

    /// Registers a skill at `{echo_prefix}{name}` for `application_id`.
    #[must_use]
    pub fn with_skill(
        mut self,
        name: impl Into<String>,
        application_id: impl Into<String>,
    ) -> Self {
        self.skills.insert(name.into(), SkillApp { application_id: application_id.into() });
        self
    }

    /// HTTP request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if !self.echo_prefix.starts_with('/') {
            anyhow::bail!("echo_prefix must start with '/'");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        if self.cert_host.is_empty() {
            anyhow::bail!("cert_host must not be empty");
        }

        if !self.cert_path_prefix.starts_with('/') {
            anyhow::bail!("cert_path_prefix must start with '/'");
        }

        if self.required_subject_name.is_empty() {
            anyhow::bail!("required_subject_name must not be empty");
        }

        if self.fetch_timeout_seconds == 0 {
            anyhow::bail!("fetch_timeout_seconds must be greater than 0");
        }

        if self.freshness_window_seconds == 0 {
            anyhow::bail!("freshness_window_seconds must be greater than 0");
        }

        for (name, skill) in &self.skills {
            if name.is_empty() || name.contains('/') {
                anyhow::bail!("skill name {name:?} must be a single non-empty path segment");
            }
            if skill.application_id.is_empty() {
                anyhow::bail!("skills.{name}.application_id must not be empty");
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            echo_prefix: default_echo_prefix(),
            max_body_bytes: default_max_body_bytes(),
            cert_host: default_cert_host(),
            cert_path_prefix: default_cert_path_prefix(),
            required_subject_name: default_subject_name(),
            fetch_timeout_seconds: default_fetch_timeout(),
            insecure_skip_verify: false,
            freshness_window_seconds: default_freshness_window(),
            skip_validation: false,
            allow_dev_bypass: false,
            skills: BTreeMap::new(),
            rust_log: default_log_level(),
        }
    }
}

/// A skill served by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillApp {
    /// Application id every request to this skill must name.
    pub application_id: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_echo_prefix() -> String {
    "/echo/".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_cert_host() -> String {
    DEFAULT_CERT_HOST.to_string()
}

fn default_cert_path_prefix() -> String {
    DEFAULT_CERT_PATH_PREFIX.to_string()
}

fn default_subject_name() -> String {
    DEFAULT_SUBJECT_NAME.to_string()
}

fn default_fetch_timeout() -> u64 {
    5
}

fn default_freshness_window() -> u64 {
    150
}

fn default_log_level() -> String {
    "info".to_string()
}
