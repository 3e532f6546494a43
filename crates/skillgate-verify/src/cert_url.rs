//! Allow-list check for the certificate chain URL.
//!
//! Runs before any network I/O so an attacker cannot make the gate fetch a
//! certificate (and then a matching signature) from a server they control.

use std::fmt;

use skillgate_core::ValidatorConfig;
use url::Url;

const REQUIRED_SCHEME: &str = "https";
const DEFAULT_HTTPS_PORT: u16 = 443;

/// Decides whether a certificate chain URL may be fetched.
pub trait CertUrlPolicy: Send + Sync + fmt::Debug {
    /// Returns true when `url` may be fetched. Performs no I/O.
    fn is_allowed(&self, url: &str) -> bool;
}

/// Scheme, host and path-prefix allow-list.
///
/// Accepts only `https` URLs whose host equals the configured host
/// (optionally with an explicit `:443`) and whose normalised path starts with
/// the configured prefix. Host comparison is case-insensitive, the path
/// comparison is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListPolicy {
    host: String,
    path_prefix: String,
}

impl AllowListPolicy {
    /// Creates a policy for the given host and path prefix.
    pub fn new(host: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self { host: host.into().to_ascii_lowercase(), path_prefix: path_prefix.into() }
    }

    /// Builds the policy from validator configuration.
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self::new(&config.allowed_cert_host, &config.allowed_cert_path_prefix)
    }

    fn host_allowed(&self, url: &Url) -> bool {
        let host_matches =
            url.host_str().is_some_and(|host| host.eq_ignore_ascii_case(&self.host));

        // The parser drops the port when it equals the scheme default, so
        // `host:443` arrives here as `None`.
        let port_allowed = matches!(url.port(), None | Some(DEFAULT_HTTPS_PORT));

        host_matches && port_allowed
    }
}

impl CertUrlPolicy for AllowListPolicy {
    fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        if parsed.scheme() != REQUIRED_SCHEME {
            return false;
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return false;
        }

        self.host_allowed(&parsed) && parsed.path().starts_with(&self.path_prefix)
    }
}
