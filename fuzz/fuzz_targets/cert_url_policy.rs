#![no_main]

//! Fuzz target for the certificate URL allow-list.
//!
//! The URL comes straight from a request header, so the policy must never
//! panic and must never admit a URL outside the configured host and prefix.

use libfuzzer_sys::fuzz_target;
use skillgate_core::ValidatorConfig;
use skillgate_verify::{AllowListPolicy, CertUrlPolicy};
use url::Url;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let config = ValidatorConfig::default();
    let policy = AllowListPolicy::from_config(&config);

    if policy.is_allowed(raw) {
        let url = Url::parse(raw).expect("admitted url must parse");
        assert_eq!(url.scheme(), "https", "admitted {raw:?}");
        assert!(url.username().is_empty(), "admitted userinfo in {raw:?}");
        assert!(
            url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(&config.allowed_cert_host)),
            "admitted foreign host in {raw:?}"
        );
        assert!(url.path().starts_with(&config.allowed_cert_path_prefix), "admitted {raw:?}");
    }
});
