//! HTTP client helper with native-tls support.

use std::time::Duration;
use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// Global timeout for all HTTP operations (30 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum response body size for portal API responses (10 MB).
pub const MAX_API_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Create a new HTTP agent configured with native-tls and a global timeout.
pub fn agent() -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(HTTP_TIMEOUT))
        .build()
        .into()
}

/// Validate that a portal URL uses HTTPS and has a host.
pub fn validate_portal_url(raw: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("Invalid URL '{}': {}", raw, e))?;
    if parsed.scheme() != "https" {
        return Err(format!(
            "Insecure URL scheme '{}' rejected; only HTTPS is allowed. URL: {}",
            parsed.scheme(),
            raw
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(format!("URL '{}' has no host", raw));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_portal_url() {
        assert!(validate_portal_url("https://portal.sso.us-east-1.amazonaws.com").is_ok());
    }

    #[test]
    fn test_rejected_http_scheme() {
        let msg = validate_portal_url("http://portal.sso.us-east-1.amazonaws.com").unwrap_err();
        assert!(msg.contains("HTTPS"), "Error should mention HTTPS: {msg}");
    }

    #[test]
    fn test_rejected_invalid_url() {
        let msg = validate_portal_url("not a url").unwrap_err();
        assert!(msg.contains("Invalid URL"), "Error should mention parsing: {msg}");
    }
}
