//! The `provider` block: API key resolution, base URL allowlist and client
//! construction.

use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::client::{build_user_agent, HttpTransport, HyperpingClient, DEFAULT_BASE_URL};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::strip_unknown;

pub const API_KEY_ENV: &str = "HYPERPING_API_KEY";
pub const USER_AGENT_ENV: &str = "TF_APPEND_USER_AGENT";

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];
const HYPERPING_DOMAIN: &str = "hyperping.io";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Parse the raw provider block. Unknown values read as unset.
    pub fn from_value(config: &Value) -> Result<Self, serde_json::Error> {
        match strip_unknown(config) {
            Value::Null => Ok(Self::default()),
            other => serde_json::from_value(other),
        }
    }
}

pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "api_key",
            Attribute::optional_string().sensitive().with_description(
                "Hyperping API key. Falls back to the HYPERPING_API_KEY environment variable.",
            ),
        )
        .with_attribute(
            "base_url",
            Attribute::optional_string().with_description(
                "Hyperping API base URL. Must be an HTTPS URL on hyperping.io. Defaults to https://api.hyperping.io.",
            ),
        )
}

/// Whether API credentials may be sent to `base_url`.
///
/// Loopback hosts are accepted on any scheme for local testing; everything
/// else must be HTTPS on `hyperping.io` or one of its subdomains.
pub fn is_allowed_base_url(base_url: &str) -> bool {
    let Ok(url) = Url::parse(base_url) else {
        return false;
    };
    let Some(host) = url.host_str().map(str::to_lowercase) else {
        return false;
    };
    if LOOPBACK_HOSTS.contains(&host.as_str()) {
        return true;
    }
    url.scheme() == "https"
        && (host == HYPERPING_DOMAIN || host.ends_with(&format!(".{}", HYPERPING_DOMAIN)))
}

/// The configured key wins over the environment; an empty result is an error.
pub fn resolve_api_key(configured: Option<&str>, env: Option<String>) -> Result<String, Diagnostic> {
    let key = match configured {
        Some(key) => key.to_string(),
        None => env.unwrap_or_default(),
    };
    if key.is_empty() {
        return Err(Diagnostic::error("Missing Hyperping API Key")
            .with_detail(
                "The provider cannot create the Hyperping API client as there is a missing or empty value for the Hyperping API key. \
                 Set the api_key value in the configuration or use the HYPERPING_API_KEY environment variable. \
                 If either is already set, ensure the value is not empty.",
            )
            .with_attribute("api_key"));
    }
    Ok(key)
}

pub fn resolve_base_url(configured: Option<&str>) -> Result<String, Diagnostic> {
    let Some(base_url) = configured else {
        return Ok(DEFAULT_BASE_URL.to_string());
    };
    if !is_allowed_base_url(base_url) {
        return Err(Diagnostic::error("Invalid Base URL")
            .with_detail(format!(
                "The base_url must be an HTTPS URL pointing to a Hyperping API domain (*.hyperping.io) \
                 to protect your API credentials from being sent to unauthorized servers. \
                 Provided: {}. Expected: {}",
                base_url, DEFAULT_BASE_URL
            ))
            .with_attribute("base_url"));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Build the API client for a parsed provider block. `env_api_key` is the
/// value of [`API_KEY_ENV`], passed in so callers control the environment.
pub fn build_client(
    config: &ProviderConfig,
    env_api_key: Option<String>,
    user_agent_suffix: Option<&str>,
    transport: Arc<dyn HttpTransport>,
) -> Result<HyperpingClient, Diagnostic> {
    let base_url = resolve_base_url(config.base_url.as_deref())?;
    let api_key = resolve_api_key(config.api_key.as_deref(), env_api_key)?;
    Ok(HyperpingClient::new(api_key, transport)
        .with_base_url(base_url)
        .with_user_agent(build_user_agent(
            env!("CARGO_PKG_VERSION"),
            user_agent_suffix,
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockHttpTransport;
    use serde_json::json;

    #[test]
    fn test_base_url_allowlist() {
        let allowed = [
            "https://api.hyperping.io",
            "https://api.hyperping.io/",
            "https://hyperping.io",
            "https://staging.api.hyperping.io/v1",
            "http://localhost:8080",
            "http://127.0.0.1:3000",
            "https://localhost",
            "http://[::1]:9000",
            "HTTPS://API.HYPERPING.IO",
        ];
        for url in allowed {
            assert!(is_allowed_base_url(url), "{url}");
        }

        let rejected = [
            "http://api.hyperping.io",
            "https://evil.com",
            "https://hyperping.io.evil.com",
            "https://evilhyperping.io",
            "https://api.hyperping.io@evil.com",
            "ftp://api.hyperping.io",
            "api.hyperping.io",
            "",
        ];
        for url in rejected {
            assert!(!is_allowed_base_url(url), "{url}");
        }
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(resolve_api_key(Some("sk_cfg"), Some("sk_env".into())).unwrap(), "sk_cfg");
        assert_eq!(resolve_api_key(None, Some("sk_env".into())).unwrap(), "sk_env");

        let diag = resolve_api_key(None, None).unwrap_err();
        assert_eq!(diag.summary, "Missing Hyperping API Key");
        assert_eq!(diag.attribute.as_deref(), Some("api_key"));

        // An explicit empty key does not fall back to the environment.
        assert!(resolve_api_key(Some(""), Some("sk_env".into())).is_err());
    }

    #[test]
    fn test_resolve_base_url() {
        assert_eq!(resolve_base_url(None).unwrap(), DEFAULT_BASE_URL);
        assert_eq!(
            resolve_base_url(Some("https://api.hyperping.io/")).unwrap(),
            "https://api.hyperping.io"
        );

        let diag = resolve_base_url(Some("https://attacker.example")).unwrap_err();
        assert_eq!(diag.summary, "Invalid Base URL");
        assert!(diag
            .detail
            .unwrap()
            .contains("Provided: https://attacker.example. Expected: https://api.hyperping.io"));
    }

    #[test]
    fn test_from_value_treats_unknown_as_unset() {
        let config = ProviderConfig::from_value(&json!({
            "api_key": crate::types::UNKNOWN_VALUE,
            "base_url": "http://localhost:1234"
        }))
        .unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:1234"));
        assert_eq!(ProviderConfig::from_value(&Value::Null).unwrap(), ProviderConfig::default());
    }

    #[test]
    fn test_build_client() {
        let config = ProviderConfig {
            api_key: Some("sk_test".into()),
            base_url: Some("http://localhost:8080/".into()),
        };
        let client = build_client(&config, None, Some("ci/1.0"), Arc::new(MockHttpTransport::new()))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert!(client.user_agent().ends_with(" ci/1.0"));

        // The base URL is checked before the key.
        let config = ProviderConfig {
            api_key: None,
            base_url: Some("https://example.com".into()),
        };
        let err = build_client(&config, None, None, Arc::new(MockHttpTransport::new())).unwrap_err();
        assert_eq!(err.summary, "Invalid Base URL");
    }
}
