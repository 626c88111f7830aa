//! External identity provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for verifying bearer credentials issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity provider tenant domain, e.g. `tenant.eu.auth0.com`.
    #[serde(default)]
    pub domain: String,
    /// Expected `aud` claim.
    #[serde(default)]
    pub audience: String,
    /// Expected `iss` claim. Derived from `domain` when empty.
    #[serde(default)]
    pub issuer: String,
    /// Accepted signing algorithms.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<String>,
    /// Explicit key set location. Derived from `domain` when empty.
    #[serde(default)]
    pub jwks_url: String,
    /// How long a fetched key set is served before it is refreshed.
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_seconds: u64,
    /// Timeout for a single key set request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Allowed clock skew when checking `exp`/`nbf`.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl IdentityConfig {
    /// Issuer to validate against.
    pub fn resolved_issuer(&self) -> String {
        if !self.issuer.is_empty() {
            self.issuer.clone()
        } else {
            format!("https://{}/", self.domain.trim_end_matches('/'))
        }
    }

    /// Key set URL to fetch.
    pub fn resolved_jwks_url(&self) -> String {
        if !self.jwks_url.is_empty() {
            self.jwks_url.clone()
        } else {
            format!(
                "https://{}/.well-known/jwks.json",
                self.domain.trim_end_matches('/')
            )
        }
    }

    /// Key set cache TTL as a [`Duration`].
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_seconds)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            audience: String::new(),
            issuer: String::new(),
            algorithms: default_algorithms(),
            jwks_url: String::new(),
            jwks_cache_ttl_seconds: default_jwks_cache_ttl(),
            request_timeout_seconds: default_request_timeout(),
            leeway_seconds: default_leeway(),
        }
    }
}

fn default_algorithms() -> Vec<String> {
    vec!["RS256".to_string()]
}

fn default_jwks_cache_ttl() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    5
}

fn default_leeway() -> u64 {
    30
}
