//! Access token verification against the identity provider's key set.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tracing::debug;

use devicehub_core::config::IdentityConfig;
use devicehub_core::error::AppError;

use super::claims::IdentityClaims;
use super::error::IdentityError;
use super::jwks::KeySetCache;

/// Turns a bearer credential into a verified claim set.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Verify `token` and return its claims.
    async fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError>;
}

/// Verifies signed JWTs using keys published at the provider's JWKS endpoint.
#[derive(Debug)]
pub struct JwksVerifier {
    keys: Arc<KeySetCache>,
    validation: Validation,
}

impl JwksVerifier {
    /// Builds a verifier and its key cache from configuration.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("Failed to build identity HTTP client: {e}"))
            })?;
        let keys = Arc::new(KeySetCache::new(
            client,
            config.resolved_jwks_url(),
            config.jwks_cache_ttl(),
        ));
        Self::new(keys, config)
    }

    /// Builds a verifier around an existing key cache.
    pub fn new(keys: Arc<KeySetCache>, config: &IdentityConfig) -> Result<Self, AppError> {
        let algorithms = config
            .algorithms
            .iter()
            .map(|name| {
                Algorithm::from_str(name).map_err(|_| {
                    AppError::configuration(format!("Unsupported signing algorithm '{name}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let first = *algorithms.first().ok_or_else(|| {
            AppError::configuration("identity.algorithms must list at least one algorithm")
        })?;

        let mut validation = Validation::new(first);
        validation.algorithms = algorithms;
        validation.leeway = config.leeway_seconds;
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_issuer(&[config.resolved_issuer()]);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self { keys, validation })
    }
}

#[async_trait]
impl IdentityVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(IdentityError::MissingCredential);
        }

        let header =
            decode_header(token).map_err(|e| IdentityError::MalformedToken(e.to_string()))?;
        if !self.validation.algorithms.contains(&header.alg) {
            return Err(IdentityError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::MalformedToken("token header has no kid".to_string()))?;

        let keys = self.keys.get_or_refresh().await?;
        let jwk = match keys.find(&kid) {
            Some(jwk) => jwk.clone(),
            None => {
                debug!(kid = %kid, "Signing key not cached, refreshing key set");
                let keys = self.keys.refresh_for_unknown_key().await?;
                keys.find(&kid)
                    .cloned()
                    .ok_or_else(|| IdentityError::UnknownSigningKey(kid.clone()))?
            }
        };

        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| IdentityError::UnknownSigningKey(format!("{kid}: {e}")))?;
        let data = decode::<IdentityClaims>(token, &key, &self.validation)?;

        if data.claims.sub.trim().is_empty() {
            return Err(IdentityError::MissingSubject);
        }
        Ok(data.claims)
    }
}
