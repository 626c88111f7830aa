//! Live channel authentication.

use std::sync::Arc;

use devicehub_auth::identity::{IdentityClaims, IdentityVerifier};
use devicehub_core::error::AppError;

/// Verifies the credential a device presents when opening its channel.
///
/// Uses the same verifier as HTTP bearer authentication.
#[derive(Clone)]
pub struct ChannelAuthenticator {
    verifier: Arc<dyn IdentityVerifier>,
}

impl std::fmt::Debug for ChannelAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelAuthenticator").finish()
    }
}

impl ChannelAuthenticator {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { verifier }
    }

    /// Authenticate a connection using the token from the query string.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<IdentityClaims, AppError> {
        let token = token.unwrap_or_default();
        Ok(self.verifier.verify(token).await?)
    }
}
