//! `AuthUser` extractor: verifies the bearer token and exposes its claims.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use devicehub_auth::identity::{IdentityClaims, IdentityError};

use crate::error::ApiError;
use crate::state::AppState;

/// Verified identity of the caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub IdentityClaims);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        self.0.user_id()
    }
}

impl std::ops::Deref for AuthUser {
    type Target = IdentityClaims;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| IdentityError::MissingCredential)?;

        let claims = state.verifier.verify(bearer.token()).await?;
        Ok(AuthUser(claims))
    }
}
