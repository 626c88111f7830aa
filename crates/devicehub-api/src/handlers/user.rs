//! Caller profile.

use axum::Json;

use crate::dto::response::ProfileResponse;
use crate::extractors::AuthUser;

/// GET /api/user/profile
pub async fn profile(AuthUser(claims): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        sub: claims.sub,
        name: claims.name.unwrap_or_default(),
        email: claims.email.unwrap_or_default(),
        phone_number: claims.phone_number.unwrap_or_default(),
        picture: claims.picture.unwrap_or_default(),
    })
}
