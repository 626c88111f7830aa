//! Credential verification failures.

use thiserror::Error;
use tracing::error;

use devicehub_core::error::{AppError, ErrorKind};

/// Why a bearer credential was rejected.
///
/// Callers treat every variant as "unauthenticated"; the distinction is kept
/// for logs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("missing bearer credential")]
    MissingCredential,
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("unknown signing key: {0}")]
    UnknownSigningKey(String),
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("token has expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token audience mismatch")]
    AudienceMismatch,
    #[error("token issuer mismatch")]
    IssuerMismatch,
    #[error("token has no subject")]
    MissingSubject,
    #[error("identity provider key set unavailable: {0}")]
    KeySetUnavailable(String),
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind as JwtErrorKind;

        match err.kind() {
            JwtErrorKind::ExpiredSignature => Self::Expired,
            JwtErrorKind::InvalidSignature => Self::InvalidSignature,
            JwtErrorKind::InvalidAudience => Self::AudienceMismatch,
            JwtErrorKind::InvalidIssuer => Self::IssuerMismatch,
            JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => {
                Self::UnsupportedAlgorithm(err.to_string())
            }
            JwtErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
                "sub" => Self::MissingSubject,
                "aud" => Self::AudienceMismatch,
                "iss" => Self::IssuerMismatch,
                _ => Self::MalformedToken(err.to_string()),
            },
            _ => Self::MalformedToken(err.to_string()),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        let message = match &err {
            IdentityError::MissingCredential => "Missing bearer token",
            IdentityError::Expired => "Token has expired",
            IdentityError::KeySetUnavailable(detail) => {
                error!(error = %detail, "Identity provider key set unavailable");
                "Unable to verify token"
            }
            _ => "Invalid token",
        };
        AppError::with_source(ErrorKind::Authentication, message, err)
    }
}
