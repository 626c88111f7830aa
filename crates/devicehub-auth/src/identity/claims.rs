//! Verified identity claims.

use serde::{Deserialize, Serialize};

/// Claim set of a verified access token.
///
/// Only `sub` is relied upon; profile claims are passed through to clients
/// untouched and may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Stable subject identifier; used as the device owner.
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Expiry (seconds since epoch).
    #[serde(default)]
    pub exp: u64,
}

impl IdentityClaims {
    /// Claims carrying only a subject.
    pub fn for_subject(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            ..Default::default()
        }
    }

    /// The device owner key.
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}
