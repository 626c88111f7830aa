//! Bearer credential verification.

pub mod claims;
pub mod error;
pub mod jwks;
pub mod verifier;

pub use claims::IdentityClaims;
pub use error::IdentityError;
pub use jwks::KeySetCache;
pub use verifier::{IdentityVerifier, JwksVerifier};
