//! # devicehub-auth
//!
//! Authentication and device admission for DeviceHub.
//!
//! ## Modules
//!
//! - `identity`: bearer credential verification against the identity
//!   provider's published key set, with a TTL-checked key cache
//! - `session`: the device session manager: per-user device limit,
//!   reactivation rules, force-logout and activity heartbeats

pub mod identity;
pub mod session;

pub use identity::{IdentityClaims, IdentityError, IdentityVerifier, JwksVerifier, KeySetCache};
pub use session::{DeviceSessionManager, ForceLogoutOutcome, LoginOutcome, LogoutOutcome};
