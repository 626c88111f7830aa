//! Live connection handles, registry, and channel authentication.

pub mod authenticator;
pub mod handle;
pub mod registry;

pub use handle::{ConnectionHandle, ConnectionId};
pub use registry::ConnectionRegistry;
