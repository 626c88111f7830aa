//! # devicehub-realtime
//!
//! Live device channels for DeviceHub:
//!
//! - a process-local registry mapping each device to its open channel
//! - best-effort push delivery, force-logout notify-and-close
//! - the wire message types exchanged over the channel
//!
//! The registry is not shared between service instances.

pub mod connection;
pub mod message;

pub use connection::authenticator::ChannelAuthenticator;
pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use connection::registry::ConnectionRegistry;
pub use message::types::{InboundMessage, OutboundMessage};
