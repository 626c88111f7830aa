//! Store implementations.

pub mod device_session;
pub mod memory;
