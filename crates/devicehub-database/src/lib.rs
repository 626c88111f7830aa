//! # devicehub-database
//!
//! Persistence for device sessions: the [`DeviceSessionStore`] contract,
//! its PostgreSQL implementation, an in-memory implementation for tests and
//! single-node development, plus pool and migration helpers.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use repositories::device_session::DeviceSessionRepository;
pub use repositories::memory::MemoryDeviceSessionStore;
pub use store::DeviceSessionStore;
