//! # devicehub-entity
//!
//! Domain entity models for DeviceHub. Database entities derive
//! `sqlx::FromRow`; everything serializes with serde and timestamps are
//! UTC instants.

pub mod device;

pub use device::{DeviceSession, DeviceSummary, NewDeviceSession, normalize_device_info};
