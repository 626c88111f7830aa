//! Device session entities.

pub mod info;
pub mod model;

pub use info::normalize_device_info;
pub use model::{DeviceSession, DeviceSummary, NewDeviceSession};
