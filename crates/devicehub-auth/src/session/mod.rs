//! Device session admission and eviction.

pub mod lock;
pub mod manager;
pub mod outcome;

pub use lock::UserLocks;
pub use manager::DeviceSessionManager;
pub use outcome::{ForceLogoutOutcome, LoginOutcome, LogoutOutcome};
