//! Expected results of device session operations.
//!
//! These are business outcomes the caller branches on, not errors.

use devicehub_entity::device::DeviceSummary;

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The device holds an active session.
    Admitted {
        device_id: String,
        /// Active devices for the user after admission.
        active_devices: usize,
        /// `true` if an existing row was reused rather than created.
        reactivated: bool,
    },
    /// The user already has the maximum number of active devices.
    LimitExceeded {
        device_id: String,
        max_devices: usize,
        /// Current active devices, most recent login first.
        active_devices: Vec<DeviceSummary>,
    },
}

impl LoginOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    pub fn device_id(&self) -> &str {
        match self {
            Self::Admitted { device_id, .. } | Self::LimitExceeded { device_id, .. } => device_id,
        }
    }
}

/// Result of evicting one of the caller's devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceLogoutOutcome {
    LoggedOut { device_id: String },
    /// Not active, or not owned by the caller.
    TargetNotFound,
}

/// Result of a device logging itself out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    LoggedOut,
    NotFound,
}
