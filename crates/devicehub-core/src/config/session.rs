//! Device session admission configuration.

use serde::{Deserialize, Serialize};

/// Device session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of simultaneously active devices per user.
    #[serde(default = "default_max_devices")]
    pub max_devices: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_devices: default_max_devices(),
        }
    }
}

fn default_max_devices() -> usize {
    3
}
