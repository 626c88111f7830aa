//! Live channel (WebSocket) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Live channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound message buffer per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Pause between pushing a force-logout frame and closing the channel.
    #[serde(default = "default_logout_grace")]
    pub logout_grace_millis: u64,
}

impl RealtimeConfig {
    /// Grace period as a [`Duration`].
    pub fn logout_grace(&self) -> Duration {
        Duration::from_millis(self.logout_grace_millis)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            logout_grace_millis: default_logout_grace(),
        }
    }
}

fn default_channel_buffer() -> usize {
    64
}

fn default_logout_grace() -> u64 {
    1000
}
