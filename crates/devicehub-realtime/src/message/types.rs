//! Inbound and outbound live channel message definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames sent by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Keepalive; answered with [`OutboundMessage::Pong`].
    Ping,
    /// User activity heartbeat; refreshes the device's `last_activity`.
    Activity,
}

/// Frames pushed to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Pong,
    /// The device's session was ended elsewhere; the channel closes next.
    ForceLogout {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Generic push.
    Notification {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
    },
    /// The last inbound frame could not be processed.
    Error { code: String, message: String },
}

impl OutboundMessage {
    pub fn force_logout(message: impl Into<String>) -> Self {
        Self::ForceLogout {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn notification(message: impl Into<String>, payload: Option<serde_json::Value>) -> Self {
        Self::Notification {
            message: message.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
