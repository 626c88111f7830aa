//! Individual live connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::message::types::OutboundMessage;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Sending side of one device's live channel.
///
/// The socket task owns the matching receiver and the transport; the
/// handle pushes frames into the queue and signals the task to close.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Distinguishes successive connections from the same device.
    pub id: ConnectionId,
    pub device_id: String,
    pub user_id: String,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<OutboundMessage>,
    shutdown: CancellationToken,
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a handle and the receiver the socket task drains.
    pub fn new(
        device_id: impl Into<String>,
        user_id: impl Into<String>,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            device_id: device_id.into(),
            user_id: user_id.into(),
            connected_at: Utc::now(),
            sender,
            shutdown: CancellationToken::new(),
            alive: AtomicBool::new(true),
        };
        (handle, receiver)
    }

    /// Queue a frame. Returns `false` if the connection is dead or its
    /// buffer is full.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    device_id = %self.device_id,
                    "Connection send buffer full"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Ask the socket task to flush queued frames and close the transport.
    pub fn close(&self) {
        self.mark_dead();
        self.shutdown.cancel();
    }

    /// Token cancelled once [`close`](Self::close) is called.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
