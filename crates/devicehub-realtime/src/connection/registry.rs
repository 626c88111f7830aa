//! Device → live channel registry.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use devicehub_core::config::RealtimeConfig;

use super::handle::{ConnectionHandle, ConnectionId};
use crate::message::types::OutboundMessage;

/// Live channels keyed by device id.
///
/// Mutations for one device are atomic per key; different devices never
/// contend on a global lock. Removal always names the connection instance
/// being removed, so cleanup from a replaced connection cannot evict its
/// successor.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<ConnectionHandle>>,
    buffer_size: usize,
    logout_grace: Duration,
}

impl ConnectionRegistry {
    /// Creates a registry from configuration.
    pub fn new(config: &RealtimeConfig) -> Self {
        Self::with_settings(config.channel_buffer_size, config.logout_grace())
    }

    /// Creates a registry with explicit buffer size and logout grace period.
    pub fn with_settings(buffer_size: usize, logout_grace: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            buffer_size,
            logout_grace,
        }
    }

    /// Register a device's channel, replacing any earlier one.
    ///
    /// The replaced connection is left open; it simply stops receiving
    /// pushes.
    pub fn connect(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (handle, rx) = ConnectionHandle::new(device_id, user_id, self.buffer_size);
        let handle = Arc::new(handle);

        if let Some(previous) = self
            .connections
            .insert(device_id.to_string(), Arc::clone(&handle))
        {
            debug!(
                device_id = %device_id,
                previous_conn_id = %previous.id,
                "Replaced existing connection"
            );
        }

        info!(
            conn_id = %handle.id,
            device_id = %device_id,
            user_id = %user_id,
            "Device connection registered"
        );
        (handle, rx)
    }

    /// Remove and close whatever channel is registered for the device.
    /// Safe to call when absent.
    pub fn disconnect(&self, device_id: &str) {
        if let Some((_, handle)) = self.connections.remove(device_id) {
            handle.close();
            info!(conn_id = %handle.id, device_id = %device_id, "Device connection removed");
        }
    }

    /// Remove the mapping only if it still points at `conn_id`.
    pub fn release(&self, device_id: &str, conn_id: ConnectionId) -> bool {
        self.connections
            .remove_if(device_id, |_, handle| handle.id == conn_id)
            .is_some()
    }

    /// Best-effort push. A failed delivery drops the connection.
    pub fn send_notification(&self, device_id: &str, msg: OutboundMessage) -> bool {
        let Some(handle) = self.get(device_id) else {
            return false;
        };
        if handle.send(msg) {
            return true;
        }

        warn!(
            conn_id = %handle.id,
            device_id = %device_id,
            "Notification delivery failed, dropping connection"
        );
        self.release(device_id, handle.id);
        handle.close();
        false
    }

    /// Push a `force_logout` frame, wait the grace period, then close the
    /// channel and drop the mapping, whether or not the push succeeded.
    /// Returns immediately if the device is not connected.
    pub async fn send_logout_notification(&self, device_id: &str, message: &str) {
        let Some(handle) = self.get(device_id) else {
            debug!(device_id = %device_id, "No live connection for logout notification");
            return;
        };
        self.logout_connection(handle, message).await;
    }

    /// Notify, wait the grace period and close one specific connection.
    /// A newer connection registered for the same device is left alone.
    pub async fn logout_connection(&self, handle: Arc<ConnectionHandle>, message: &str) {
        if !handle.send(OutboundMessage::force_logout(message)) {
            warn!(
                conn_id = %handle.id,
                device_id = %handle.device_id,
                "Force logout notification not delivered"
            );
        }

        tokio::time::sleep(self.logout_grace).await;

        handle.close();
        self.release(&handle.device_id, handle.id);
        info!(
            conn_id = %handle.id,
            device_id = %handle.device_id,
            "Device connection closed after logout"
        );
    }

    /// The connection registered for `device_id` if it belongs to a user
    /// other than `owner`.
    pub fn foreign_connection(
        &self,
        device_id: &str,
        owner: &str,
    ) -> Option<Arc<ConnectionHandle>> {
        self.get(device_id).filter(|handle| handle.user_id != owner)
    }

    /// Remove and close the device's channel only if `user_id` holds it.
    pub fn disconnect_owned(&self, device_id: &str, user_id: &str) -> bool {
        match self
            .connections
            .remove_if(device_id, |_, handle| handle.user_id == user_id)
        {
            Some((_, handle)) => {
                handle.close();
                info!(conn_id = %handle.id, device_id = %device_id, "Device connection removed");
                true
            }
            None => false,
        }
    }

    /// Push to every connected device of a user. Returns how many accepted
    /// the frame.
    pub fn broadcast_to_user(&self, user_id: &str, msg: &OutboundMessage) -> usize {
        let targets: Vec<Arc<ConnectionHandle>> = self
            .connections
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut delivered = 0;
        for handle in targets {
            if handle.send(msg.clone()) {
                delivered += 1;
            } else {
                self.release(&handle.device_id, handle.id);
                handle.close();
            }
        }
        delivered
    }

    /// Close every registered channel. Used during shutdown.
    pub fn close_all(&self) {
        let handles: Vec<Arc<ConnectionHandle>> = self
            .connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for handle in handles {
            self.release(&handle.device_id, handle.id);
            handle.close();
        }
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.connections
            .get(device_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_connected(&self, device_id: &str) -> bool {
        self.connections.contains_key(device_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
