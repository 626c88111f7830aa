//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use devicehub_auth::identity::IdentityVerifier;
use devicehub_auth::session::DeviceSessionManager;
use devicehub_core::config::AppConfig;
use devicehub_realtime::connection::authenticator::ChannelAuthenticator;
use devicehub_realtime::connection::registry::ConnectionRegistry;

/// Passed to every handler via `State<AppState>`; all fields are cheap to
/// clone.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Device admission state machine
    pub sessions: Arc<DeviceSessionManager>,
    /// Live device channels
    pub registry: Arc<ConnectionRegistry>,
    /// Bearer credential verification
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        sessions: Arc<DeviceSessionManager>,
        registry: Arc<ConnectionRegistry>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            config,
            sessions,
            registry,
            verifier,
        }
    }

    /// Authenticator for live channel handshakes.
    pub fn channel_authenticator(&self) -> ChannelAuthenticator {
        ChannelAuthenticator::new(Arc::clone(&self.verifier))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .field("connections", &self.registry.connection_count())
            .finish()
    }
}
