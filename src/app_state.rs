//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::domain::ConnectionRegistry;
use crate::service::Broadcaster;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of open push-channel connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Dispatcher over `registry`, shared with the event watcher.
    pub broadcaster: Broadcaster,
    /// Runtime configuration.
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Builds the state around a fresh, empty registry.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            registry,
            broadcaster,
            config: Arc::new(config),
        }
    }
}
