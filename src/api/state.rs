//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::store::{DocumentStore, MemoryStore};
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// The document store backing every collection
    pub store: Arc<MemoryStore>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for live queries
    pub ws_hub: Arc<ConnectionHub>,
}

impl AppState {
    pub fn new(store: Arc<MemoryStore>, config: ApiConfig) -> Self {
        let hub_config = HubConfig {
            max_connections: config.max_ws_connections,
        };
        Self::with_ws_config(store, config, hub_config)
    }

    /// Create AppState with custom WebSocket hub configuration
    pub fn with_ws_config(store: Arc<MemoryStore>, config: ApiConfig, hub_config: HubConfig) -> Self {
        let hub_store: Arc<dyn DocumentStore> = store.clone();
        Self {
            store,
            config: Arc::new(config),
            start_time: Instant::now(),
            ws_hub: Arc::new(ConnectionHub::new(hub_config, hub_store)),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}
