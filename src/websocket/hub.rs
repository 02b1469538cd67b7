//! WebSocket Connection Hub
//!
//! Tracks every WebSocket connection and the live queries it has opened.
//! Each live query owns a forwarding task that turns store emissions into
//! `snapshot` frames on its connection's outbound channel. The outbound
//! channel is bounded: a slow socket stalls the forwarding tasks, and their
//! subscriptions keep only the newest snapshot meanwhile.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::messages::ServerMessage;
use crate::store::{DocumentStore, Query, StoreError, Subscription, SubscriptionHandle};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Frames a connection may have queued before senders wait
pub const OUTBOUND_BUFFER: usize = 64;

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// One live query opened by a connection
struct LiveQuery {
    /// Distinguishes this query from a later one reusing its id
    token: u64,
    handle: SubscriptionHandle,
    task: JoinHandle<()>,
}

impl LiveQuery {
    fn close(self) {
        self.handle.unsubscribe();
        self.task.abort();
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    /// Channel sender for this connection
    pub sender: mpsc::Sender<ServerMessage>,
    /// Live queries by client-chosen query id
    queries: HashMap<String, LiveQuery>,
}

type Connections = Arc<RwLock<HashMap<ConnectionId, ConnectionHandle>>>;

/// Manages all WebSocket connections and their live queries
pub struct ConnectionHub {
    connections: Connections,
    store: Arc<dyn DocumentStore>,
    config: HubConfig,
    next_token: AtomicU64,
}

impl ConnectionHub {
    pub fn new(config: HubConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            store,
            config,
            next_token: AtomicU64::new(0),
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                queries: HashMap::new(),
            },
        );

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and tear down its live queries
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        let mut closed = 0;
        if let Some(handle) = handle {
            for (_, query) in handle.queries {
                query.close();
                closed += 1;
            }
        }

        tracing::info!(connection_id = %id, live_queries = closed, "WebSocket disconnected");
    }

    fn sender(
        connections: &HashMap<ConnectionId, ConnectionHandle>,
        id: &str,
    ) -> Result<mpsc::Sender<ServerMessage>, HubError> {
        connections
            .get(id)
            .map(|c| c.sender.clone())
            .ok_or(HubError::ConnectionNotFound)
    }

    /// Open a live query for a connection
    ///
    /// On success the connection receives `subscribed`, then a `snapshot`
    /// for the current result set and one per later commit. Reusing a
    /// `query_id` replaces the previous live query. A query whose
    /// forwarding ends on its own (store failure, closed socket) is
    /// dropped from the connection.
    pub async fn subscribe(&self, id: &str, query_id: &str, query: Query) -> Result<(), HubError> {
        let sender = Self::sender(&*self.connections.read().await, id)?;

        let collection = query.collection.clone();
        let subscription = self.store.subscribe(query).await?;
        let handle = subscription.handle();

        sender
            .send(ServerMessage::Subscribed {
                query_id: query_id.to_string(),
            })
            .await
            .map_err(|_| HubError::SendFailed)?;

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let finished = Finished {
            connections: Arc::clone(&self.connections),
            connection_id: id.to_string(),
            query_id: query_id.to_string(),
            token,
        };

        // Spawned under the write lock so the task cannot finish before its
        // entry exists
        let mut connections = self.connections.write().await;
        let Some(connection) = connections.get_mut(id) else {
            handle.unsubscribe();
            return Err(HubError::ConnectionNotFound);
        };
        let task = tokio::spawn(forward(subscription, query_id.to_string(), sender, finished));
        let live = LiveQuery {
            token,
            handle,
            task,
        };
        if let Some(previous) = connection.queries.insert(query_id.to_string(), live) {
            previous.close();
        }

        tracing::debug!(
            connection_id = %id,
            query_id = %query_id,
            collection = %collection,
            "Live query opened"
        );
        Ok(())
    }

    /// Close a live query. Returns false if the id was unknown.
    pub async fn unsubscribe(&self, id: &str, query_id: &str) -> Result<bool, HubError> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        match connection.queries.remove(query_id) {
            Some(query) => {
                query.close();
                tracing::debug!(connection_id = %id, query_id = %query_id, "Live query closed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Send a message directly to a specific connection
    ///
    /// Waits while the connection's outbound buffer is full.
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let sender = Self::sender(&*self.connections.read().await, id)?;
        sender.send(message).await.map_err(|_| HubError::SendFailed)
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of live queries held by a connection
    pub async fn query_count(&self, id: &str) -> usize {
        self.connections
            .read()
            .await
            .get(id)
            .map(|c| c.queries.len())
            .unwrap_or(0)
    }
}

/// Removes a live query's entry once its forwarding task ends by itself
struct Finished {
    connections: Connections,
    connection_id: ConnectionId,
    query_id: String,
    token: u64,
}

impl Finished {
    async fn release(self) {
        let mut connections = self.connections.write().await;
        let Some(connection) = connections.get_mut(&self.connection_id) else {
            return;
        };
        let current = connection
            .queries
            .get(&self.query_id)
            .map(|q| q.token == self.token)
            .unwrap_or(false);
        if current {
            connection.queries.remove(&self.query_id);
            tracing::debug!(
                connection_id = %self.connection_id,
                query_id = %self.query_id,
                "Live query ended"
            );
        }
    }
}

/// Pump one subscription into its connection until either side goes away
async fn forward(
    mut subscription: Subscription,
    query_id: String,
    sender: mpsc::Sender<ServerMessage>,
    finished: Finished,
) {
    while let Some(event) = subscription.next().await {
        let message = match event {
            Ok(snapshot) => ServerMessage::Snapshot {
                query_id: query_id.clone(),
                documents: snapshot.documents,
            },
            Err(e) => {
                tracing::warn!(query_id = %query_id, error = %e, "Live query failed");
                let _ = sender
                    .send(ServerMessage::SubscriptionError {
                        query_id: query_id.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    })
                    .await;
                break;
            }
        };

        if sender.send(message).await.is_err() {
            break;
        }
    }

    subscription.unsubscribe();
    finished.release().await;
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,

    #[error(transparent)]
    Store(#[from] StoreError),
}
