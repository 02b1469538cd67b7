//! WebSocket Message Types
//!
//! Frames exchanged between live-query clients and the server. Both sides
//! of the protocol live in this crate, so every type goes both ways.

use serde::{Deserialize, Serialize};

use crate::store::{Direction, Document, ErrorKind, Query};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a live query under a client-chosen id
    Subscribe {
        query_id: String,
        collection: String,
        order_by: String,
        #[serde(default)]
        direction: Direction,
    },
    /// Close a live query
    Unsubscribe { query_id: String },
    /// Ping for keepalive
    Ping,
}

impl ClientMessage {
    pub fn subscribe(query_id: impl Into<String>, query: Query) -> Self {
        ClientMessage::Subscribe {
            query_id: query_id.into(),
            collection: query.collection,
            order_by: query.order_by,
            direction: query.direction,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected { connection_id: String },
    /// Live query attached; its first snapshot follows
    Subscribed { query_id: String },
    /// Full ordered result set of a live query
    Snapshot {
        query_id: String,
        documents: Vec<Document>,
    },
    /// The live query failed and is closed
    SubscriptionError {
        query_id: String,
        kind: ErrorKind,
        message: String,
    },
    /// Live query detached
    Unsubscribed { query_id: String },
    /// Pong response to ping
    Pong,
    /// Protocol-level error; the connection stays open
    Error { message: String },
}
