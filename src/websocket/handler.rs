//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::{ConnectionHub, HubError, OUTBOUND_BUFFER};
use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::store::Query;

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.ws_hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected WebSocket connection");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Some(frame) = encode(&error_msg) {
                let _ = sender.send(frame).await;
            }
            return;
        }
    };

    let connected = encode(&ServerMessage::Connected {
        connection_id: connection_id.clone(),
    });
    let delivered = match connected {
        Some(frame) => sender.send(frame).await.is_ok(),
        None => false,
    };
    if !delivered {
        tracing::error!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();

    // Channel -> socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(frame) = encode(&msg) else {
                continue;
            };
            if sender.send(frame).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);
    let conn_id_for_recv = connection_id.clone();

    // Socket -> hub
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    hub.unregister(&connection_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(hub: &Arc<ConnectionHub>, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(hub, connection_id, client_msg).await;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "Invalid client message"
                    );
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = hub.send_to(connection_id, error_msg).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
async fn handle_client_message(hub: &Arc<ConnectionHub>, connection_id: &str, message: ClientMessage) {
    match message {
        ClientMessage::Subscribe {
            query_id,
            collection,
            order_by,
            direction,
        } => {
            let query = Query {
                collection,
                order_by,
                direction,
            };
            let response = match hub.subscribe(connection_id, &query_id, query).await {
                Ok(()) => return,
                Err(HubError::Store(e)) => ServerMessage::SubscriptionError {
                    query_id,
                    kind: e.kind(),
                    message: e.to_string(),
                },
                Err(e) => {
                    tracing::error!(
                        connection_id = %connection_id,
                        error = %e,
                        "Subscribe error"
                    );
                    ServerMessage::Error {
                        message: e.to_string(),
                    }
                }
            };
            let _ = hub.send_to(connection_id, response).await;
        }
        ClientMessage::Unsubscribe { query_id } => {
            let response = match hub.unsubscribe(connection_id, &query_id).await {
                Ok(true) => ServerMessage::Unsubscribed { query_id },
                Ok(false) => ServerMessage::Error {
                    message: format!("No live query with id '{}'", query_id),
                },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            };
            let _ = hub.send_to(connection_id, response).await;
        }
        ClientMessage::Ping => {
            let _ = hub.send_to(connection_id, ServerMessage::Pong).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MemoryStoreConfig};
    use crate::websocket::HubConfig;

    async fn connected(store: Arc<MemoryStore>) -> (Arc<ConnectionHub>, String, mpsc::Receiver<ServerMessage>) {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default(), store));
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let id = hub.register(tx).await.unwrap();
        (hub, id, rx)
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (hub, id, mut rx) = connected(Arc::new(MemoryStore::in_memory())).await;
        let keep_open =
            handle_ws_message(&hub, &id, Message::Text(r#"{"type":"ping"}"#.into())).await;
        assert!(keep_open);
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::Pong);
    }

    #[tokio::test]
    async fn test_invalid_message_keeps_connection() {
        let (hub, id, mut rx) = connected(Arc::new(MemoryStore::in_memory())).await;
        assert!(handle_ws_message(&hub, &id, Message::Text("nope".into())).await);
        assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Error { .. }));
        assert!(!handle_ws_message(&hub, &id, Message::Close(None)).await);
    }

    #[tokio::test]
    async fn test_denied_subscribe_becomes_subscription_error() {
        let store = MemoryStore::new(MemoryStoreConfig::default().allow(["todos"])).unwrap();
        let (hub, id, mut rx) = connected(Arc::new(store)).await;

        let frame = r#"{"type":"subscribe","query_id":"q1","collection":"secrets","order_by":"created_at"}"#;
        handle_ws_message(&hub, &id, Message::Text(frame.into())).await;

        match rx.recv().await.unwrap() {
            ServerMessage::SubscriptionError { query_id, kind, .. } => {
                assert_eq!(query_id, "q1");
                assert_eq!(kind, crate::store::ErrorKind::Permission);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_round_trip() {
        let (hub, id, mut rx) = connected(Arc::new(MemoryStore::in_memory())).await;

        let subscribe = r#"{"type":"subscribe","query_id":"q1","collection":"todos","order_by":"created_at"}"#;
        handle_ws_message(&hub, &id, Message::Text(subscribe.into())).await;
        assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Subscribed { .. }));

        let unsubscribe = r#"{"type":"unsubscribe","query_id":"q1"}"#;
        handle_ws_message(&hub, &id, Message::Text(unsubscribe.into())).await;

        loop {
            match rx.recv().await.unwrap() {
                ServerMessage::Snapshot { .. } => continue,
                ServerMessage::Unsubscribed { query_id } => {
                    assert_eq!(query_id, "q1");
                    break;
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(hub.query_count(&id).await, 0);
    }
}
