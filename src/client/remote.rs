//! Remote document store
//!
//! Talks to a `kodigo-api` server: mutations and one-shot reads over HTTP,
//! each live query over its own WebSocket.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::error::ClientError;
use crate::api::dto::{
    CreatedResponse, HealthResponse, ListQueryParams, SnapshotResponse, UpdateDocumentRequest,
};
use crate::api::ErrorResponse;
use crate::config::ClientConfig;
use crate::store::query::validate_collection;
use crate::store::{
    snapshot_channel, DocumentId, DocumentStore, Fields, NewDocument, Query, Snapshot,
    SnapshotSender, StoreError, StoreResult, Subscription,
};
use crate::websocket::{ClientMessage, ServerMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// `DocumentStore` backed by a Kodigo server
pub struct RemoteStore {
    client: Client,
    base_url: String,
    ws_url: String,
}

impl RemoteStore {
    /// Create a client for `server_url` (`http://` or `https://`)
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = server_url.trim_end_matches('/').to_string();
        let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            return Err(ClientError::InvalidUrl(server_url.to_string()));
        };

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            ws_url: format!("{}/api/v1/ws", ws_base),
            base_url,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.server_url,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    fn documents_url(&self, collection: &str) -> String {
        format!("{}/api/v1/collections/{}/documents", self.base_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.documents_url(collection), id)
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-success response into `ClientError::Api`
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => (body.error.code, body.error.message),
        Err(_) if text.is_empty() => ("HTTP_ERROR".to_string(), status.to_string()),
        Err(_) => ("HTTP_ERROR".to_string(), text),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

/// Next protocol message, skipping control frames
async fn read_message(socket: &mut Socket) -> StoreResult<ServerMessage> {
    loop {
        match socket.next().await {
            None | Some(Ok(WsMessage::Close(_))) => {
                return Err(StoreError::Unavailable(
                    "live query connection closed".to_string(),
                ))
            }
            Some(Err(e)) => return Err(ClientError::from(e).into()),
            Some(Ok(WsMessage::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(_)) => continue,
        }
    }
}

/// Feed one live query into its subscription until cancelled or failed
async fn pump(
    mut socket: Socket,
    query_id: String,
    events: SnapshotSender,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => {
                let unsubscribe = ClientMessage::Unsubscribe { query_id: query_id.clone() };
                if let Ok(frame) = serde_json::to_string(&unsubscribe) {
                    let _ = socket.send(WsMessage::Text(frame)).await;
                }
                let _ = socket.close(None).await;
                break;
            }
            message = read_message(&mut socket) => {
                let event = match message {
                    Ok(ServerMessage::Snapshot { query_id: id, documents }) if id == query_id => {
                        Ok(Snapshot::new(documents))
                    }
                    Ok(ServerMessage::SubscriptionError { kind, message, .. }) => {
                        Err(StoreError::Remote { kind, message })
                    }
                    Ok(_) => continue,
                    Err(e) => Err(e),
                };

                let failed = event.is_err();
                if events.send(event).is_err() || failed {
                    break;
                }
            }
        }
    }

    tracing::debug!(query_id = %query_id, "Remote live query finished");
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        query.validate()?;

        let (mut socket, _) = connect_async(self.ws_url.as_str())
            .await
            .map_err(ClientError::from)?;

        let query_id = Uuid::new_v4().simple().to_string();
        let frame = serde_json::to_string(&ClientMessage::subscribe(&query_id, query))?;
        socket
            .send(WsMessage::Text(frame))
            .await
            .map_err(ClientError::from)?;

        // `subscribed` always precedes the first snapshot
        loop {
            match read_message(&mut socket).await? {
                ServerMessage::Subscribed { query_id: id } if id == query_id => break,
                ServerMessage::SubscriptionError { kind, message, .. } => {
                    return Err(StoreError::Remote { kind, message })
                }
                ServerMessage::Error { message } => return Err(StoreError::Unavailable(message)),
                _ => continue,
            }
        }

        tracing::debug!(query_id = %query_id, url = %self.ws_url, "Remote live query opened");

        let (tx, rx) = snapshot_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(pump(socket, query_id, tx, stop_rx));

        Ok(Subscription::new(rx, move || {
            let _ = stop_tx.send(());
        }))
    }

    async fn fetch(&self, query: Query) -> StoreResult<Snapshot> {
        query.validate()?;

        let params = ListQueryParams {
            order_by: query.order_by,
            direction: query.direction,
        };
        let response = self
            .client
            .get(self.documents_url(&query.collection))
            .query(&params)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let body: SnapshotResponse = check(response)
            .await?
            .json()
            .await
            .map_err(ClientError::from)?;
        Ok(Snapshot::new(body.documents))
    }

    async fn add(&self, collection: &str, document: NewDocument) -> StoreResult<DocumentId> {
        validate_collection(collection)?;

        let response = self
            .client
            .post(self.documents_url(collection))
            .json(&document)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let created: CreatedResponse = check(response)
            .await?
            .json()
            .await
            .map_err(ClientError::from)?;
        Ok(created.id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        validate_collection(collection)?;

        let response = self
            .client
            .patch(self.document_url(collection, id))
            .json(&UpdateDocumentRequest { fields })
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        validate_collection(collection)?;

        let response = self
            .client
            .delete(self.document_url(collection, id))
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{build_router, AppState};
    use crate::config::ApiConfig;
    use crate::models::Task;
    use crate::store::{ErrorKind, MemoryStore, MemoryStoreConfig};
    use crate::sync::ViewState;
    use crate::views::TaskListView;
    use std::sync::Arc;

    /// Serve a fresh store on an ephemeral port
    async fn spawn_server() -> (Arc<MemoryStore>, RemoteStore) {
        let config = MemoryStoreConfig::default().allow(["todos", "messages", "appointments"]);
        let store = Arc::new(MemoryStore::new(config).unwrap());
        let router = build_router(AppState::new(Arc::clone(&store), ApiConfig::default()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let remote =
            RemoteStore::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        (store, remote)
    }

    #[test]
    fn test_ws_url() {
        let remote = RemoteStore::new("http://localhost:8090/", Duration::from_secs(1)).unwrap();
        assert_eq!(remote.base_url(), "http://localhost:8090");
        assert_eq!(remote.ws_url(), "ws://localhost:8090/api/v1/ws");

        let remote = RemoteStore::new("https://kodigo.example", Duration::from_secs(1)).unwrap();
        assert_eq!(remote.ws_url(), "wss://kodigo.example/api/v1/ws");

        assert!(matches!(
            RemoteStore::new("ftp://x", Duration::from_secs(1)),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_secure_live_query_attempts_tls() {
        let (_store, plain) = spawn_server().await;
        let secure_url = plain.base_url().replacen("http://", "https://", 1);
        let secure = RemoteStore::new(&secure_url, Duration::from_secs(5)).unwrap();
        assert!(secure.ws_url().starts_with("wss://"));

        // A plain-text server fails the handshake; TLS support itself is present
        let err = secure
            .subscribe(Query::new("todos", Task::CREATED_AT))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.to_string().contains("not compiled"));
    }

    #[tokio::test]
    async fn test_mutations_round_trip() {
        let (store, remote) = spawn_server().await;

        let id = remote
            .add(
                "todos",
                NewDocument::new()
                    .field(Task::TEXT, "Buy milk")
                    .field(Task::COMPLETED, false)
                    .field(Task::CREATED_AT, 1),
            )
            .await
            .unwrap();

        let mut fields = Fields::new();
        fields.insert(Task::COMPLETED.to_string(), true.into());
        remote.update("todos", &id, fields).await.unwrap();

        let snapshot = remote
            .fetch(Query::new("todos", Task::CREATED_AT))
            .await
            .unwrap();
        let tasks: Vec<Task> = snapshot.decode_all().unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].completed);

        remote.delete("todos", &id).await.unwrap();
        assert_eq!(store.stats().documents, 0);

        let err = remote.delete("todos", &id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_permission_denied_is_classified() {
        let (_store, remote) = spawn_server().await;

        let err = remote
            .add("secrets", NewDocument::new().field("a", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);

        let err = remote
            .subscribe(Query::new("secrets", "a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[tokio::test]
    async fn test_live_query_over_websocket() {
        let (store, remote) = spawn_server().await;

        let mut live = remote
            .subscribe(Query::new("todos", Task::CREATED_AT))
            .await
            .unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());

        remote
            .add(
                "todos",
                NewDocument::new()
                    .field(Task::TEXT, "Buy milk")
                    .field(Task::CREATED_AT, 1),
            )
            .await
            .unwrap();
        assert_eq!(live.next().await.unwrap().unwrap().len(), 1);
        assert_eq!(store.subscription_count("todos"), 1);

        live.unsubscribe();
        assert!(live.next().await.is_none());
    }

    #[tokio::test]
    async fn test_server_shutdown_surfaces_as_error() {
        let (store, remote) = spawn_server().await;

        let mut live = remote
            .subscribe(Query::new("todos", Task::CREATED_AT))
            .await
            .unwrap();
        live.next().await.unwrap().unwrap();

        store.close();
        let err = live.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_task_view_against_server() {
        let (_store, remote) = spawn_server().await;
        let remote: Arc<dyn DocumentStore> = Arc::new(remote);

        let mut view = TaskListView::mount(remote).await;
        view.list_mut().wait_for(ViewState::is_ready).await;

        view.add_task("Buy milk").await.unwrap();
        let state = view
            .list_mut()
            .wait_for(|s| s.items().map(|i| i.len() == 1).unwrap_or(false))
            .await;
        assert_eq!(state.items().unwrap()[0].text, "Buy milk");

        view.unmount();
    }
}
