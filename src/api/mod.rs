//! Kodigo Store Server
//!
//! HTTP API over a [`MemoryStore`](crate::store::MemoryStore), built with Axum.
//!
//! # Endpoints
//!
//! ## Documents
//! - `POST /api/v1/collections/:collection/documents` - Insert, returns `{id}`
//! - `GET /api/v1/collections/:collection/documents?order_by=&direction=` - Ordered snapshot
//! - `PATCH /api/v1/collections/:collection/documents/:id` - Merge fields
//! - `DELETE /api/v1/collections/:collection/documents/:id` - Remove
//!
//! ## Live queries
//! - `GET /api/v1/ws` - WebSocket; see [`crate::websocket`]
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use kodigo::api::{serve, AppState};
//! use kodigo::config::ApiConfig;
//! use kodigo::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::in_memory());
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(store, config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorBody, ErrorResponse};
pub use state::AppState;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/collections/:collection/documents",
            get(routes::documents::list_documents).post(routes::documents::create_document),
        )
        .route(
            "/collections/:collection/documents/:id",
            axum::routing::patch(routes::documents::update_document)
                .delete(routes::documents::delete_document),
        )
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// CORS for the configured origins; no origins means permissive
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Kodigo API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Kodigo API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::{CreatedResponse, HealthResponse, SnapshotResponse};
    use crate::store::{MemoryStore, MemoryStoreConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde::de::DeserializeOwned;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<MemoryStore>) {
        let config = MemoryStoreConfig::default().allow(["todos", "messages"]);
        let store = Arc::new(MemoryStore::new(config).unwrap());
        let state = AppState::new(Arc::clone(&store), ApiConfig::default());
        (build_router(state), store)
    }

    async fn json_body<T: DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _store) = create_test_app();
        let response = app.oneshot(get("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_tracks_store() {
        let (app, store) = create_test_app();
        let response = app.clone().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        store.close();
        let response = app.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _store) = create_test_app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = json_body(response).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.documents, 0);
        assert_eq!(health.ws_connections, 0);
    }

    #[tokio::test]
    async fn test_create_then_list_in_order() {
        let (app, _store) = create_test_app();

        for (text, ts) in [("second", 2), ("first", 1)] {
            let body = format!(
                r#"{{"fields": {{"task_text": "{}", "created_at": {}}}}}"#,
                text, ts
            );
            let response = app
                .clone()
                .oneshot(post("/api/v1/collections/todos/documents", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let created: CreatedResponse = json_body(response).await;
            assert!(!created.id.is_empty());
        }

        let response = app
            .oneshot(get(
                "/api/v1/collections/todos/documents?order_by=created_at",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let snapshot: SnapshotResponse = json_body(response).await;
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.documents[0].fields["task_text"], "first");
        assert_eq!(snapshot.documents[1].fields["task_text"], "second");
    }

    #[tokio::test]
    async fn test_server_timestamp_on_create() {
        let (app, _store) = create_test_app();

        let response = app
            .clone()
            .oneshot(post(
                "/api/v1/collections/messages/documents",
                r#"{"fields": {"text": "hi", "user": "Ana"}, "server_timestamps": ["createdAt"]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(get(
                "/api/v1/collections/messages/documents?order_by=createdAt&direction=descending",
            ))
            .await
            .unwrap();
        let snapshot: SnapshotResponse = json_body(response).await;
        assert!(snapshot.documents[0].fields["createdAt"].is_i64());
    }

    #[tokio::test]
    async fn test_patch_and_delete() {
        let (app, store) = create_test_app();
        let response = app
            .clone()
            .oneshot(post(
                "/api/v1/collections/todos/documents",
                r#"{"fields": {"task_text": "x", "is_completed": false, "created_at": 1}}"#,
            ))
            .await
            .unwrap();
        let CreatedResponse { id } = json_body(response).await;
        let uri = format!("/api/v1/collections/todos/documents/{}", id);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(&uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"fields": {"is_completed": true}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(&uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(store.stats().documents, 0);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(&uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_collection_outside_allow_list() {
        let (app, _store) = create_test_app();
        let response = app
            .oneshot(post(
                "/api/v1/collections/secrets/documents",
                r#"{"fields": {"a": 1}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error.code, "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let (app, _store) = create_test_app();
        let response = app
            .oneshot(post("/api/v1/collections/todos/documents", "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_requires_order_by() {
        let (app, _store) = create_test_app();
        let response = app
            .oneshot(get("/api/v1/collections/todos/documents"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
