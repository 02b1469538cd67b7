//! Document Routes
//!
//! - POST /api/v1/collections/:collection/documents - Insert a document
//! - GET /api/v1/collections/:collection/documents - One-shot ordered snapshot
//! - PATCH /api/v1/collections/:collection/documents/:id - Merge fields
//! - DELETE /api/v1/collections/:collection/documents/:id - Remove a document
//!
//! Mutations answer as soon as the store has committed. Live queries learn
//! about them through the WebSocket, not through these responses.

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    CreateDocumentRequest, CreatedResponse, ListQueryParams, SnapshotResponse,
    UpdateDocumentRequest,
};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::store::DocumentStore;

/// POST /api/v1/collections/:collection/documents
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Json(req): Json<CreateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.store.add(&collection, req).await?;

    tracing::info!(collection = %collection, document_id = %id, "Created document");

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/v1/collections/:collection/documents?order_by=..&direction=..
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    QueryParams(params): QueryParams<ListQueryParams>,
) -> ApiResult<Json<SnapshotResponse>> {
    let snapshot = state.store.fetch(params.into_query(&collection)).await?;

    Ok(Json(SnapshotResponse {
        collection,
        total: snapshot.len(),
        documents: snapshot.documents,
    }))
}

/// PATCH /api/v1/collections/:collection/documents/:id
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(req): Json<UpdateDocumentRequest>,
) -> ApiResult<StatusCode> {
    state.store.update(&collection, &id, req.fields).await?;

    tracing::debug!(collection = %collection, document_id = %id, "Updated document");

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/collections/:collection/documents/:id
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.store.delete(&collection, &id).await?;

    tracing::info!(collection = %collection, document_id = %id, "Deleted document");

    Ok(StatusCode::NO_CONTENT)
}
