//! Data Transfer Objects
//!
//! Request and response types for the API endpoints. Shared with the remote
//! client, so every type goes both ways over JSON.

use serde::{Deserialize, Serialize};

use crate::store::{Direction, Document, Fields, Query};

/// Insert request: `{fields, server_timestamps}`
pub use crate::store::NewDocument as CreateDocumentRequest;

/// PATCH body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDocumentRequest {
    pub fields: Fields,
}

/// Query string of a one-shot snapshot read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQueryParams {
    pub order_by: String,
    #[serde(default)]
    pub direction: Direction,
}

impl ListQueryParams {
    pub fn into_query(self, collection: impl Into<String>) -> Query {
        Query {
            collection: collection.into(),
            order_by: self.order_by,
            direction: self.direction,
        }
    }
}

/// Insert response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Ordered result set of a one-shot read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub collection: String,
    pub total: usize,
    pub documents: Vec<Document>,
}

/// Full health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub collections: usize,
    pub documents: usize,
    pub live_queries: usize,
    pub ws_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
