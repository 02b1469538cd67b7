//! Kodigo Document Store
//!
//! The store is the single source of truth for every view. Views only talk to
//! it through the [`DocumentStore`] trait:
//!
//! - **types**: `Document`, `NewDocument`, `Snapshot`
//! - **query**: ordered collection queries
//! - **subscription**: live query handles with exactly-once teardown
//! - **memory**: in-process store with optional JSON persistence
//! - **persist**: on-disk image format
//! - **error**: error types and classification
//!
//! # Data Flow
//!
//! ```text
//! Mutation:
//!   add/update/delete → commit → re-run live queries → Snapshot to each subscriber
//!
//! Live query:
//!   subscribe → initial Snapshot → Snapshot per commit ... → unsubscribe
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use kodigo::store::{DocumentStore, MemoryStore, NewDocument, Query};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::in_memory();
//!
//!     let mut live = store.subscribe(Query::new("todos", "created_at")).await?;
//!     store
//!         .add("todos", NewDocument::new().field("task_text", "Buy milk").field("created_at", 1))
//!         .await?;
//!
//!     while let Some(snapshot) = live.next().await {
//!         println!("{} todos", snapshot?.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod persist;
pub mod query;
pub mod subscription;
pub mod types;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use memory::{MemoryStore, MemoryStoreConfig, StoreStats};
pub use persist::StoreFile;
pub use query::{Direction, Query};
pub use subscription::{
    snapshot_channel, SnapshotReceiver, SnapshotSender, Subscription, SubscriptionHandle,
};
pub use types::{Document, DocumentId, Fields, NewDocument, Snapshot, SnapshotEvent};

use async_trait::async_trait;

/// A document database with ordered live queries
///
/// Mutations are fire-and-forget from the caller's point of view: their
/// effect becomes visible through the next emission of any live query on the
/// same collection, never through the mutation's own return value.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live query
    ///
    /// The subscription first yields the current result set, then a full
    /// replacement result set after every change to the collection.
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;

    /// Run a query once
    async fn fetch(&self, query: Query) -> StoreResult<Snapshot>;

    /// Insert a document; the store assigns its id
    async fn add(&self, collection: &str, document: NewDocument) -> StoreResult<DocumentId>;

    /// Merge `fields` into an existing document
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Remove a document
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}
