//! In-process document store
//!
//! Collections live in memory behind one mutex. Every commit re-evaluates the
//! live queries of the touched collection and pushes a full snapshot to each
//! subscriber, so subscribers observe commits in commit order. A subscriber
//! that falls behind skips straight to the newest snapshot.
//!
//! Persistence is optional: when a data directory is configured the store is
//! loaded from `documents.json` at startup and written back by `flush()`.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::time::{interval, Duration};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::persist::StoreFile;
use super::query::{validate_collection, Query};
use super::subscription::{snapshot_channel, SnapshotSender, Subscription};
use super::types::{Document, DocumentId, Fields, NewDocument, Snapshot};
use super::DocumentStore;

/// Configuration for the memory store
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Directory for `documents.json`; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    /// Background flush period in milliseconds (default: 5000)
    pub flush_interval_ms: u64,
    /// Collections clients may touch; empty allows every collection
    pub collections: Vec<String>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            flush_interval_ms: 5000,
            collections: Vec::new(),
        }
    }
}

impl MemoryStoreConfig {
    /// Persist to `data_dir`
    pub fn persistent(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    /// Builder method: restrict access to the given collections
    pub fn allow<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the persisted store image
    pub fn documents_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("documents.json"))
    }
}

/// Point-in-time store statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub collections: usize,
    pub documents: usize,
    pub subscriptions: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} collections, {} documents, {} live queries",
            self.collections, self.documents, self.subscriptions
        )
    }
}

struct Subscriber {
    query: Query,
    sender: SnapshotSender,
}

#[derive(Default)]
struct Collection {
    /// Insertion order
    documents: Vec<Document>,
    subscribers: HashMap<u64, Subscriber>,
}

impl Collection {
    /// Push a fresh snapshot to every subscriber, dropping dead ones
    fn notify(&mut self) {
        let documents = &self.documents;
        self.subscribers.retain(|_, sub| {
            let snapshot = Snapshot::new(sub.query.apply(documents));
            sub.sender.send(Ok(snapshot)).is_ok()
        });
    }
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, Collection>,
    next_subscriber_id: u64,
    last_server_timestamp: i64,
    dirty: bool,
    closed: bool,
}

impl StoreState {
    /// Commit timestamp in ms, strictly increasing across commits
    fn next_server_timestamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let ts = now.max(self.last_server_timestamp + 1);
        self.last_server_timestamp = ts;
        ts
    }

    fn to_file(&self) -> StoreFile {
        StoreFile {
            collections: self
                .collections
                .iter()
                .filter(|(_, c)| !c.documents.is_empty())
                .map(|(name, c)| (name.clone(), c.documents.clone()))
                .collect(),
            last_server_timestamp: self.last_server_timestamp,
        }
    }
}

/// In-process live document store
pub struct MemoryStore {
    config: MemoryStoreConfig,
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Open the store, loading persisted documents if configured
    pub fn new(config: MemoryStoreConfig) -> StoreResult<Self> {
        let mut state = StoreState::default();

        if let Some(path) = config.documents_path() {
            let file = StoreFile::load(&path)?;
            tracing::info!(
                path = %path.display(),
                documents = file.document_count(),
                "Loaded document store"
            );
            state.last_server_timestamp = file.last_server_timestamp;
            for (name, documents) in file.collections {
                state.collections.insert(
                    name,
                    Collection {
                        documents,
                        subscribers: HashMap::new(),
                    },
                );
            }
        }

        Ok(Self {
            config,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Volatile store with no access restrictions
    pub fn in_memory() -> Self {
        Self {
            config: MemoryStoreConfig::default(),
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Lock(format!("Failed to acquire store lock: {}", e)))
    }

    /// Lock the state, failing if the store has been closed
    fn lock_open(&self) -> StoreResult<MutexGuard<'_, StoreState>> {
        let state = self.lock()?;
        if state.closed {
            return Err(StoreError::Unavailable("store is shut down".to_string()));
        }
        Ok(state)
    }

    fn check_access(&self, collection: &str) -> StoreResult<()> {
        validate_collection(collection)?;
        if !self.config.collections.is_empty()
            && !self.config.collections.iter().any(|c| c == collection)
        {
            return Err(StoreError::PermissionDenied(format!(
                "missing or insufficient permissions for collection '{}'",
                collection
            )));
        }
        Ok(())
    }

    /// Number of live queries on a collection
    pub fn subscription_count(&self, collection: &str) -> usize {
        self.lock()
            .map(|state| {
                state
                    .collections
                    .get(collection)
                    .map(|c| c.subscribers.len())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Current statistics
    pub fn stats(&self) -> StoreStats {
        match self.lock() {
            Ok(state) => StoreStats {
                collections: state
                    .collections
                    .values()
                    .filter(|c| !c.documents.is_empty())
                    .count(),
                documents: state.collections.values().map(|c| c.documents.len()).sum(),
                subscriptions: state.collections.values().map(|c| c.subscribers.len()).sum(),
            },
            Err(_) => StoreStats::default(),
        }
    }

    /// Whether `close` or `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Write the store image to disk if anything changed since the last flush
    pub fn flush(&self) -> StoreResult<()> {
        let Some(path) = self.config.documents_path() else {
            return Ok(());
        };

        let file = {
            let mut state = self.lock()?;
            if !state.dirty {
                return Ok(());
            }
            state.dirty = false;
            state.to_file()
        };

        if let Err(e) = file.save(&path) {
            if let Ok(mut state) = self.lock() {
                state.dirty = true;
            }
            return Err(e);
        }

        tracing::debug!(
            path = %path.display(),
            documents = file.document_count(),
            "Flushed document store"
        );
        Ok(())
    }

    /// Start the periodic flush task
    pub fn start_background_flush(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let flush_interval = Duration::from_millis(store.config.flush_interval_ms.max(1));

        tokio::spawn(async move {
            let mut ticker = interval(flush_interval);

            loop {
                ticker.tick().await;

                if store.is_closed() {
                    break;
                }

                if let Err(e) = store.flush() {
                    tracing::error!("Background flush failed: {}", e);
                }
            }
        })
    }

    /// Terminate every live query with `Unavailable` and refuse further calls
    pub fn close(&self) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        if state.closed {
            return;
        }
        state.closed = true;

        let mut terminated = 0;
        for collection in state.collections.values_mut() {
            for (_, sub) in collection.subscribers.drain() {
                let _ = sub
                    .sender
                    .send(Err(StoreError::Unavailable("store is shut down".to_string())));
                terminated += 1;
            }
        }

        tracing::info!(live_queries = terminated, "Document store closed");
    }

    /// Close the store and write the final image
    pub fn shutdown(&self) -> StoreResult<()> {
        self.close();
        self.flush()
    }

    fn detach(state: &Weak<Mutex<StoreState>>, collection: &str, subscriber_id: u64) {
        let Some(state) = state.upgrade() else {
            return;
        };
        if let Ok(mut state) = state.lock() {
            if let Some(c) = state.collections.get_mut(collection) {
                c.subscribers.remove(&subscriber_id);
            }
        }
        tracing::debug!(collection = %collection, subscriber_id, "Live query detached");
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        query.validate()?;
        self.check_access(&query.collection)?;

        let mut state = self.lock_open()?;
        let subscriber_id = state.next_subscriber_id;
        state.next_subscriber_id += 1;

        let (tx, rx) = snapshot_channel();
        let collection = state
            .collections
            .entry(query.collection.clone())
            .or_default();

        // Initial emission, possibly empty
        let initial = Snapshot::new(query.apply(&collection.documents));
        let _ = tx.send(Ok(initial));

        let name = query.collection.clone();
        collection.subscribers.insert(
            subscriber_id,
            Subscriber {
                query,
                sender: tx,
            },
        );
        drop(state);

        tracing::debug!(collection = %name, subscriber_id, "Live query attached");

        let weak = Arc::downgrade(&self.state);
        Ok(Subscription::new(rx, move || {
            MemoryStore::detach(&weak, &name, subscriber_id)
        }))
    }

    async fn fetch(&self, query: Query) -> StoreResult<Snapshot> {
        query.validate()?;
        self.check_access(&query.collection)?;

        let state = self.lock_open()?;
        let documents = state
            .collections
            .get(&query.collection)
            .map(|c| query.apply(&c.documents))
            .unwrap_or_default();
        Ok(Snapshot::new(documents))
    }

    async fn add(&self, collection: &str, document: NewDocument) -> StoreResult<DocumentId> {
        self.check_access(collection)?;
        if document.server_timestamps.iter().any(|f| f.is_empty()) {
            return Err(StoreError::InvalidDocument(
                "server timestamp field name must not be empty".to_string(),
            ));
        }

        let mut state = self.lock_open()?;
        let NewDocument {
            mut fields,
            server_timestamps,
        } = document;

        if !server_timestamps.is_empty() {
            let ts = state.next_server_timestamp();
            for field in server_timestamps {
                fields.insert(field, ts.into());
            }
        }

        let id = Uuid::new_v4().simple().to_string();
        let c = state.collections.entry(collection.to_string()).or_default();
        c.documents.push(Document::new(id.clone(), fields));
        c.notify();
        state.dirty = true;

        tracing::debug!(collection = %collection, document_id = %id, "Document added");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.check_access(collection)?;

        let mut state = self.lock_open()?;
        let c = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let document = c
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        for (name, value) in fields {
            document.fields.insert(name, value);
        }
        c.notify();
        state.dirty = true;

        tracing::debug!(collection = %collection, document_id = %id, "Document updated");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_access(collection)?;

        let mut state = self.lock_open()?;
        let c = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let position = c
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        c.documents.remove(position);
        c.notify();
        state.dirty = true;

        tracing::debug!(collection = %collection, document_id = %id, "Document deleted");
        Ok(())
    }
}
