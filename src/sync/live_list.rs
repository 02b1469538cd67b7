//! Live list synchronizer
//!
//! Keeps a local ordered list in step with one remote collection. A mounted
//! `LiveList` owns exactly one live query; a background task turns every
//! emission into a `ViewState` update published on a `watch` channel. The
//! list never predicts the outcome of a mutation: it changes only when the
//! store emits.

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::state::ViewState;
use crate::store::{DocumentStore, Query, Subscription, SubscriptionHandle};

/// A record type backed by one collection
pub trait Record: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection holding the records
    const COLLECTION: &'static str;
    /// Field the live list is ordered by (ascending)
    const ORDER_KEY: &'static str;

    /// The live query a view mounts
    fn query() -> Query {
        Query::new(Self::COLLECTION, Self::ORDER_KEY)
    }
}

/// Local mirror of a live query
pub struct LiveList<T: Record> {
    state: watch::Receiver<ViewState<T>>,
    handle: Option<SubscriptionHandle>,
    task: Option<JoinHandle<()>>,
}

impl<T: Record> LiveList<T> {
    /// Open the live query and start mirroring it
    ///
    /// A failure to open the query is not returned: it lands the list in
    /// `ViewState::Error`, the same as a failure later on.
    pub async fn mount(store: &dyn DocumentStore) -> Self {
        let (tx, rx) = watch::channel(ViewState::Loading);

        match store.subscribe(T::query()).await {
            Ok(subscription) => {
                let handle = subscription.handle();
                let task = tokio::spawn(forward(subscription, tx));
                tracing::debug!(collection = T::COLLECTION, "Live list mounted");
                Self {
                    state: rx,
                    handle: Some(handle),
                    task: Some(task),
                }
            }
            Err(e) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    error = %e,
                    "Live query could not be opened"
                );
                tx.send_modify(|state| {
                    state.fail(e.to_string());
                });
                Self {
                    state: rx,
                    handle: None,
                    task: None,
                }
            }
        }
    }

    /// Current state
    pub fn state(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state change
    pub fn watch(&self) -> watch::Receiver<ViewState<T>> {
        self.state.clone()
    }

    /// Wait for the next state change; false once no more can come
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Wait until the state satisfies `predicate`
    ///
    /// If the list stops changing first, returns the final state.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&ViewState<T>) -> bool) -> ViewState<T> {
        loop {
            {
                let current = self.state.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            if self.state.changed().await.is_err() {
                return self.state.borrow().clone();
            }
        }
    }

    /// Whether the live query is still attached
    pub fn is_subscribed(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_active()).unwrap_or(false)
    }

    /// Tear down the live query. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.unsubscribe() {
                tracing::debug!(collection = T::COLLECTION, "Live list unmounted");
            }
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T: Record> Drop for LiveList<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pump emissions into the view state until cancelled or failed
async fn forward<T: Record>(mut subscription: Subscription, state: watch::Sender<ViewState<T>>) {
    while let Some(event) = subscription.next().await {
        match event {
            Ok(snapshot) => {
                let (list, rejected) = snapshot.decode_each::<T>();
                for e in &rejected {
                    tracing::warn!(
                        collection = T::COLLECTION,
                        error = %e,
                        "Skipping document that does not fit the record type"
                    );
                }
                tracing::trace!(
                    collection = T::COLLECTION,
                    records = list.len(),
                    "Snapshot applied"
                );
                state.send_if_modified(|s| s.apply(list));
            }
            Err(e) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    error = %e,
                    "Live query failed"
                );
                state.send_if_modified(|s| s.fail(e.to_string()));
                subscription.unsubscribe();
                return;
            }
        }
    }

    // The store hung up without an error and without being asked to
    if subscription.is_active() {
        state.send_if_modified(|s| s.fail("live query ended unexpectedly"));
        subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MemoryStoreConfig, NewDocument};
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Note {
        id: String,
        body: String,
        at: i64,
    }

    impl Record for Note {
        const COLLECTION: &'static str = "notes";
        const ORDER_KEY: &'static str = "at";
    }

    fn note(body: &str, at: i64) -> NewDocument {
        NewDocument::new().field("body", body).field("at", at)
    }

    #[tokio::test]
    async fn test_loading_then_ready() {
        let store = MemoryStore::in_memory();
        let mut list = LiveList::<Note>::mount(&store).await;

        let state = list.wait_for(|s| !s.is_loading()).await;
        assert_eq!(state, ViewState::Ready(vec![]));
    }

    #[tokio::test]
    async fn test_follows_store_in_order() {
        let store = MemoryStore::in_memory();
        let mut list = LiveList::<Note>::mount(&store).await;
        list.wait_for(ViewState::is_ready).await;

        store.add("notes", note("later", 20)).await.unwrap();
        store.add("notes", note("earlier", 10)).await.unwrap();

        let state = list
            .wait_for(|s| s.items().map(|i| i.len() == 2).unwrap_or(false))
            .await;
        let bodies: Vec<_> = state.items().unwrap().iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["earlier", "later"]);
    }

    #[tokio::test]
    async fn test_permission_error_is_blocking() {
        let store = MemoryStore::new(MemoryStoreConfig::default().allow(["todos"])).unwrap();
        let list = LiveList::<Note>::mount(&store).await;

        let state = list.state();
        assert!(state.is_error());
        assert!(state.error().unwrap().contains("Permission denied"));
        assert!(state.items().is_none());
        assert!(!list.is_subscribed());
    }

    #[tokio::test]
    async fn test_store_failure_is_terminal() {
        let store = MemoryStore::in_memory();
        let mut list = LiveList::<Note>::mount(&store).await;
        list.wait_for(ViewState::is_ready).await;

        store.close();

        let state = list.wait_for(ViewState::is_error).await;
        assert!(state.error().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_misfit_document_is_skipped() {
        let store = MemoryStore::in_memory();
        let mut list = LiveList::<Note>::mount(&store).await;
        list.wait_for(ViewState::is_ready).await;

        store.add("notes", note("first", 1)).await.unwrap();
        store
            .add("notes", NewDocument::new().field("at", 2))
            .await
            .unwrap();
        store.add("notes", note("third", 3)).await.unwrap();

        let state = list
            .wait_for(|s| s.items().map(|i| i.len() == 2).unwrap_or(false))
            .await;
        let bodies: Vec<_> = state.items().unwrap().iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "third"]);
        assert!(list.is_subscribed());
        assert_eq!(store.subscription_count("notes"), 1);
    }

    #[tokio::test]
    async fn test_close_detaches_exactly_once() {
        let store = MemoryStore::in_memory();
        let mut list = LiveList::<Note>::mount(&store).await;
        assert_eq!(store.subscription_count("notes"), 1);

        list.close();
        list.close();
        assert_eq!(store.subscription_count("notes"), 0);
        assert!(!list.is_subscribed());

        drop(list);
        assert_eq!(store.subscription_count("notes"), 0);
    }

    #[tokio::test]
    async fn test_drop_detaches() {
        let store = MemoryStore::in_memory();
        {
            let _list = LiveList::<Note>::mount(&store).await;
            assert_eq!(store.subscription_count("notes"), 1);
        }
        assert_eq!(store.subscription_count("notes"), 0);
    }
}
