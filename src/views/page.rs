//! Shared page plumbing
//!
//! A `Page` is a mounted live list plus the inline notice slot. The three
//! views embed one and add their forms and actions on top.

use std::sync::Arc;

use super::error::{Notice, ViewResult};
use crate::store::DocumentStore;
use crate::sync::{LiveList, Record, ViewState};

pub struct Page<T: Record> {
    store: Arc<dyn DocumentStore>,
    list: LiveList<T>,
    notice: Option<Notice>,
}

impl<T: Record> Page<T> {
    pub async fn mount(store: Arc<dyn DocumentStore>) -> Self {
        let list = LiveList::mount(store.as_ref()).await;
        Self {
            store,
            list,
            notice: None,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn state(&self) -> ViewState<T> {
        self.list.state()
    }

    pub fn list(&self) -> &LiveList<T> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut LiveList<T> {
        &mut self.list
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Find a record in the current list
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.list
            .state()
            .items()
            .and_then(|items| items.iter().find(|item| predicate(item)).cloned())
    }

    /// Record the outcome of an action in the notice slot
    ///
    /// Success clears any previous notice; failure replaces it. The live
    /// list is never touched.
    pub fn settle<R>(&mut self, action: &str, result: ViewResult<R>) -> ViewResult<R> {
        match &result {
            Ok(_) => self.notice = None,
            Err(e) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    action = %action,
                    error = %e,
                    "View action failed"
                );
                self.notice = Some(Notice::from(e));
            }
        }
        result
    }

    pub fn unmount(&mut self) {
        self.list.close();
    }
}
