//! Live query subscriptions
//!
//! A `Subscription` is the receiving end of a live query plus the hook that
//! detaches it from its store. Detaching happens at most once, whichever of
//! `unsubscribe()`, a cloned [`SubscriptionHandle`], or `Drop` gets there
//! first.
//!
//! Emissions travel over a [`snapshot_channel`], which holds at most one
//! undelivered event. Every snapshot replaces the whole result set, so a
//! newer snapshot overwrites one the receiver has not taken yet and a slow
//! consumer only ever sees the latest state.

use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::types::SnapshotEvent;

#[derive(Default)]
struct Slot {
    pending: Option<SnapshotEvent>,
    sender_gone: bool,
    receiver_gone: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    notify: Notify,
}

/// Create a channel that keeps only the newest undelivered emission
///
/// An error is final: once pending it is never overwritten.
pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    let shared = Arc::new(Shared::default());
    (
        SnapshotSender {
            shared: Arc::clone(&shared),
        },
        SnapshotReceiver { shared },
    )
}

/// Producing side of a [`snapshot_channel`]
pub struct SnapshotSender {
    shared: Arc<Shared>,
}

impl SnapshotSender {
    /// Replace the pending emission. Hands the event back once the
    /// receiver is gone.
    pub fn send(&self, event: SnapshotEvent) -> Result<(), SnapshotEvent> {
        {
            let Ok(mut slot) = self.shared.slot.lock() else {
                return Err(event);
            };
            if slot.receiver_gone {
                return Err(event);
            }
            if !matches!(slot.pending, Some(Err(_))) {
                slot.pending = Some(event);
            }
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Whether the receiver has been closed or dropped
    pub fn is_closed(&self) -> bool {
        self.shared
            .slot
            .lock()
            .map(|slot| slot.receiver_gone)
            .unwrap_or(true)
    }
}

impl Drop for SnapshotSender {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.shared.slot.lock() {
            slot.sender_gone = true;
        }
        self.shared.notify.notify_one();
    }
}

/// Consuming side of a [`snapshot_channel`]
pub struct SnapshotReceiver {
    shared: Arc<Shared>,
}

impl SnapshotReceiver {
    /// Take the pending emission, waiting for one if needed
    ///
    /// Returns `None` once the channel is closed and nothing is pending.
    pub async fn recv(&mut self) -> Option<SnapshotEvent> {
        loop {
            {
                let mut slot = self.shared.slot.lock().ok()?;
                if let Some(event) = slot.pending.take() {
                    return Some(event);
                }
                if slot.sender_gone || slot.receiver_gone {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Stop receiving and discard anything pending
    pub fn close(&mut self) {
        if let Ok(mut slot) = self.shared.slot.lock() {
            slot.receiver_gone = true;
            slot.pending = None;
        }
        self.shared.notify.notify_one();
    }
}

impl Drop for SnapshotReceiver {
    fn drop(&mut self) {
        self.close();
    }
}

type CancelFn = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable cancel side of a subscription
#[derive(Clone)]
pub struct SubscriptionHandle {
    cancel: Arc<Mutex<Option<CancelFn>>>,
}

impl SubscriptionHandle {
    /// Detach from the store. Returns false if already detached.
    pub fn unsubscribe(&self) -> bool {
        let cancel = self.cancel.lock().ok().and_then(|mut slot| slot.take());
        match cancel {
            Some(cancel) => {
                cancel();
                true
            }
            None => false,
        }
    }

    /// Whether the subscription is still attached
    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Handle to a live query
pub struct Subscription {
    events: SnapshotReceiver,
    handle: SubscriptionHandle,
}

impl Subscription {
    /// Wrap an event channel; `cancel` runs exactly once on teardown
    pub fn new(events: SnapshotReceiver, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            handle: SubscriptionHandle {
                cancel: Arc::new(Mutex::new(Some(Box::new(cancel)))),
            },
        }
    }

    /// Cancel side that can outlive a move of the subscription into a task
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Wait for the next emission
    ///
    /// Returns `None` once the subscription is cancelled or the store has
    /// dropped its side. Emissions still buffered at cancel time are
    /// discarded.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        if !self.handle.is_active() {
            return None;
        }
        let event = self.events.recv().await?;
        if !self.handle.is_active() {
            return None;
        }
        Some(event)
    }

    /// Detach from the store. Further calls are no-ops.
    pub fn unsubscribe(&mut self) {
        self.handle.unsubscribe();
        self.events.close();
    }

    /// Whether the subscription is still attached
    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::error::StoreError;
    use crate::store::types::{Document, Fields, Snapshot};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_subscription() -> (Subscription, SnapshotSender, Arc<AtomicUsize>) {
        let (tx, rx) = snapshot_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = Subscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (sub, tx, calls)
    }

    #[tokio::test]
    async fn test_next_receives_events() {
        let (mut sub, tx, _) = counting_subscription();
        tx.send(Ok(Snapshot::default())).unwrap();
        let event = sub.next().await.unwrap();
        assert!(event.unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_runs_once() {
        let (mut sub, _tx, calls) = counting_subscription();
        let handle = sub.handle();
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!handle.unsubscribe());
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let (sub, _tx, calls) = counting_subscription();
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handle_cancels_and_discards_buffered_events() {
        let (mut sub, tx, calls) = counting_subscription();
        tx.send(Ok(Snapshot::default())).unwrap();

        let handle = sub.handle();
        assert!(handle.unsubscribe());

        assert!(sub.next().await.is_none());
        assert!(!sub.is_active());
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn snapshot_of(len: usize) -> Snapshot {
        Snapshot::new(
            (0..len)
                .map(|i| Document::new(format!("doc-{}", i), Fields::new()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_stalled_receiver_sees_only_latest() {
        let (mut sub, tx, _) = counting_subscription();
        for len in 0..=500 {
            tx.send(Ok(snapshot_of(len))).unwrap();
        }

        let latest = sub.next().await.unwrap().unwrap();
        assert_eq!(latest.len(), 500);

        let nothing_buffered =
            tokio::time::timeout(Duration::from_millis(20), sub.next()).await;
        assert!(nothing_buffered.is_err());
    }

    #[tokio::test]
    async fn test_pending_error_is_not_overwritten() {
        let (mut sub, tx, _) = counting_subscription();
        tx.send(Ok(snapshot_of(1))).unwrap();
        tx.send(Err(StoreError::Unavailable("gone".into()))).unwrap();
        tx.send(Ok(snapshot_of(2))).unwrap();

        let event = sub.next().await.unwrap();
        assert!(matches!(event, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_sender_drop_ends_after_pending() {
        let (mut sub, tx, _) = counting_subscription();
        tx.send(Ok(snapshot_of(3))).unwrap();
        drop(tx);

        assert_eq!(sub.next().await.unwrap().unwrap().len(), 3);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_fails_once_receiver_closed() {
        let (mut sub, tx, _) = counting_subscription();
        sub.unsubscribe();
        assert!(tx.is_closed());
        assert!(tx.send(Ok(Snapshot::default())).is_err());
    }
}
