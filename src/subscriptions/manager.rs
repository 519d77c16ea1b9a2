//! Subscription manager: ordered, re-entrancy safe snapshot delivery.

use crate::types::Snapshot;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{error, warn};

use super::types::{Callback, DropReason, StoreEvent, SubscriptionHandle, SubscriptionId};

enum Sink {
    Callback(Callback),
    Channel(Sender<StoreEvent>),
}

/// Internal subscription state.
struct Subscriber {
    id: SubscriptionId,
    sink: Sink,
    /// Last delivered revision + 1 (0 = nothing delivered yet).
    seen: AtomicU64,
    active: AtomicBool,
}

enum Delivery {
    Delivered,
    Skipped,
    Overflowed,
}

impl Subscriber {
    fn deliver(&self, snapshot: &Snapshot) -> Delivery {
        if !self.active.load(Ordering::SeqCst) {
            return Delivery::Skipped;
        }
        // Never go backwards: a subscriber added mid-drain already saw newer state.
        let mark = snapshot.revision + 1;
        if self.seen.fetch_max(mark, Ordering::SeqCst) >= mark {
            return Delivery::Skipped;
        }

        match &self.sink {
            Sink::Callback(callback) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot)));
                if let Err(payload) = outcome {
                    error!(
                        subscription = %self.id,
                        panic = panic_message(payload.as_ref()),
                        "subscriber panicked; continuing"
                    );
                }
                Delivery::Delivered
            }
            Sink::Channel(sender) => match sender.try_send(StoreEvent::Changed(snapshot.clone())) {
                Ok(()) => Delivery::Delivered,
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                    Delivery::Overflowed
                }
            },
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

/// Manages subscribers and broadcasts snapshots.
///
/// Every change is published through [`SubscriptionManager::publish`], which
/// serializes "apply change, enqueue snapshot" across threads. Snapshots
/// produced while a delivery loop is already running on the current thread
/// (a subscriber calling back into the store) are queued and delivered by
/// that loop once the current snapshot has reached every subscriber.
pub struct SubscriptionManager {
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    next_id: AtomicU64,
    pending: Mutex<VecDeque<Snapshot>>,
    /// Held while applying a change; the flag marks an active delivery loop.
    dispatch: ReentrantMutex<Cell<bool>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(VecDeque::new()),
            dispatch: ReentrantMutex::new(Cell::new(false)),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a callback and immediately hand it `current()`.
    pub fn subscribe(
        &self,
        callback: Callback,
        current: impl FnOnce() -> Snapshot,
    ) -> SubscriptionId {
        self.register(Sink::Callback(callback), current)
    }

    /// Register a bounded channel subscriber, seeded with `current()`.
    pub fn subscribe_channel(
        &self,
        buffer_size: usize,
        current: impl FnOnce() -> Snapshot,
    ) -> SubscriptionHandle {
        let (sender, receiver) = bounded(buffer_size.max(1));
        let id = self.register(Sink::Channel(sender), current);
        SubscriptionHandle { id, receiver }
    }

    fn register(&self, sink: Sink, current: impl FnOnce() -> Snapshot) -> SubscriptionId {
        let _guard = self.dispatch.lock();
        let subscriber = Arc::new(Subscriber {
            id: self.next_id(),
            sink,
            seen: AtomicU64::new(0),
            active: AtomicBool::new(true),
        });
        self.subscribers.lock().push(Arc::clone(&subscriber));

        let snapshot = current();
        if let Delivery::Overflowed = subscriber.deliver(&snapshot) {
            self.drop_subscriber(subscriber.id, DropReason::BufferOverflow);
        }
        subscriber.id
    }

    /// Unsubscribe. Safe to call from inside a callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.drop_subscriber(id, DropReason::Unsubscribed)
    }

    fn drop_subscriber(&self, id: SubscriptionId, reason: DropReason) -> bool {
        let removed = {
            let mut subs = self.subscribers.lock();
            subs.iter()
                .position(|sub| sub.id == id)
                .map(|idx| subs.remove(idx))
        };
        let Some(sub) = removed else {
            return false;
        };
        sub.active.store(false, Ordering::SeqCst);

        if let Sink::Channel(ref sender) = sub.sink {
            if reason == DropReason::BufferOverflow {
                warn!(subscription = %id, "dropping slow channel subscriber");
            }
            // Best effort; the buffer may be full.
            let _ = sender.try_send(StoreEvent::Dropped { reason });
        }
        true
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Apply a change and broadcast the snapshot it produces.
    ///
    /// `change` runs with the dispatch lock held, so snapshots are enqueued
    /// in the same order their changes were applied.
    pub fn publish(&self, change: impl FnOnce() -> Snapshot) {
        let guard = self.dispatch.lock();
        let snapshot = change();
        self.pending.lock().push_back(snapshot);

        if guard.get() {
            // The loop further up this thread's stack will deliver it.
            return;
        }

        guard.set(true);
        loop {
            let next = self.pending.lock().pop_front();
            let Some(snapshot) = next else { break };
            self.broadcast(&snapshot);
        }
        guard.set(false);
    }

    fn broadcast(&self, snapshot: &Snapshot) {
        // Iterate a copy so callbacks may (un)subscribe freely.
        let subs: Vec<Arc<Subscriber>> = self.subscribers.lock().clone();

        let mut overflowed = Vec::new();
        for sub in &subs {
            if let Delivery::Overflowed = sub.deliver(snapshot) {
                overflowed.push(sub.id);
            }
        }

        for id in overflowed {
            self.drop_subscriber(id, DropReason::BufferOverflow);
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes one callback subscription when invoked.
///
/// Dropping this without calling [`Unsubscribe::unsubscribe`] keeps the
/// subscription alive for the lifetime of the store.
pub struct Unsubscribe {
    id: SubscriptionId,
    manager: Weak<SubscriptionManager>,
}

impl Unsubscribe {
    pub(crate) fn new(id: SubscriptionId, manager: &Arc<SubscriptionManager>) -> Self {
        Self {
            id,
            manager: Arc::downgrade(manager),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscription. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.manager
            .upgrade()
            .map(|manager| manager.unsubscribe(self.id))
            .unwrap_or(false)
    }
}
