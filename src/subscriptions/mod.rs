//! Subscription system for live store updates.
//!
//! Two kinds of subscribers receive the same stream of snapshots:
//! - callbacks, invoked synchronously on the thread that applied the change
//! - bounded channels, for consumers on other threads
//!
//! Both receive the current snapshot at subscribe time, then every change in
//! the order it was applied. Callback panics are caught and logged. Channel
//! subscribers that fall behind are dropped.
//!
//! # Example
//!
//! ```ignore
//! let unsubscribe = store.subscribe(|snapshot| {
//!     println!("{} notes, loading = {}", snapshot.notes.len(), snapshot.loading);
//! });
//!
//! let handle = store.subscribe_channel(64);
//! while let Ok(StoreEvent::Changed(snapshot)) = handle.recv() {
//!     render(&snapshot);
//! }
//!
//! unsubscribe.unsubscribe();
//! ```

mod manager;
mod types;

pub use manager::{SubscriptionManager, Unsubscribe};
pub use types::{Callback, DropReason, StoreEvent, SubscriptionHandle, SubscriptionId};
