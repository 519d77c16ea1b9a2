//! # Notes Store
//!
//! An observable state container for short text notes.
//!
//! ## Core Concepts
//!
//! - **Store**: owns the note list and selection; all changes go through its actions
//! - **Backends**: Remote (JSON over HTTP) or Local (one checksummed blob on disk)
//! - **Codec**: normalizes untrusted payloads into canonical [`Note`]s
//! - **Subscriptions**: callbacks and channels receiving every snapshot, in order
//! - **Selectors**: pure derived views over any snapshot
//!
//! ## Example
//!
//! ```ignore
//! use notes_store::{selectors, NoteDraft, NotesStore, StoreConfig};
//!
//! let store = NotesStore::open(StoreConfig::from_env()?)?;
//!
//! let _unsubscribe = store.subscribe(|snapshot| {
//!     for note in selectors::sorted_notes(snapshot) {
//!         println!("{}", note.title);
//!     }
//! });
//!
//! store.load_notes()?;
//! store.add_note(NoteDraft::new("Groceries", "Milk, eggs"))?;
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod selectors;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use backend::{BackendKind, LocalBackend, NotesBackend, RemoteBackend};
pub use config::{BackendConfig, LocalConfig, RemoteConfig, StoreConfig};
pub use error::{ErrorKind, NotesError, Result};
pub use store::NotesStore;
pub use subscriptions::{
    DropReason, StoreEvent, SubscriptionHandle, SubscriptionId, Unsubscribe,
};
pub use types::*;
