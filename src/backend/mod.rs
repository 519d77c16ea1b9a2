//! Persistence backends.
//!
//! The store talks to durable storage through [`NotesBackend`]. Two
//! implementations exist:
//! - [`RemoteBackend`]: one JSON HTTP round trip per operation
//! - [`LocalBackend`]: read-modify-write of a single on-disk blob
//!
//! The variant is chosen once from [`crate::config::BackendConfig`] and does
//! not change for the lifetime of a store.

mod local;
mod remote;
mod storage;

pub use local::{example_notes, LocalBackend};
pub use remote::RemoteBackend;
pub use storage::{BlobFile, BlobLock};

use crate::config::BackendConfig;
use crate::error::Result;
use crate::types::{Note, NoteDraft, NotePatch};
use std::sync::Arc;

/// Which backend variant is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Local,
    /// Caller-supplied implementation.
    Custom,
}

/// CRUD contract shared by every backend.
///
/// Returned records are canonical: implementations pass raw payloads through
/// [`crate::codec`] before handing them out.
pub trait NotesBackend: Send + Sync {
    fn kind(&self) -> BackendKind {
        BackendKind::Custom
    }

    /// Notes to seed the store with at construction, without I/O latency.
    fn restore(&self) -> Result<Vec<Note>> {
        Ok(Vec::new())
    }

    /// All notes.
    fn list(&self) -> Result<Vec<Note>>;

    /// Create a note; the backend assigns id and timestamps.
    fn create(&self, draft: &NoteDraft) -> Result<Note>;

    /// Update present fields of an existing note. `NotFound` if absent.
    fn update(&self, id: &str, patch: &NotePatch) -> Result<Note>;

    /// Remove a note, returning the removed record. `NotFound` if absent.
    fn remove(&self, id: &str) -> Result<Note>;
}

/// Build the backend described by `config`.
pub fn open_backend(config: &BackendConfig) -> Result<Arc<dyn NotesBackend>> {
    match config {
        BackendConfig::Remote(remote) => Ok(Arc::new(RemoteBackend::new(remote.clone())?)),
        BackendConfig::Local(local) => Ok(Arc::new(LocalBackend::open(local.clone())?)),
    }
}
