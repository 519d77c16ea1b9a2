//! The notes store: single source of truth for notes and selection.

use crate::backend::{open_backend, BackendKind, NotesBackend};
use crate::config::StoreConfig;
use crate::error::{NotesError, Result};
use crate::subscriptions::{SubscriptionHandle, SubscriptionId, SubscriptionManager, Unsubscribe};
use crate::types::{Note, NoteDraft, NotePatch, Snapshot, StoreState};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Mutable store internals, guarded together.
struct Inner {
    state: Snapshot,
    /// Actions between their entry and completion transitions.
    in_flight: usize,
}

/// State container for notes.
///
/// Owns the canonical note list and selection, mediates all CRUD through
/// the configured [`NotesBackend`], and notifies subscribers of every change.
///
/// I/O actions follow the same protocol:
/// 1. entry: `loading = true`, `error = None`, emit
/// 2. backend call, with no store lock held
/// 3. outcome: merge the result, or record the error message, emit
/// 4. completion: `loading` drops back once no action is in flight, emit
///
/// Actions invoked concurrently from several threads interleave at the
/// backend call; they are neither queued nor rejected.
pub struct NotesStore {
    backend: Arc<dyn NotesBackend>,
    inner: Mutex<Inner>,
    subscriptions: Arc<SubscriptionManager>,
}

impl NotesStore {
    /// Build the configured backend and a store over it.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let backend = open_backend(&config.backend)?;
        Self::with_backend(backend)
    }

    /// Create a store over an existing backend, restoring persisted notes.
    pub fn with_backend(backend: Arc<dyn NotesBackend>) -> Result<Self> {
        let restored = dedupe_by_id(backend.restore()?);
        debug!(kind = ?backend.kind(), count = restored.len(), "notes store created");

        Ok(Self {
            backend,
            inner: Mutex::new(Inner {
                state: Arc::new(StoreState::with_notes(restored)),
                in_flight: 0,
            }),
            subscriptions: Arc::new(SubscriptionManager::new()),
        })
    }

    /// Which persistence backend this store runs on.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Current immutable snapshot.
    pub fn get_state(&self) -> Snapshot {
        Arc::clone(&self.inner.lock().state)
    }

    // --- Subscriptions ---

    /// Call `callback` now with the current snapshot, then on every change.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = self
            .subscriptions
            .subscribe(Arc::new(callback), || self.get_state());
        Unsubscribe::new(id, &self.subscriptions)
    }

    /// Subscribe through a bounded channel.
    pub fn subscribe_channel(&self, buffer_size: usize) -> SubscriptionHandle {
        self.subscriptions
            .subscribe_channel(buffer_size, || self.get_state())
    }

    /// Remove a subscriber by id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    // --- Actions ---

    /// Replace all notes with the backend's list.
    ///
    /// A selection that no longer exists is cleared.
    pub fn load_notes(&self) -> Result<()> {
        self.run(
            "load_notes",
            |backend| backend.list().map(dedupe_by_id),
            |state, notes| {
                state.notes = notes.clone();
                if let Some(ref id) = state.selected_note_id {
                    if !state.contains(id) {
                        state.selected_note_id = None;
                    }
                }
            },
        )
        .map(|_| ())
    }

    /// Create a note and select it.
    pub fn add_note(&self, draft: NoteDraft) -> Result<Note> {
        self.run(
            "add_note",
            move |backend| backend.create(&draft),
            |state, note| {
                state.upsert(note.clone());
                state.selected_note_id = Some(note.id.clone());
            },
        )
    }

    /// Update present fields of a note. Selection is untouched.
    pub fn update_note(&self, id: &str, patch: NotePatch) -> Result<Note> {
        self.validate_id("update_note", id)?;
        self.run(
            "update_note",
            |backend| backend.update(id, &patch),
            |state, note| state.upsert(note.clone()),
        )
    }

    /// Delete a note.
    ///
    /// Deleting the selected note moves the selection to the first remaining
    /// note, or clears it. Returns the store's last copy of the record when
    /// it had one, otherwise what the backend reported.
    pub fn delete_note(&self, id: &str) -> Result<Note> {
        self.validate_id("delete_note", id)?;

        let mut local_copy = None;
        let removed = self.run(
            "delete_note",
            |backend| backend.remove(id),
            |state, _| {
                if let Some(idx) = state.position(id) {
                    local_copy = Some(state.notes.remove(idx));
                }
                if state.selected_note_id.as_deref() == Some(id) {
                    state.selected_note_id = state.notes.first().map(|note| note.id.clone());
                }
            },
        )?;
        Ok(local_copy.unwrap_or(removed))
    }

    /// Select a note, or clear the selection with `None`.
    ///
    /// An unknown id leaves the selection unchanged and sets `error`.
    pub fn select_note(&self, id: Option<&str>) -> Result<()> {
        let mut outcome = Ok(());
        self.commit(|state, _| {
            state.error = None;
            match id {
                None => state.selected_note_id = None,
                Some(id) if state.contains(id) => state.selected_note_id = Some(id.to_string()),
                Some(id) => {
                    let err = NotesError::NotFound(id.to_string());
                    state.error = Some(err.to_string());
                    outcome = Err(err);
                }
            }
        });
        outcome
    }

    // --- Internals ---

    /// Apply one state transition and emit it.
    fn commit(&self, change: impl FnOnce(&mut StoreState, &mut usize)) {
        self.subscriptions.publish(|| {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let state = Arc::make_mut(&mut inner.state);
            change(state, &mut inner.in_flight);
            state.revision += 1;
            Arc::clone(&inner.state)
        });
    }

    /// Reject an empty id without touching `loading`.
    fn validate_id(&self, action: &'static str, id: &str) -> Result<()> {
        if !id.trim().is_empty() {
            return Ok(());
        }
        let err = NotesError::Validation(format!("{action} requires a note id"));
        warn!(action, "rejected request without id");
        let message = err.to_string();
        self.commit(|state, _| state.error = Some(message));
        Err(err)
    }

    /// Run one I/O action through the entry / outcome / completion protocol.
    fn run<T>(
        &self,
        action: &'static str,
        io: impl FnOnce(&dyn NotesBackend) -> Result<T>,
        apply: impl FnOnce(&mut StoreState, &T),
    ) -> Result<T> {
        debug!(action, "action started");
        self.commit(|state, in_flight| {
            *in_flight += 1;
            state.loading = true;
            state.error = None;
        });

        let result = io(self.backend.as_ref());

        match &result {
            Ok(value) => self.commit(|state, _| apply(state, value)),
            Err(err) => {
                warn!(action, error = %err, "action failed");
                let message = err.to_string();
                self.commit(|state, _| state.error = Some(message));
            }
        }

        self.commit(|state, in_flight| {
            *in_flight = in_flight.saturating_sub(1);
            state.loading = *in_flight > 0;
        });
        debug!(action, ok = result.is_ok(), "action finished");
        result
    }
}

fn dedupe_by_id(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::new();
    notes
        .into_iter()
        .filter(|note| seen.insert(note.id.clone()))
        .collect()
}
