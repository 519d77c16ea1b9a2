//! Core types for the notes store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    ///
    /// A clock set before the epoch reads as zero rather than failing.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Timestamp(millis)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Timestamp(millis)
    }
}

/// A canonical note record.
///
/// Every record held by the store has passed through [`crate::codec::normalize`],
/// so `created_at <= updated_at` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Client- or server-assigned identifier, immutable once assigned.
    pub id: String,
    pub title: String,
    pub content: String,
    /// Set once at creation.
    pub created_at: Timestamp,
    /// Refreshed on every successful write.
    pub updated_at: Timestamp,
}

/// Fields for a note that does not exist yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Partial update. Absent fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// Apply onto an existing record, refreshing `updated_at`.
    pub fn apply_to(&self, note: &mut Note, now: Timestamp) {
        if let Some(ref title) = self.title {
            note.title = title.clone();
        }
        if let Some(ref content) = self.content {
            note.content = content.clone();
        }
        note.updated_at = now.max(note.created_at);
    }
}

/// State held by the store.
///
/// `notes` is kept in insertion order; display order comes from
/// [`crate::selectors::sorted_notes`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreState {
    pub notes: Vec<Note>,
    /// Always references a record in `notes`, or is `None`.
    pub selected_note_id: Option<String>,
    /// True while at least one action's I/O is in flight.
    pub loading: bool,
    /// Message of the most recent failure, cleared when an action starts.
    pub error: Option<String>,
    /// Increments on every emitted change.
    pub revision: u64,
}

impl StoreState {
    /// Initial state holding restored notes.
    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes,
            ..Default::default()
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Replace the record with the same id, or append it.
    pub(crate) fn upsert(&mut self, note: Note) {
        match self.position(&note.id) {
            Some(idx) => self.notes[idx] = note,
            None => self.notes.push(note),
        }
    }
}

/// Immutable view of store state handed to callers and subscribers.
pub type Snapshot = Arc<StoreState>;
