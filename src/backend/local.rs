//! Local backend over a single persisted blob.

use super::storage::BlobFile;
use super::{BackendKind, NotesBackend};
use crate::codec;
use crate::config::LocalConfig;
use crate::error::{NotesError, Result};
use crate::types::{Note, NoteDraft, NotePatch, Timestamp};
use std::thread;
use tracing::debug;

/// Notes written the first time an absent blob is used.
pub fn example_notes() -> Vec<Note> {
    let now = Timestamp::now();
    let earlier = Timestamp(now.as_millis() - 1);
    vec![
        Note {
            id: codec::new_id(),
            title: "Welcome".to_string(),
            content: "Notes are saved on this device. Select one to edit it.".to_string(),
            created_at: earlier,
            updated_at: earlier,
        },
        Note {
            id: codec::new_id(),
            title: "Keyboard shortcuts".to_string(),
            content: "Arrow keys move focus, Enter opens a note, Back returns to the list."
                .to_string(),
            created_at: now,
            updated_at: now,
        },
    ]
}

/// Persists the full note array in one blob keyed by the configured
/// storage key. Every operation sleeps for the configured latency first.
pub struct LocalBackend {
    blob: BlobFile,
    config: LocalConfig,
}

impl LocalBackend {
    /// Open the blob named by `config.storage_key` under `config.dir`.
    pub fn open(config: LocalConfig) -> Result<Self> {
        let blob = BlobFile::open(&config.dir, &config.storage_key)?;
        debug!(path = %blob.path().display(), "opened local notes storage");
        Ok(Self { blob, config })
    }

    /// Get config.
    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            thread::sleep(self.config.latency);
        }
    }

    /// Read all notes, seeding an absent blob. Caller holds the lock.
    fn read_notes(&self) -> Result<Vec<Note>> {
        match self.blob.read()? {
            Some(bytes) => {
                let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
                codec::normalize_list(&raw)
                    .ok_or_else(|| NotesError::Storage("stored notes are not an array".into()))
            }
            None if self.config.seed_examples => {
                let seeded = example_notes();
                self.write_notes(&seeded)?;
                debug!(count = seeded.len(), "seeded local storage with example notes");
                Ok(seeded)
            }
            None => Ok(Vec::new()),
        }
    }

    fn write_notes(&self, notes: &[Note]) -> Result<()> {
        let bytes = serde_json::to_vec(notes)?;
        self.blob.write(&bytes)
    }

    /// Run a read-modify-write cycle under the blob lock.
    fn modify<T>(&self, f: impl FnOnce(&mut Vec<Note>) -> Result<T>) -> Result<T> {
        self.simulate_latency();
        let _lock = self.blob.lock()?;
        let mut notes = self.read_notes()?;
        let out = f(&mut notes)?;
        self.write_notes(&notes)?;
        Ok(out)
    }
}

impl NotesBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn restore(&self) -> Result<Vec<Note>> {
        let _lock = self.blob.lock()?;
        self.read_notes()
    }

    fn list(&self) -> Result<Vec<Note>> {
        self.simulate_latency();
        let _lock = self.blob.lock()?;
        self.read_notes()
    }

    fn create(&self, draft: &NoteDraft) -> Result<Note> {
        self.modify(|notes| {
            let now = Timestamp::now();
            let note = Note {
                id: codec::new_id(),
                title: draft.title.clone(),
                content: draft.content.clone(),
                created_at: now,
                updated_at: now,
            };
            notes.push(note.clone());
            Ok(note)
        })
    }

    fn update(&self, id: &str, patch: &NotePatch) -> Result<Note> {
        self.modify(|notes| {
            let note = notes
                .iter_mut()
                .find(|note| note.id == id)
                .ok_or_else(|| NotesError::NotFound(id.to_string()))?;
            patch.apply_to(note, Timestamp::now());
            Ok(note.clone())
        })
    }

    fn remove(&self, id: &str) -> Result<Note> {
        self.modify(|notes| {
            let idx = notes
                .iter()
                .position(|note| note.id == id)
                .ok_or_else(|| NotesError::NotFound(id.to_string()))?;
            Ok(notes.remove(idx))
        })
    }
}
