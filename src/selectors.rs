//! Pure derived views over a state snapshot.
//!
//! These take any [`StoreState`], live or not.

use crate::types::{Note, StoreState};
use std::cmp::Ordering;

/// The selected note, if the selection is set and still present.
pub fn selected_note(state: &StoreState) -> Option<&Note> {
    let id = state.selected_note_id.as_deref()?;
    state.notes.iter().find(|note| note.id == id)
}

/// Notes in display order: most recently updated first.
///
/// Ties fall back to case-insensitive title, then exact title, then id.
/// Ids are unique, so the order is total.
pub fn sorted_notes(state: &StoreState) -> Vec<&Note> {
    let mut notes: Vec<&Note> = state.notes.iter().collect();
    notes.sort_by(|a, b| display_order(a, b));
    notes
}

/// Comparator behind [`sorted_notes`].
pub fn display_order(a: &Note, b: &Note) -> Ordering {
    b.updated_at
        .cmp(&a.updated_at)
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

/// Whether any action is in flight.
pub fn is_loading(state: &StoreState) -> bool {
    state.loading
}

/// Message of the last failed action, if any.
pub fn error(state: &StoreState) -> Option<&str> {
    state.error.as_deref()
}
