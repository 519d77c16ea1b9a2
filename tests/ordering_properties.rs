//! Property tests for display ordering and id uniqueness.

use notes_store::selectors::{display_order, sorted_notes};
use notes_store::{codec, Note, StoreState, Timestamp};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;

fn note_strategy() -> impl Strategy<Value = (i64, String)> {
    // Narrow ranges so ties are common.
    (0i64..5, prop::sample::select(vec!["a", "A", "b", "B", "", "apple", "Apple"]))
        .prop_map(|(updated, title)| (updated, title.to_string()))
}

fn build_notes(entries: &[(i64, String)]) -> Vec<Note> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (updated, title))| Note {
            id: format!("n{i}"),
            title: title.clone(),
            content: String::new(),
            created_at: Timestamp(0),
            updated_at: Timestamp(*updated),
        })
        .collect()
}

fn order_ids(notes: Vec<Note>) -> Vec<String> {
    let state = StoreState::with_notes(notes);
    sorted_notes(&state).iter().map(|n| n.id.clone()).collect()
}

proptest! {
    #[test]
    fn sorted_notes_ignores_input_order(
        entries in prop::collection::vec(note_strategy(), 0..20),
        seed in any::<u64>(),
    ) {
        let notes = build_notes(&entries);
        let mut shuffled = notes.clone();
        // Deterministic rotation + reversal as a permutation.
        if !shuffled.is_empty() {
            let k = (seed as usize) % shuffled.len();
            shuffled.rotate_left(k);
            if seed % 2 == 0 {
                shuffled.reverse();
            }
        }

        prop_assert_eq!(order_ids(notes), order_ids(shuffled));
    }

    #[test]
    fn sorted_notes_is_descending_by_updated(entries in prop::collection::vec(note_strategy(), 0..20)) {
        let state = StoreState::with_notes(build_notes(&entries));
        let sorted = sorted_notes(&state);
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].updated_at >= pair[1].updated_at);
            if pair[0].updated_at == pair[1].updated_at {
                prop_assert!(pair[0].title.to_lowercase() <= pair[1].title.to_lowercase());
            }
        }
    }

    #[test]
    fn display_order_only_equal_for_same_record(entries in prop::collection::vec(note_strategy(), 2..10)) {
        let notes = build_notes(&entries);
        for a in &notes {
            for b in &notes {
                let ord = display_order(a, b);
                prop_assert_eq!(ord == Ordering::Equal, a.id == b.id);
                prop_assert_eq!(ord, display_order(b, a).reverse());
            }
        }
    }

    #[test]
    fn normalize_always_well_formed(
        id in prop::option::of("[a-z0-9]{0,6}"),
        created in prop::option::of(any::<i32>()),
        updated in prop::option::of(any::<i32>()),
    ) {
        let mut raw = serde_json::Map::new();
        if let Some(id) = id {
            raw.insert("id".into(), serde_json::Value::String(id));
        }
        if let Some(created) = created {
            raw.insert("createdAt".into(), created.into());
        }
        if let Some(updated) = updated {
            raw.insert("updatedAt".into(), updated.into());
        }

        let note = codec::normalize(&serde_json::Value::Object(raw));
        prop_assert!(!note.id.is_empty());
        prop_assert!(note.created_at <= note.updated_at);
    }
}

#[test]
fn scenario_sorted_by_updated_at() {
    let notes = vec![
        Note {
            id: "1".into(),
            title: String::new(),
            content: String::new(),
            created_at: Timestamp(0),
            updated_at: Timestamp(100),
        },
        Note {
            id: "2".into(),
            title: String::new(),
            content: String::new(),
            created_at: Timestamp(0),
            updated_at: Timestamp(200),
        },
    ];
    assert_eq!(order_ids(notes), vec!["2", "1"]);
}

#[test]
fn generated_ids_do_not_collide() {
    let ids: HashSet<String> = (0..10_000).map(|_| codec::new_id()).collect();
    assert_eq!(ids.len(), 10_000);
}
