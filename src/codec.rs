//! Record codec: turns untrusted payloads into canonical [`Note`]s.
//!
//! Nothing coming from the network or from disk enters store state without
//! passing through [`normalize`]. The codec never fails; missing or
//! mistyped fields fall back to defaults.

use crate::types::{Note, Timestamp};
use serde_json::Value;
use std::collections::HashSet;

/// Keys under which a list payload may wrap its array.
const LIST_ENVELOPE_KEYS: [&str; 2] = ["notes", "data"];

/// Length of the random part of generated ids, in base36 digits.
const ID_SUFFIX_LEN: usize = 8;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate an identifier for a client-created note.
///
/// Millisecond time prefix plus a random base36 suffix. Unique with very
/// high probability within one process; collisions are not detected.
pub fn new_id() -> String {
    let prefix = to_base36(Timestamp::now().as_millis().max(0) as u64);
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36_DIGITS[(rand::random::<u32>() % 36) as usize] as char)
        .collect();
    format!("{prefix}-{suffix}")
}

/// Coerce a raw payload into a well-formed note.
pub fn normalize(raw: &Value) -> Note {
    let now = Timestamp::now();
    let field = |name: &str| raw.as_object().and_then(|obj| obj.get(name));

    let id = field("id").and_then(coerce_id).unwrap_or_else(new_id);
    let title = field("title").map(coerce_string).unwrap_or_default();
    let content = field("content").map(coerce_string).unwrap_or_default();

    let created_at = field("createdAt").and_then(coerce_timestamp).unwrap_or(now);
    let updated_at = field("updatedAt")
        .and_then(coerce_timestamp)
        .unwrap_or(now)
        .max(created_at);

    Note {
        id,
        title,
        content,
        created_at,
        updated_at,
    }
}

/// Normalize a list payload.
///
/// Accepts a bare array or an object wrapping one under `notes` or `data`.
/// Returns `None` for anything else. Duplicate ids keep the first entry.
pub fn normalize_list(raw: &Value) -> Option<Vec<Note>> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(obj) => LIST_ENVELOPE_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array))?,
        _ => return None,
    };

    let mut seen = HashSet::new();
    Some(
        items
            .iter()
            .map(normalize)
            .filter(|note| seen.insert(note.id.clone()))
            .collect(),
    )
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn coerce_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .map(Timestamp),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<Timestamp> {
    if let Ok(millis) = s.parse::<i64>() {
        return Some(Timestamp(millis));
    }
    if let Ok(millis) = s.parse::<f64>() {
        if millis.is_finite() {
            return Some(Timestamp(millis as i64));
        }
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| Timestamp(dt.timestamp_millis()))
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_full_record() {
        let note = normalize(&json!({
            "id": "abc",
            "title": "Groceries",
            "content": "Milk, eggs",
            "createdAt": 100,
            "updatedAt": 200
        }));
        assert_eq!(note.id, "abc");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "Milk, eggs");
        assert_eq!(note.created_at, Timestamp(100));
        assert_eq!(note.updated_at, Timestamp(200));
    }

    #[test]
    fn test_normalize_coerces_types() {
        let note = normalize(&json!({
            "id": 42,
            "title": null,
            "content": 7,
            "createdAt": "1500",
            "updatedAt": "2024-01-01T00:00:00Z"
        }));
        assert_eq!(note.id, "42");
        assert_eq!(note.title, "");
        assert_eq!(note.content, "7");
        assert_eq!(note.created_at, Timestamp(1500));
        assert_eq!(note.updated_at, Timestamp(1_704_067_200_000));
    }

    #[test]
    fn test_normalize_garbage_still_yields_note() {
        for raw in [json!(null), json!("text"), json!([1, 2]), json!({"id": ""})] {
            let note = normalize(&raw);
            assert!(!note.id.is_empty());
            assert!(note.title.is_empty());
            assert!(note.created_at <= note.updated_at);
        }
    }

    #[test]
    fn test_normalize_unparsable_timestamp_defaults_to_now() {
        let before = Timestamp::now();
        let note = normalize(&json!({"id": "x", "createdAt": "yesterday"}));
        assert!(note.created_at >= before);
    }

    #[test]
    fn test_normalize_clamps_updated_to_created() {
        let note = normalize(&json!({"id": "x", "createdAt": 500, "updatedAt": 100}));
        assert_eq!(note.updated_at, Timestamp(500));
    }

    #[test]
    fn test_normalize_list_envelopes_and_duplicates() {
        let bare = normalize_list(&json!([{"id": "1"}, {"id": "1"}, {"id": "2"}])).unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped = normalize_list(&json!({"notes": [{"id": "a"}]})).unwrap();
        assert_eq!(wrapped[0].id, "a");

        let data = normalize_list(&json!({"data": []})).unwrap();
        assert!(data.is_empty());

        assert!(normalize_list(&json!({"items": []})).is_none());
        assert!(normalize_list(&json!("nope")).is_none());
    }

    #[test]
    fn test_new_id_shape_and_uniqueness() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
        let id = ids.iter().next().unwrap();
        assert!(id.contains('-'));
        assert!(id.chars().all(|c| c == '-' || c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_new_id_suffix_leading_digit_varies() {
        let leading: HashSet<char> = (0..2000)
            .filter_map(|_| new_id().rsplit('-').next().and_then(|s| s.chars().next()))
            .collect();
        // 2000 draws over 36 digits: far more than 3 distinct leading digits.
        assert!(leading.len() > 20, "leading digits: {leading:?}");

        let id = new_id();
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
