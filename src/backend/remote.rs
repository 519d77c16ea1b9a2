//! Remote backend over a JSON HTTP API.
//!
//! ```text
//! GET    /notes        -> Note[]
//! POST   /notes        {title, content}   -> Note
//! PATCH  /notes/{id}   {title?, content?} -> Note
//! DELETE /notes/{id}   -> Note | empty
//! ```

use super::{BackendKind, NotesBackend};
use crate::codec;
use crate::config::RemoteConfig;
use crate::error::{NotesError, Result};
use crate::types::{Note, NoteDraft, NotePatch};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

/// Everything outside the RFC 3986 unreserved set is escaped in ids.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Per-request status handling.
#[derive(Clone, Copy)]
enum Target<'a> {
    Collection,
    /// 404 on a single record means the record is gone.
    Record(&'a str),
}

/// Notes persisted behind an HTTP API.
pub struct RemoteBackend {
    client: Client,
    base_url: String,
}

impl RemoteBackend {
    /// Build a client for `config.base_url`.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(NotesError::Validation("remote base URL is empty".into()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/notes", self.base_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!(
            "{}/notes/{}",
            self.base_url,
            utf8_percent_encode(id, PATH_SEGMENT)
        )
    }

    /// Send one request and return its body parsed as JSON (`Null` if empty).
    fn send(&self, request: RequestBuilder, target: Target<'_>) -> Result<Value> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(status = status.as_u16(), bytes = body.len(), "notes API response");

        if !status.is_success() {
            if let (StatusCode::NOT_FOUND, Target::Record(id)) = (status, target) {
                return Err(NotesError::NotFound(id.to_string()));
            }
            return Err(NotesError::transport(Some(status.as_u16()), body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|_| NotesError::transport(Some(status.as_u16()), body))
    }

    fn expect_record(value: Value) -> Result<Note> {
        if value.is_object() {
            Ok(codec::normalize(&value))
        } else {
            Err(NotesError::transport(None, format!("expected a note object, got {value}")))
        }
    }
}

impl NotesBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn list(&self) -> Result<Vec<Note>> {
        let value = self.send(self.client.get(self.collection_url()), Target::Collection)?;
        codec::normalize_list(&value)
            .ok_or_else(|| NotesError::transport(None, format!("expected a note list, got {value}")))
    }

    fn create(&self, draft: &NoteDraft) -> Result<Note> {
        let request = self
            .client
            .post(self.collection_url())
            .json(&json!({ "title": draft.title, "content": draft.content }));
        Self::expect_record(self.send(request, Target::Collection)?)
    }

    fn update(&self, id: &str, patch: &NotePatch) -> Result<Note> {
        let request = self.client.patch(self.record_url(id)).json(patch);
        Self::expect_record(self.send(request, Target::Record(id))?)
    }

    fn remove(&self, id: &str) -> Result<Note> {
        let value = self.send(self.client.delete(self.record_url(id)), Target::Record(id))?;
        match value {
            Value::Object(_) => Ok(codec::normalize(&value)),
            // Void response: all we know is the id.
            _ => Ok(codec::normalize(&json!({ "id": id }))),
        }
    }
}
