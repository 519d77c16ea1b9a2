//! Error types for the notes store.

use thiserror::Error;

/// Main error type for store and backend operations.
#[derive(Debug, Clone, Error)]
pub enum NotesError {
    /// Missing or invalid argument, detected before any I/O.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The target record does not exist.
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Network failure, non-2xx response, or unparsable response body.
    #[error("{}", transport_message(.status, .body))]
    Transport { status: Option<u16>, body: String },

    /// Local storage failure (I/O, serialization, corruption).
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Failure category, without the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Transport,
    Storage,
}

impl NotesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotesError::Validation(_) => ErrorKind::Validation,
            NotesError::NotFound(_) => ErrorKind::NotFound,
            NotesError::Transport { .. } => ErrorKind::Transport,
            NotesError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn transport(status: Option<u16>, body: impl Into<String>) -> Self {
        NotesError::Transport {
            status,
            body: body.into(),
        }
    }
}

fn transport_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) if body.is_empty() => format!("Request failed with HTTP {code}"),
        Some(code) => format!("Request failed with HTTP {code}: {body}"),
        None => format!("Request failed: {body}"),
    }
}

impl From<std::io::Error> for NotesError {
    fn from(e: std::io::Error) -> Self {
        NotesError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for NotesError {
    fn from(e: serde_json::Error) -> Self {
        NotesError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for NotesError {
    fn from(e: reqwest::Error) -> Self {
        NotesError::Transport {
            status: e.status().map(|s| s.as_u16()),
            body: e.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, NotesError>;
