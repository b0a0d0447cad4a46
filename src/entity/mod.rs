mod event;

pub use event::{LogEvent, NewEvent, NoteEvent, NOTE_EVENT_TEXT, NOTE_EVENT_TYPE};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the device/asset a note is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Reference to the asset an event was emitted for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: AssetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SourceRef {
    pub fn new(id: AssetId) -> Self {
        Self { id, name: None }
    }
}

/// One saved snapshot of an asset's note.
///
/// Notes are values: saving an edit produces a new `Note`, a saved one is
/// never changed in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

impl Note {
    /// Create a note dated now
    pub fn new(content: impl Into<String>, author: impl Into<String>) -> Self {
        Self::at(content, author, Utc::now())
    }

    pub fn at(content: impl Into<String>, author: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
            date,
        }
    }
}
