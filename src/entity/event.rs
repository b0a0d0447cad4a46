//! Event-log envelopes.
//!
//! The remote log is generic: every record carries an id, a type, a source
//! asset and arbitrary fragments. A note event is a record of type
//! [`NOTE_EVENT_TYPE`] whose note snapshot lives in the fragment of the same
//! name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AssetId, Note, SourceRef};
use crate::error::{NoteError, Result};

/// Event type (and payload fragment key) of note events
pub const NOTE_EVENT_TYPE: &str = "c8y_NoteLogEvent";

/// Text label attached to every appended note event
pub const NOTE_EVENT_TEXT: &str = "Note updated";

/// A record as stored in, and pushed from, the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: DateTime<Utc>,
    pub creation_time: DateTime<Utc>,
    pub source: SourceRef,
    #[serde(default)]
    pub text: String,
    /// Custom fragments, keyed by fragment name
    #[serde(flatten)]
    pub fragments: Map<String, Value>,
}

impl LogEvent {
    pub fn is_note_event(&self) -> bool {
        self.event_type == NOTE_EVENT_TYPE
    }

    /// Decode the note fragment, if this is a note event carrying one
    pub fn note(&self) -> Result<Note> {
        if !self.is_note_event() {
            return Err(NoteError::InvalidEvent(format!(
                "event {} has type '{}'",
                self.id, self.event_type
            )));
        }
        let fragment = self.fragments.get(NOTE_EVENT_TYPE).ok_or_else(|| {
            NoteError::InvalidEvent(format!("event {} has no {} fragment", self.id, NOTE_EVENT_TYPE))
        })?;
        Ok(serde_json::from_value(fragment.clone())?)
    }
}

/// A record to be created; the log assigns `id` and `creationTime`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: DateTime<Utc>,
    pub source: SourceRef,
    pub text: String,
    #[serde(flatten)]
    pub fragments: Map<String, Value>,
}

impl NewEvent {
    /// Build the append request for a note snapshot
    pub fn note(asset_id: &AssetId, note: &Note) -> Result<Self> {
        let mut fragments = Map::new();
        fragments.insert(NOTE_EVENT_TYPE.to_string(), serde_json::to_value(note)?);

        Ok(Self {
            event_type: NOTE_EVENT_TYPE.to_string(),
            time: Utc::now(),
            source: SourceRef::new(asset_id.clone()),
            text: NOTE_EVENT_TEXT.to_string(),
            fragments,
        })
    }
}

/// Typed view of a note record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub id: String,
    pub time: DateTime<Utc>,
    pub creation_time: DateTime<Utc>,
    pub source: SourceRef,
    pub text: String,
    #[serde(rename = "c8y_NoteLogEvent")]
    pub payload: Note,
}

impl TryFrom<LogEvent> for NoteEvent {
    type Error = NoteError;

    fn try_from(event: LogEvent) -> Result<Self> {
        let payload = event.note()?;
        Ok(Self {
            id: event.id,
            time: event.time,
            creation_time: event.creation_time,
            source: event.source,
            text: event.text,
            payload,
        })
    }
}
