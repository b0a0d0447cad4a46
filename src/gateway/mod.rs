//! Persistence gateway over the remote event log.
//!
//! [`EventLog`] is the generic list/create service the note lives in.
//! [`NoteGateway`] narrows it to the three note operations and turns read
//! failures into a [`FetchOutcome`] instead of an error.

mod sqlite_log;

pub use sqlite_log::SqliteEventLog;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::entity::{AssetId, LogEvent, NewEvent, Note, NoteEvent, NOTE_EVENT_TYPE};
use crate::error::Result;

/// Page size used to fetch the current note
pub const LATEST_PAGE_SIZE: usize = 1;

/// Upper bound on retrievable history
pub const HISTORY_PAGE_SIZE: usize = 2000;

/// Filter for listing events of one type for one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub source: AssetId,
    pub event_type: String,
    pub page_size: usize,
}

impl EventQuery {
    pub fn notes(source: &AssetId, page_size: usize) -> Self {
        Self {
            source: source.clone(),
            event_type: NOTE_EVENT_TYPE.to_string(),
            page_size,
        }
    }
}

/// Append-only event log service.
///
/// `list` returns at most `page_size` events, most recently created first.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn list(&self, query: &EventQuery) -> Result<Vec<LogEvent>>;

    async fn create(&self, event: NewEvent) -> Result<LogEvent>;
}

/// Result of a read that is allowed to fail soft
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Found(T),
    Absent,
    Failed(String),
}

impl<T> FetchOutcome<T> {
    /// Collapse to an option, treating failure as absence
    pub fn found(self) -> Option<T> {
        match self {
            FetchOutcome::Found(value) => Some(value),
            FetchOutcome::Absent | FetchOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// Note-specific operations on an [`EventLog`]
#[derive(Clone)]
pub struct NoteGateway {
    log: Arc<dyn EventLog>,
}

impl NoteGateway {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Most recent note for the asset
    pub async fn fetch_latest(&self, asset_id: &AssetId) -> FetchOutcome<Note> {
        let query = EventQuery::notes(asset_id, LATEST_PAGE_SIZE);
        let events = match self.log.list(&query).await {
            Ok(events) => events,
            Err(e) => {
                warn!(asset = %asset_id, error = %e, "Failed to load note log event");
                return FetchOutcome::Failed(e.to_string());
            }
        };

        let Some(event) = events.into_iter().next() else {
            debug!(asset = %asset_id, "no note recorded yet");
            return FetchOutcome::Absent;
        };

        match event.note() {
            Ok(note) => FetchOutcome::Found(note),
            Err(e) => {
                warn!(asset = %asset_id, event = %event.id, error = %e, "Failed to decode note log event");
                FetchOutcome::Failed(e.to_string())
            }
        }
    }

    /// All note events for the asset up to [`HISTORY_PAGE_SIZE`], newest first.
    ///
    /// Records whose payload does not decode are skipped.
    pub async fn fetch_history(&self, asset_id: &AssetId) -> FetchOutcome<Vec<NoteEvent>> {
        let query = EventQuery::notes(asset_id, HISTORY_PAGE_SIZE);
        match self.log.list(&query).await {
            Ok(events) => {
                let notes = events
                    .into_iter()
                    .filter_map(|event| {
                        let id = event.id.clone();
                        NoteEvent::try_from(event)
                            .map_err(|e| warn!(event = %id, error = %e, "skipping malformed note event"))
                            .ok()
                    })
                    .collect();
                FetchOutcome::Found(notes)
            }
            Err(e) => {
                warn!(asset = %asset_id, error = %e, "Failed to load note log events");
                FetchOutcome::Failed(e.to_string())
            }
        }
    }

    /// Append a note event for the asset. Failures propagate.
    pub async fn append(&self, asset_id: &AssetId, note: &Note) -> Result<NoteEvent> {
        let request = NewEvent::note(asset_id, note)?;
        let created = self.log.create(request).await?;
        NoteEvent::try_from(created)
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::MockEventLog;
    use super::*;

    fn gateway(log: &Arc<MockEventLog>) -> NoteGateway {
        NoteGateway::new(log.clone())
    }

    #[tokio::test]
    async fn test_fetch_latest_returns_newest_payload() {
        let log = MockEventLog::new();
        let asset = AssetId::new("Random");
        log.seed(&asset, &Note::new("first", "a"));
        log.seed(&asset, &Note::new("second", "b"));

        let note = gateway(&log).fetch_latest(&asset).await.found().unwrap();
        assert_eq!(note.content, "second");

        let queries = log.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0], EventQuery::notes(&asset, 1));
    }

    #[tokio::test]
    async fn test_fetch_latest_absent_when_log_is_empty() {
        let log = MockEventLog::new();
        let outcome = gateway(&log).fetch_latest(&AssetId::new("Random")).await;
        assert_eq!(outcome, FetchOutcome::Absent);
    }

    #[tokio::test]
    async fn test_fetch_latest_fails_soft() {
        let log = MockEventLog::new();
        log.fail_list.store(true, Ordering::SeqCst);

        let outcome = gateway(&log).fetch_latest(&AssetId::new("Random")).await;
        assert!(outcome.is_failed());
        assert!(outcome.found().is_none());
    }

    #[tokio::test]
    async fn test_fetch_history_uses_ceiling_and_keeps_order() {
        let log = MockEventLog::new();
        let asset = AssetId::new("Random");
        for i in 1..=3 {
            log.seed(&asset, &Note::new(format!("Note {i}"), "test"));
        }
        log.seed(&AssetId::new("other"), &Note::new("elsewhere", "test"));

        let history = gateway(&log).fetch_history(&asset).await.found().unwrap();
        let contents: Vec<_> = history.iter().map(|e| e.payload.content.as_str()).collect();
        assert_eq!(contents, vec!["Note 3", "Note 2", "Note 1"]);
        assert_eq!(log.queries.lock().unwrap()[0].page_size, HISTORY_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_fetch_history_fails_soft() {
        let log = MockEventLog::new();
        log.fail_list.store(true, Ordering::SeqCst);

        let outcome = gateway(&log).fetch_history(&AssetId::new("Random")).await;
        assert!(outcome.is_failed());
    }

    #[tokio::test]
    async fn test_append_creates_note_event() {
        let log = MockEventLog::new();
        let asset = AssetId::new("Random");
        let note = Note::new("Random content", "john.doe@example.com");

        let created = gateway(&log).append(&asset, &note).await.unwrap();
        assert_eq!(created.payload, note);
        assert_eq!(created.source.id, asset);
        assert_eq!(created.text, crate::entity::NOTE_EVENT_TEXT);
        assert_eq!(log.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_failure_propagates() {
        let log = MockEventLog::new();
        log.fail_create.store(true, Ordering::SeqCst);

        let result = gateway(&log)
            .append(&AssetId::new("Random"), &Note::new("x", "y"))
            .await;
        assert!(result.is_err());
    }
}
