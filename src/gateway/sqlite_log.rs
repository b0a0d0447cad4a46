use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{EventLog, EventQuery};
use crate::entity::{AssetId, LogEvent, NewEvent, SourceRef};
use crate::error::{NoteError, Result};
use crate::realtime::{EventReceiver, RealtimeFeed};

const NOTELOG_DIR: &str = ".notelog";
const EVENTS_DB: &str = "events.db";

/// Capacity of the in-process channel that fans created events out to subscribers
const CREATED_CHANNEL_CAPACITY: usize = 256;

/// Per-subscription buffer
const FEED_BUFFER: usize = 64;

/// Event log stored in a local SQLite database.
///
/// Events created through this handle are also pushed to realtime
/// subscribers of their source asset.
pub struct SqliteEventLog {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    created: broadcast::Sender<LogEvent>,
}

type EventRow = (String, String, String, Option<String>, String, String, String, String);

impl SqliteEventLog {
    /// Initialize a new notelog project under `root`
    pub fn init(root: &Path) -> Result<Self> {
        let dir = root.join(NOTELOG_DIR);

        if dir.exists() {
            return Err(NoteError::AlreadyInitialized);
        }

        fs::create_dir_all(&dir)?;
        Self::open_path(dir.join(EVENTS_DB))
    }

    /// Open an existing notelog project
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(NOTELOG_DIR).join(EVENTS_DB);

        if !path.exists() {
            return Err(NoteError::NotInitialized);
        }

        Self::open_path(path)
    }

    /// Open a throwaway log that lives only as long as this handle
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn open_path(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path)?;
        Self::from_connection(conn, Some(path))
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        init_schema(&conn)?;
        let (created, _) = broadcast::channel(CREATED_CHANNEL_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            created,
        })
    }

    /// Location of the database file, `None` for in-memory logs
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of events of any type recorded for an asset
    pub async fn count(&self, asset_id: &AssetId) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE source_id = ?1",
            [asset_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            source_id TEXT NOT NULL,
            source_name TEXT,
            type TEXT NOT NULL,
            text TEXT NOT NULL,
            time TEXT NOT NULL,
            creation_time TEXT NOT NULL,
            fragments TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_source_type ON events(source_id, type, seq)",
        [],
    )?;

    Ok(())
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| NoteError::InvalidEvent(format!("bad timestamp '{}': {}", value, e)))
}

fn event_from_row(row: EventRow) -> Result<LogEvent> {
    let (id, source_id, event_type, source_name, text, time, creation_time, fragments) = row;
    let fragments: Map<String, Value> = serde_json::from_str(&fragments)?;

    Ok(LogEvent {
        id,
        event_type,
        time: parse_time(&time)?,
        creation_time: parse_time(&creation_time)?,
        source: SourceRef {
            id: AssetId::new(source_id),
            name: source_name,
        },
        text,
        fragments,
    })
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn list(&self, query: &EventQuery) -> Result<Vec<LogEvent>> {
        let rows = {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare(
                "SELECT id, source_id, type, source_name, text, time, creation_time, fragments
                 FROM events
                 WHERE source_id = ?1 AND type = ?2
                 ORDER BY seq DESC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(
                    params![query.source.as_str(), query.event_type, query.page_size as i64],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                        ))
                    },
                )?
                .collect::<std::result::Result<Vec<EventRow>, _>>()?;
            rows
        };

        rows.into_iter().map(event_from_row).collect()
    }

    async fn create(&self, event: NewEvent) -> Result<LogEvent> {
        let created = LogEvent {
            id: Uuid::new_v4().to_string(),
            event_type: event.event_type,
            time: event.time,
            creation_time: Utc::now(),
            source: event.source,
            text: event.text,
            fragments: event.fragments,
        };

        {
            let conn = self.conn.lock().await;
            conn.execute(
                "INSERT INTO events
                 (id, source_id, source_name, type, text, time, creation_time, fragments)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    created.id,
                    created.source.id.as_str(),
                    created.source.name,
                    created.event_type,
                    created.text,
                    format_time(&created.time),
                    format_time(&created.creation_time),
                    serde_json::to_string(&created.fragments)?,
                ],
            )?;
        }

        debug!(event = %created.id, asset = %created.source.id, kind = %created.event_type, "event created");
        // No receivers is fine: nobody is watching this log right now.
        let _ = self.created.send(created.clone());

        Ok(created)
    }
}

#[async_trait]
impl RealtimeFeed for SqliteEventLog {
    async fn subscribe(&self, asset_id: &AssetId) -> Result<EventReceiver> {
        let mut created = self.created.subscribe();
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let asset_id = asset_id.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    received = created.recv() => match received {
                        Ok(event) if event.source.id == asset_id => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(asset = %asset_id, skipped, "realtime subscriber lagged, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!(asset = %asset_id, "realtime forwarder stopped");
        });

        Ok(rx)
    }
}
