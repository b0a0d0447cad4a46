use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Not in a notelog project. Run 'notelog init' first.")]
    NotInitialized,

    #[error("Already initialized.")]
    AlreadyInitialized,

    #[error("Failed to init context: widget config has no device")]
    MissingDevice,

    #[error("Event log error: {0}")]
    Gateway(String),

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Widget has been detached")]
    Detached,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, NoteError>;
