pub mod cli;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod history;
pub mod identity;
pub mod realtime;
pub mod store;
pub mod widget;

pub use error::{NoteError, Result};
pub use gateway::{EventLog, NoteGateway, SqliteEventLog};
pub use store::NoteStore;
pub use widget::{NoteWidget, WidgetConfig, WidgetServices};
