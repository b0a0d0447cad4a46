use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use super::Target;
use crate::entity::Note;
use crate::error::{NoteError, Result};
use crate::gateway::{NoteGateway, SqliteEventLog, HISTORY_PAGE_SIZE};
use crate::history::{HistoryAccessor, HistoryView};
use crate::identity::StaticIdentity;
use crate::store::NoteStore;
use crate::widget::{NoteWidget, WidgetConfig, WidgetServices};

/// Find the project root by looking for .notelog/ or .git/
fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(".notelog").exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

fn open_log() -> Result<Arc<SqliteEventLog>> {
    let root = find_project_root();
    Ok(Arc::new(SqliteEventLog::open(&root)?))
}

impl Target {
    fn widget_config(&self) -> Result<WidgetConfig> {
        if let Some(path) = &self.config {
            return WidgetConfig::load(path);
        }
        Ok(match &self.device {
            Some(id) => WidgetConfig::for_device(id.as_str(), self.device_name.clone().unwrap_or_default()),
            None => WidgetConfig::default(),
        })
    }
}

fn get_git_email() -> Option<String> {
    std::process::Command::new("git")
        .args(["config", "user.email"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            } else {
                None
            }
        })
}

fn format_note(note: &Note) -> String {
    format!(
        "{}\n\n(by {} at {})",
        note.content,
        note.author,
        note.date.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;

    let _log = SqliteEventLog::init(&root)?;

    println!("Initialized notelog project in {}", root.display());
    Ok(())
}

pub async fn handle_show(target: Target, json: bool) -> Result<()> {
    let config = target.widget_config()?;
    let device = config.device()?;
    let log = open_log()?;

    let store = NoteStore::new(device.id.clone(), NoteGateway::new(log));
    store.initialize().await?;
    let snapshot = store.snapshot().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.note)?);
    } else {
        match &snapshot.note {
            Some(note) => println!("{}", format_note(note)),
            None => println!("No note for device {}", device.id),
        }
    }

    Ok(())
}

pub async fn handle_save(
    target: Target,
    content: Option<String>,
    stdin: bool,
    author: Option<String>,
    json: bool,
) -> Result<()> {
    let config = target.widget_config()?;
    config.device()?;

    let content = if stdin {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        content.unwrap_or_default()
    };

    let author = author.or_else(get_git_email).ok_or_else(|| {
        NoteError::Identity("no author given; pass --author or set git user.email".to_string())
    })?;
    let identity = Arc::new(StaticIdentity::from_author(&author)?);

    let log = open_log()?;
    let mut widget = NoteWidget::attach(&config, WidgetServices::sqlite(log, identity)).await?;

    widget.on_content_updated(content).await;
    if !widget.snapshot().await.can_save() {
        widget.detach();
        println!("Note for device {} is unchanged", config.device()?.id);
        return Ok(());
    }

    let note = widget.on_save().await;
    widget.detach();
    let note = note?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Saved note for device {}", config.device()?.id);
    }

    Ok(())
}

pub async fn handle_history(target: Target, json: bool) -> Result<()> {
    let config = target.widget_config()?;
    let device = config.device()?;
    let log = open_log()?;

    let view = HistoryAccessor::new(device.id.clone(), NoteGateway::new(log))
        .load()
        .await;

    if view == HistoryView::Unavailable {
        eprintln!("Warning: note history could not be loaded");
    }
    if view.is_truncated() {
        eprintln!(
            "Warning: only the latest {} entries are shown",
            HISTORY_PAGE_SIZE
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(view.events())?);
        return Ok(());
    }

    if view.is_empty() {
        println!("No note history for device {}", device.id);
        return Ok(());
    }

    for (i, event) in view.events().iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "{}  {}",
            event.payload.date.format("%Y-%m-%d %H:%M:%S"),
            event.payload.author
        );
        for line in event.payload.content.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}
