//! Note store: the authoritative note, the draft, and the dirty flag.
//!
//! Three inputs drive the store: the initial load, local edits and saves,
//! and realtime pushes from other clients. Pushes win over unsaved edits,
//! and a save that completes after a push wins over the push. There is no
//! sequencing between the two; the last write applied is authoritative.

mod state;

pub use state::{is_dirty, NoteSnapshot, NoteState, Phase};

use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entity::{AssetId, LogEvent, Note};
use crate::error::{NoteError, Result};
use crate::gateway::{FetchOutcome, NoteGateway};

/// Why a realtime event left the store untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    OtherAsset,
    OtherType,
    Malformed,
    NotReady,
    Detached,
}

/// Result of feeding one realtime event into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeOutcome {
    Ignored(IgnoreReason),
    Applied { discarded_draft: Option<String> },
}

impl RealtimeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RealtimeOutcome::Applied { .. })
    }
}

/// Note state for one asset. Clones share the same state.
#[derive(Clone)]
pub struct NoteStore {
    asset_id: AssetId,
    gateway: NoteGateway,
    state: Arc<Mutex<NoteState>>,
    snapshots: Arc<watch::Sender<NoteSnapshot>>,
    detached: CancellationToken,
}

impl NoteStore {
    pub fn new(asset_id: AssetId, gateway: NoteGateway) -> Self {
        let state = NoteState::new();
        let (snapshots, _) = watch::channel(state.snapshot());
        Self {
            asset_id,
            gateway,
            state: Arc::new(Mutex::new(state)),
            snapshots: Arc::new(snapshots),
            detached: CancellationToken::new(),
        }
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub async fn snapshot(&self) -> NoteSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Receiver that sees every state transition
    pub fn watch(&self) -> watch::Receiver<NoteSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.is_cancelled()
    }

    /// Tear the store down. Results of calls still in flight are discarded.
    pub fn detach(&self) {
        if !self.detached.is_cancelled() {
            debug!(asset = %self.asset_id, "note store detached");
            self.detached.cancel();
        }
    }

    /// Load the current note. A failed fetch leaves the store ready with no note.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.lock_live().await?;
            if state.phase() != Phase::Uninitialized {
                return Err(NoteError::AlreadyInitialized);
            }
            state.begin_loading();
            self.publish(&state);
        }

        let outcome = self.gateway.fetch_latest(&self.asset_id).await;
        if let FetchOutcome::Failed(reason) = &outcome {
            warn!(asset = %self.asset_id, %reason, "starting without a note");
        }

        let mut state = self.lock_live().await?;
        state.finish_loading(outcome.found());
        debug!(asset = %self.asset_id, has_note = state.note().is_some(), "note store ready");
        self.publish(&state);
        Ok(())
    }

    /// Replace the draft. Ignored once the store is detached.
    pub async fn edit_draft(&self, content: impl Into<String>) {
        let Ok(mut state) = self.lock_live().await else {
            debug!(asset = %self.asset_id, "edit on detached store ignored");
            return;
        };
        state.edit_draft(content.into());
        self.publish(&state);
    }

    pub async fn reset_draft(&self) {
        let Ok(mut state) = self.lock_live().await else {
            debug!(asset = %self.asset_id, "reset on detached store ignored");
            return;
        };
        state.reset_draft();
        self.publish(&state);
    }

    /// Append the draft as a new note by `author`.
    ///
    /// Only a successful append changes the authoritative note. On failure
    /// the note and the draft are left as they were and the error is returned.
    pub async fn save(&self, author: &str) -> Result<Note> {
        let note = {
            let state = self.lock_live().await?;
            Note::new(state.draft().unwrap_or_default(), author)
        };

        if let Err(e) = self.gateway.append(&self.asset_id, &note).await {
            warn!(asset = %self.asset_id, error = %e, "note save failed, draft kept");
            return Err(e);
        }

        let mut state = self.lock_live().await?;
        state.commit_saved(note.clone());
        info!(asset = %self.asset_id, author = %note.author, "note saved");
        self.publish(&state);
        Ok(note)
    }

    /// Apply a pushed event if it is a note event for this asset.
    pub async fn apply_realtime_update(&self, event: &LogEvent) -> RealtimeOutcome {
        if event.source.id != self.asset_id {
            return RealtimeOutcome::Ignored(IgnoreReason::OtherAsset);
        }
        if !event.is_note_event() {
            return RealtimeOutcome::Ignored(IgnoreReason::OtherType);
        }
        let note = match event.note() {
            Ok(note) => note,
            Err(e) => {
                warn!(asset = %self.asset_id, event = %event.id, error = %e, "ignoring malformed note push");
                return RealtimeOutcome::Ignored(IgnoreReason::Malformed);
            }
        };

        let Ok(mut state) = self.lock_live().await else {
            return RealtimeOutcome::Ignored(IgnoreReason::Detached);
        };
        if state.phase() != Phase::Ready {
            debug!(asset = %self.asset_id, event = %event.id, "push before load finished, ignored");
            return RealtimeOutcome::Ignored(IgnoreReason::NotReady);
        }

        let discarded_draft = state.apply_remote(note);
        if let Some(draft) = &discarded_draft {
            warn!(
                asset = %self.asset_id,
                event = %event.id,
                lost_chars = draft.chars().count(),
                "remote note replaced unsaved draft"
            );
        } else {
            debug!(asset = %self.asset_id, event = %event.id, "remote note applied");
        }
        self.publish(&state);
        RealtimeOutcome::Applied { discarded_draft }
    }

    /// Lock the state unless the store has been torn down
    async fn lock_live(&self) -> Result<MutexGuard<'_, NoteState>> {
        let state = self.state.lock().await;
        if self.is_detached() {
            return Err(NoteError::Detached);
        }
        Ok(state)
    }

    fn publish(&self, state: &NoteState) {
        self.snapshots.send_replace(state.snapshot());
    }
}
