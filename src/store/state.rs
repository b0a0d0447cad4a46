//! Pure reconciliation of the authoritative note and the local draft.

use serde::Serialize;

use crate::entity::Note;

/// Lifecycle of a store. `Loading` is entered once and never again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
}

/// Whether `draft` differs from the authoritative note.
///
/// An absent note compares as empty content, and so does an absent draft.
pub fn is_dirty(draft: Option<&str>, note: Option<&Note>) -> bool {
    let saved = note.map(|n| n.content.as_str()).unwrap_or("");
    draft.unwrap_or("") != saved
}

/// Point-in-time copy of the store for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSnapshot {
    pub phase: Phase,
    pub note: Option<Note>,
    pub draft: Option<String>,
    pub dirty: bool,
}

impl NoteSnapshot {
    pub fn can_save(&self) -> bool {
        self.dirty
    }

    pub fn can_reset(&self) -> bool {
        self.dirty
    }
}

/// The note, the draft and the derived dirty flag.
///
/// Every mutator ends in `recompute`, so `dirty` is always
/// `is_dirty(draft, note)`.
#[derive(Debug, Clone)]
pub struct NoteState {
    phase: Phase,
    note: Option<Note>,
    draft: Option<String>,
    dirty: bool,
}

impl Default for NoteState {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            note: None,
            draft: None,
            dirty: false,
        }
    }
}

impl NoteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn note(&self) -> Option<&Note> {
        self.note.as_ref()
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> NoteSnapshot {
        NoteSnapshot {
            phase: self.phase,
            note: self.note.clone(),
            draft: self.draft.clone(),
            dirty: self.dirty,
        }
    }

    pub fn begin_loading(&mut self) {
        self.phase = Phase::Loading;
    }

    /// Finish the initial load with whatever note was found
    pub fn finish_loading(&mut self, note: Option<Note>) {
        self.draft = note.as_ref().map(|n| n.content.clone());
        self.note = note;
        self.phase = Phase::Ready;
        self.recompute();
    }

    pub fn edit_draft(&mut self, content: String) {
        self.draft = Some(content);
        self.recompute();
    }

    pub fn reset_draft(&mut self) {
        self.draft = self.note.as_ref().map(|n| n.content.clone());
        self.recompute();
    }

    /// A save was appended: the saved note becomes authoritative, the draft stays.
    pub fn commit_saved(&mut self, note: Note) {
        self.note = Some(note);
        self.recompute();
    }

    /// Remote wins: replace the note and overwrite the draft with it.
    ///
    /// Returns the unsaved draft that was thrown away, if there was one.
    pub fn apply_remote(&mut self, note: Note) -> Option<String> {
        let discarded = if self.dirty { self.draft.take() } else { None };
        self.draft = Some(note.content.clone());
        self.note = Some(note);
        self.recompute();
        discarded
    }

    fn recompute(&mut self) {
        self.dirty = is_dirty(self.draft.as_deref(), self.note.as_ref());
    }
}
