//! On-demand retrieval of an asset's note history.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::entity::{AssetId, NoteEvent};
use crate::gateway::{FetchOutcome, NoteGateway, HISTORY_PAGE_SIZE};

/// What the history display renders
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryView {
    /// Events as returned by the log, newest first
    Loaded(Vec<NoteEvent>),
    /// The fetch failed; shown as an empty history
    Unavailable,
}

impl HistoryView {
    pub fn events(&self) -> &[NoteEvent] {
        match self {
            HistoryView::Loaded(events) => events,
            HistoryView::Unavailable => &[],
        }
    }

    /// True when there is nothing to show, for whatever reason
    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }

    /// True when older entries may exist beyond the retrievable ceiling
    pub fn is_truncated(&self) -> bool {
        self.events().len() >= HISTORY_PAGE_SIZE
    }
}

/// Fetches the note log for one asset when asked to.
pub struct HistoryAccessor {
    asset_id: AssetId,
    gateway: NoteGateway,
    loading: watch::Sender<bool>,
}

impl HistoryAccessor {
    pub fn new(asset_id: AssetId, gateway: NoteGateway) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            asset_id,
            gateway,
            loading,
        }
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Receiver for the loading indicator
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Fetch the history. Never fails; a failed fetch yields `Unavailable`.
    pub async fn load(&self) -> HistoryView {
        let outcome = {
            let _loading = LoadingGuard::raise(&self.loading);
            self.gateway.fetch_history(&self.asset_id).await
        };

        let view = match outcome {
            FetchOutcome::Found(events) => HistoryView::Loaded(events),
            FetchOutcome::Absent => HistoryView::Loaded(Vec::new()),
            FetchOutcome::Failed(_) => HistoryView::Unavailable,
        };

        if view.is_truncated() {
            warn!(
                asset = %self.asset_id,
                limit = HISTORY_PAGE_SIZE,
                "note history reached the page limit, older entries are not shown"
            );
        }
        debug!(asset = %self.asset_id, entries = view.events().len(), "note history loaded");
        view
    }
}

/// Holds the loading flag up until dropped, including when the fetch is abandoned
struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> LoadingGuard<'a> {
    fn raise(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}
