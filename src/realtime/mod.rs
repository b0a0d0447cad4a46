//! Realtime feed integration.
//!
//! A [`RealtimeFeed`] pushes every newly created event for an asset. A
//! [`Subscription`] pumps the note events among them into a [`NoteStore`]
//! until it is cancelled or dropped.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::entity::{AssetId, LogEvent};
use crate::error::Result;
use crate::store::NoteStore;

/// Live, infinite sequence of events created for one asset
pub type EventReceiver = mpsc::Receiver<LogEvent>;

/// Push channel of newly created events.
///
/// A receiver cannot be restarted: cancel it and subscribe again.
#[async_trait]
pub trait RealtimeFeed: Send + Sync {
    async fn subscribe(&self, asset_id: &AssetId) -> Result<EventReceiver>;
}

/// Filter applied before an event reaches the store
pub fn is_note_update(event: &LogEvent) -> bool {
    event.is_note_event()
}

/// Handle to a running realtime subscription.
///
/// Cancelling is idempotent. Dropping the handle cancels it.
pub struct Subscription {
    asset_id: AssetId,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscribe to the store's asset and start applying note updates
    pub async fn start(feed: &Arc<dyn RealtimeFeed>, store: NoteStore) -> Result<Self> {
        let asset_id = store.asset_id().clone();
        let receiver = feed.subscribe(&asset_id).await?;
        Ok(Self::spawn(receiver, store))
    }

    fn spawn(mut receiver: EventReceiver, store: NoteStore) -> Self {
        let asset_id = store.asset_id().clone();
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    event = receiver.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                if !is_note_update(&event) {
                    trace!(event = %event.id, kind = %event.event_type, "ignoring non-note event");
                    continue;
                }
                store.apply_realtime_update(&event).await;
            }
            debug!(asset = %store.asset_id(), "realtime subscription ended");
        });

        debug!(asset = %asset_id, "realtime subscription started");
        Self {
            asset_id,
            token,
            task: Some(task),
        }
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(asset = %self.asset_id, "cancelling realtime subscription");
            self.token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel and wait for the pump to stop
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
