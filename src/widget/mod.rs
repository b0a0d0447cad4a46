//! Widget controller.
//!
//! Wires one device's note store to the realtime feed and exposes the
//! user-facing actions: edit, save, reset and view history.

mod config;

pub use config::{DeviceRef, WidgetConfig, WidgetDescriptor, NOTE_WIDGET};

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::entity::Note;
use crate::error::Result;
use crate::gateway::{EventLog, NoteGateway, SqliteEventLog};
use crate::history::HistoryAccessor;
use crate::identity::{IdentityProvider, User};
use crate::realtime::{RealtimeFeed, Subscription};
use crate::store::{NoteSnapshot, NoteStore};

/// External collaborators a widget talks to
#[derive(Clone)]
pub struct WidgetServices {
    pub events: Arc<dyn EventLog>,
    pub feed: Arc<dyn RealtimeFeed>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl WidgetServices {
    /// Services backed by one local SQLite log, which is also the feed
    pub fn sqlite(log: Arc<SqliteEventLog>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            events: log.clone(),
            feed: log,
            identity,
        }
    }

    fn gateway(&self) -> NoteGateway {
        NoteGateway::new(self.events.clone())
    }
}

/// A note widget attached to one device
pub struct NoteWidget {
    device: DeviceRef,
    user: User,
    services: WidgetServices,
    store: NoteStore,
    subscription: Option<Subscription>,
}

impl NoteWidget {
    /// Attach to the configured device: load its note, then follow updates.
    ///
    /// Fails with `MissingDevice` before touching any service when the
    /// config has no device.
    pub async fn attach(config: &WidgetConfig, services: WidgetServices) -> Result<Self> {
        let device = config.device()?.clone();
        let user = services.identity.current_user().await?;
        let (store, subscription) = connect(&device, &services).await?;

        info!(device = %device.id, user = %user.email, "note widget attached");
        Ok(Self {
            device,
            user,
            services,
            store,
            subscription,
        })
    }

    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub async fn snapshot(&self) -> NoteSnapshot {
        self.store.snapshot().await
    }

    pub fn watch(&self) -> watch::Receiver<NoteSnapshot> {
        self.store.watch()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub async fn on_content_updated(&self, content: impl Into<String>) {
        self.store.edit_draft(content).await;
    }

    /// Save the draft as the current user
    pub async fn on_save(&self) -> Result<Note> {
        self.store.save(self.user.display_identity()).await
    }

    pub async fn on_reset(&self) {
        self.store.reset_draft().await;
    }

    /// History accessor for the attached device; nothing is fetched until `load`
    pub fn open_history(&self) -> HistoryAccessor {
        HistoryAccessor::new(self.device.id.clone(), self.services.gateway())
    }

    /// Move the widget to another device.
    ///
    /// The current subscription is cancelled before the new device is loaded.
    pub async fn retarget(&mut self, config: &WidgetConfig) -> Result<()> {
        let device = config.device()?.clone();
        self.teardown();

        let (store, subscription) = connect(&device, &self.services).await?;
        debug!(from = %self.device.id, to = %device.id, "note widget retargeted");
        self.device = device;
        self.store = store;
        self.subscription = subscription;
        Ok(())
    }

    /// Release the subscription and stop accepting results. Idempotent.
    pub fn detach(&mut self) {
        if self.subscription.is_some() || !self.store.is_detached() {
            debug!(device = %self.device.id, "note widget detached");
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.store.detach();
    }
}

impl Drop for NoteWidget {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Build and load a store for `device`, then subscribe it to the feed.
///
/// A feed that cannot be subscribed leaves the widget working without
/// realtime updates.
async fn connect(
    device: &DeviceRef,
    services: &WidgetServices,
) -> Result<(NoteStore, Option<Subscription>)> {
    let store = NoteStore::new(device.id.clone(), services.gateway());
    store.initialize().await?;

    let subscription = match Subscription::start(&services.feed, store.clone()).await {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            warn!(device = %device.id, error = %e, "realtime updates unavailable");
            None
        }
    };
    Ok((store, subscription))
}
