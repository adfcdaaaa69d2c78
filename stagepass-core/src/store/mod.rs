//! Shared-state storage
//!
//! The playback-state document lives in the product's managed document
//! backend; this module is the client side of that collaborator. The core
//! never owns the data beyond its schema - it creates, replaces and watches
//! one small document per live event.

mod event_id;
mod memory;
mod remote;

pub use event_id::EventId;
pub use memory::MemoryStateStore;
pub use remote::RemoteStateStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::sync::PlaybackSnapshot;

/// How often the snapshot watch polls the backend for changes
pub const SNAPSHOT_POLL_PERIOD: Duration = Duration::from_secs(1);

/// Errors from the document backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected credentials")]
    Unauthorized,

    #[error("backend error: {0}")]
    Backend(String),
}

/// Read/write access to the per-event playback-state document.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the current snapshot document, if one exists.
    async fn load(&self, event: &EventId) -> Result<Option<PlaybackSnapshot>, StoreError>;

    /// Create or replace the snapshot document.
    async fn save(&self, event: &EventId, snapshot: &PlaybackSnapshot) -> Result<(), StoreError>;
}

/// A running subscription to one event's snapshot document.
///
/// Holds the poll task alive; dropping the watch aborts it, so a viewer that
/// unmounts cannot keep acting on stale callbacks.
pub struct SnapshotWatch {
    rx: watch::Receiver<Option<PlaybackSnapshot>>,
    task: tokio::task::JoinHandle<()>,
}

impl SnapshotWatch {
    /// A receiver that resolves whenever a newer snapshot is observed.
    pub fn receiver(&self) -> watch::Receiver<Option<PlaybackSnapshot>> {
        self.rx.clone()
    }
}

impl Drop for SnapshotWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribe to an event's snapshot document.
///
/// The backend's change feed is modeled as a poll task fanning the latest
/// document out over a watch channel. Re-reads of an unchanged document are
/// swallowed here (host timestamps are non-decreasing, so "changed" is a
/// timestamp comparison); poll failures are logged and the subscription keeps
/// going - a follower that misses a round converges on the next one.
pub fn spawn_snapshot_watch<S>(store: Arc<S>, event: EventId, period: Duration) -> SnapshotWatch
where
    S: StateStore + 'static,
{
    let (tx, rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_seen: Option<u64> = None;

        loop {
            tick.tick().await;

            match store.load(&event).await {
                Ok(Some(snapshot)) => {
                    if last_seen.map_or(true, |seen| snapshot.is_newer_than(seen)) {
                        last_seen = Some(snapshot.last_updated_at);
                        if tx.send(Some(snapshot)).is_err() {
                            break; // all receivers gone
                        }
                    }
                }
                Ok(None) => {
                    // Host has not mounted yet; keep waiting
                }
                Err(e) => {
                    debug!("snapshot poll for {} failed: {}", event, e);
                }
            }
        }
    });

    SnapshotWatch { rx, task }
}
