//! Playback Synchronization Engine
//!
//! One privileged host drives playback for a live event; every other viewer
//! converges on the host's published snapshots. The host and follower sides
//! never share a code path - the role is resolved once per session and the
//! matching engine is constructed.

pub mod clock;
mod follower;
mod host;
mod state;

pub use clock::{current_time_ms, extrapolate_position};
pub use follower::{FollowerSynchronizer, CORRECTION_PERIOD};
pub use host::{HostController, PUBLISH_PERIOD};
pub use state::{EventPhase, PlaybackSnapshot, SyncRole, SyncStatus};

use crate::store::StoreError;

/// Observer for sync engine events, implemented by the embedding layer.
///
/// Callbacks fire from the engine's async loops and must return quickly.
pub trait SyncObserver: Send + Sync {
    /// A snapshot was published (host) or successfully applied (follower)
    fn snapshot_applied(&self, snapshot: &PlaybackSnapshot);

    /// The follower's sync health changed
    fn status_changed(&self, status: SyncStatus);

    /// A host publish failed; recoverable, the next update supersedes it
    fn publish_failed(&self, error: &StoreError);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::{PlayerCommand, ScriptedPlayer};
    use super::*;
    use crate::store::{EventId, MemoryStateStore, StateStore};

    /// The full host-to-follower path through the shared store.
    #[tokio::test]
    async fn host_publish_reaches_follower_through_the_store() {
        let store = Arc::new(MemoryStateStore::new());
        let event = EventId::random();

        let host_player = Arc::new(ScriptedPlayer::new());
        host_player.set_position(0.0, Some(5400.0));
        let mut host =
            HostController::new(Arc::clone(&store), Arc::clone(&host_player), event.clone());
        host.ensure_initialized().await.unwrap();
        host.set_playing(true).await;

        let published = store.load(&event).await.unwrap().unwrap();
        assert!(published.is_playing);

        // A follower observes the snapshot after 5 seconds of propagation
        let follower_player = Arc::new(ScriptedPlayer::new());
        let mut follower = FollowerSynchronizer::new(Arc::clone(&follower_player));
        follower
            .apply(&published, published.last_updated_at + 5_000)
            .await;

        assert_eq!(
            follower_player.commands(),
            vec![
                PlayerCommand::SeekTo {
                    seconds: 5.0,
                    allow_seek_ahead: true
                },
                PlayerCommand::Play,
            ]
        );

        // Host pauses at 12s; the follower lands on 12 exactly, no matter
        // how much later it observes the snapshot
        host_player.set_position(12.0, Some(5400.0));
        host.set_playing(false).await;
        let published = store.load(&event).await.unwrap().unwrap();

        follower_player.clear_commands();
        follower
            .apply(&published, published.last_updated_at + 60_000)
            .await;

        assert_eq!(
            follower_player.commands(),
            vec![
                PlayerCommand::SeekTo {
                    seconds: 12.0,
                    allow_seek_ahead: true
                },
                PlayerCommand::Pause,
            ]
        );
        assert_eq!(follower.status(), SyncStatus::Synced);
    }
}
