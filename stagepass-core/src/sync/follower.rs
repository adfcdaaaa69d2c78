//! Follower Synchronizer
//!
//! Runs on every viewer that is not the host. The local player is inert -
//! its native controls are disabled - and every correction it receives is
//! derived from the host's snapshots: seek to the extrapolated target, then
//! match the host's play/pause state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Mutex};
use tracing::{debug, warn};

use super::clock::{current_time_ms, extrapolate_position};
use super::state::{PlaybackSnapshot, SyncStatus};
use super::SyncObserver;
use crate::player::{PlayerError, PlayerPort};

/// How often the extrapolated correction is re-checked between snapshots,
/// so a failed dispatch gets retried without waiting for the host
pub const CORRECTION_PERIOD: Duration = Duration::from_secs(2);

/// Converges a passive player onto the host's published state.
pub struct FollowerSynchronizer<P> {
    player: Arc<P>,
    observer: Option<Arc<dyn SyncObserver>>,
    status: SyncStatus,
    /// Stamp of the last successfully applied snapshot; older or equal
    /// snapshots are skipped so redundant seeks do not stutter playback
    last_applied_ms: Option<u64>,
    last_snapshot: Option<PlaybackSnapshot>,
}

impl<P> FollowerSynchronizer<P>
where
    P: PlayerPort,
{
    pub fn new(player: Arc<P>) -> Self {
        Self {
            player,
            observer: None,
            status: SyncStatus::default(),
            last_applied_ms: None,
            last_snapshot: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// The most recently applied snapshot, if any.
    pub fn last_snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Apply one correction from a snapshot observed at `now_ms`.
    ///
    /// Snapshots are applied at most once: anything not strictly newer than
    /// the last applied one is skipped. A failed dispatch leaves the
    /// snapshot unapplied, so the next tick retries it.
    pub async fn apply(&mut self, snapshot: &PlaybackSnapshot, now_ms: u64) {
        if let Some(applied) = self.last_applied_ms {
            if !snapshot.is_newer_than(applied) {
                return;
            }
        }

        self.set_status(SyncStatus::Syncing);
        let target = extrapolate_position(snapshot, now_ms);

        match self.dispatch(snapshot, target).await {
            Ok(()) => {
                self.last_applied_ms = Some(snapshot.last_updated_at);
                self.last_snapshot = Some(snapshot.clone());
                self.set_status(SyncStatus::Synced);
                if let Some(observer) = &self.observer {
                    observer.snapshot_applied(snapshot);
                }
            }
            Err(e) => {
                // A lagging stream beats a crashed viewer; the status
                // indicator is the whole blast radius.
                debug!("correction dispatch failed: {}", e);
                self.set_status(SyncStatus::Error);
            }
        }
    }

    /// Track the host until cancelled.
    ///
    /// Two sources feed corrections: the snapshot watch (push) and a fixed
    /// interval (retry/drift). Either one going quiet does not stop the
    /// other, and the oneshot tears both down together.
    pub async fn run(
        follower: Arc<Mutex<Self>>,
        mut snapshots: watch::Receiver<Option<PlaybackSnapshot>>,
        mut cancel: oneshot::Receiver<()>,
    ) {
        // Followers must not be able to diverge locally
        {
            let f = follower.lock().await;
            if let Err(e) = f.player.set_controls_enabled(false).await {
                warn!("disabling player controls failed: {}", e);
            }
        }

        let mut tick = tokio::time::interval(CORRECTION_PERIOD);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut cancel => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break; // subscription torn down
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    if let Some(snapshot) = snapshot {
                        follower.lock().await.apply(&snapshot, current_time_ms()).await;
                    }
                }
                _ = tick.tick() => {
                    let snapshot = snapshots.borrow().clone();
                    if let Some(snapshot) = snapshot {
                        follower.lock().await.apply(&snapshot, current_time_ms()).await;
                    }
                }
            }
        }

        debug!("follower correction loop stopped");
    }

    async fn dispatch(&self, snapshot: &PlaybackSnapshot, target: f64) -> Result<(), PlayerError> {
        self.player.seek_to(target, true).await?;
        if snapshot.is_playing {
            self.player.play().await
        } else {
            self.player.pause().await
        }
    }

    fn set_status(&mut self, status: SyncStatus) {
        if self.status != status {
            self.status = status;
            if let Some(observer) = &self.observer {
                observer.status_changed(status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{PlayerCommand, RecordingObserver, ScriptedPlayer};

    const T: u64 = 1_700_000_000_000;

    fn snapshot(is_playing: bool, current_time: f64, last_updated_at: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing,
            current_time,
            last_updated_at,
            duration: None,
        }
    }

    #[tokio::test]
    async fn follower_converges_on_host_timeline() {
        // The end-to-end scenario: host starts at zero, follower joins with
        // 5s of propagation delay, host later pauses at 12s.
        let player = Arc::new(ScriptedPlayer::new());
        let mut follower = FollowerSynchronizer::new(Arc::clone(&player));

        follower.apply(&snapshot(true, 0.0, T), T + 5_000).await;
        assert_eq!(
            player.commands(),
            vec![
                PlayerCommand::SeekTo {
                    seconds: 5.0,
                    allow_seek_ahead: true
                },
                PlayerCommand::Play,
            ]
        );
        assert_eq!(follower.status(), SyncStatus::Synced);

        // Pause is time-invariant: any later observation lands on 12 exactly
        player.clear_commands();
        follower.apply(&snapshot(false, 12.0, T + 12_000), T + 19_000).await;
        assert_eq!(
            player.commands(),
            vec![
                PlayerCommand::SeekTo {
                    seconds: 12.0,
                    allow_seek_ahead: true
                },
                PlayerCommand::Pause,
            ]
        );
    }

    #[tokio::test]
    async fn stale_snapshots_are_never_reapplied() {
        let player = Arc::new(ScriptedPlayer::new());
        let mut follower = FollowerSynchronizer::new(Arc::clone(&player));

        follower.apply(&snapshot(true, 10.0, T + 3_000), T + 3_000).await;
        player.clear_commands();

        // Older and equal stamps are both skipped
        follower.apply(&snapshot(true, 1.0, T + 1_000), T + 4_000).await;
        follower.apply(&snapshot(true, 10.0, T + 3_000), T + 5_000).await;
        assert!(player.commands().is_empty());

        // A newer stamp still goes through
        follower.apply(&snapshot(true, 20.0, T + 6_000), T + 6_000).await;
        assert!(!player.commands().is_empty());
    }

    #[tokio::test]
    async fn snapshots_apply_in_order() {
        let player = Arc::new(ScriptedPlayer::new());
        let mut follower = FollowerSynchronizer::new(Arc::clone(&player));

        for (position, stamp) in [(1.0, T + 1_000), (2.0, T + 2_000), (3.0, T + 3_000)] {
            follower.apply(&snapshot(false, position, stamp), stamp).await;
        }

        let seeks: Vec<f64> = player
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                PlayerCommand::SeekTo { seconds, .. } => Some(seconds),
                _ => None,
            })
            .collect();
        assert_eq!(seeks, vec![1.0, 2.0, 3.0]);
        assert_eq!(follower.last_snapshot().unwrap().current_time, 3.0);
    }

    #[tokio::test]
    async fn dispatch_failure_sets_error_and_recovers() {
        let player = Arc::new(ScriptedPlayer::new());
        let observer = Arc::new(RecordingObserver::new());
        let mut follower = FollowerSynchronizer::new(Arc::clone(&player))
            .with_observer(Arc::clone(&observer) as Arc<dyn SyncObserver>);

        player.fail_dispatch(true);
        follower.apply(&snapshot(true, 30.0, T), T).await;
        assert_eq!(follower.status(), SyncStatus::Error);

        // The failed snapshot was not marked applied, so the periodic tick
        // retrying the same snapshot brings the follower back
        player.fail_dispatch(false);
        follower.apply(&snapshot(true, 30.0, T), T + 2_000).await;
        assert_eq!(follower.status(), SyncStatus::Synced);
        assert_eq!(observer.snapshots().len(), 1);

        // The initial status is already Syncing, so the first transition the
        // observer sees is the failure
        assert_eq!(
            observer.statuses(),
            vec![SyncStatus::Error, SyncStatus::Syncing, SyncStatus::Synced]
        );
    }

    #[tokio::test]
    async fn run_loop_locks_out_native_controls() {
        let player = Arc::new(ScriptedPlayer::new());
        let follower = Arc::new(Mutex::new(FollowerSynchronizer::new(Arc::clone(&player))));

        let (_tx, rx) = watch::channel(None);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let handle = tokio::spawn(FollowerSynchronizer::run(follower, rx, cancel_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(
            player.commands().first(),
            Some(&PlayerCommand::SetControls(false))
        );
    }
}
