//! Host Controller
//!
//! Runs only on the client whose identity matches the event's organizer.
//! The host's player is the single source of truth: user play/pause intent
//! lands on the local player immediately, and the resulting state is
//! published to the shared store for followers to converge on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use super::clock::current_time_ms;
use super::state::PlaybackSnapshot;
use super::SyncObserver;
use crate::player::PlayerPort;
use crate::store::{EventId, StateStore, StoreError};

/// How often the host republishes its position while playing, so late
/// joiners and drifted followers resynchronize without a play/pause edge
pub const PUBLISH_PERIOD: Duration = Duration::from_secs(3);

/// Publishes the authoritative playback state for one live event.
pub struct HostController<S, P> {
    store: Arc<S>,
    player: Arc<P>,
    event: EventId,
    observer: Option<Arc<dyn SyncObserver>>,
    is_playing: bool,
    last_position: f64,
    duration: Option<f64>,
    /// Stamp of the last publish; later writes never go below it
    last_published_ms: u64,
}

impl<S, P> HostController<S, P>
where
    S: StateStore,
    P: PlayerPort,
{
    pub fn new(store: Arc<S>, player: Arc<P>, event: EventId) -> Self {
        Self {
            store,
            player,
            event,
            observer: None,
            is_playing: false,
            last_position: 0.0,
            duration: None,
            last_published_ms: 0,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// The host's local view of the shared document.
    pub fn current_snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            current_time: self.last_position,
            last_updated_at: self.last_published_ms,
            duration: self.duration,
        }
    }

    /// Adopt the event's existing document, or create the initial one.
    ///
    /// A host remounting mid-event must not reset followers to zero, so an
    /// existing document always wins over the default.
    pub async fn ensure_initialized(&mut self) -> Result<PlaybackSnapshot, StoreError> {
        if let Some(existing) = self.store.load(&self.event).await? {
            info!(
                "adopting existing playback state for {}: playing={} at {:.1}s",
                self.event, existing.is_playing, existing.current_time
            );
            self.is_playing = existing.is_playing;
            self.last_position = existing.current_time;
            self.duration = existing.duration;
            self.last_published_ms = existing.last_updated_at;
            return Ok(existing);
        }

        let snapshot = PlaybackSnapshot::initial(self.next_timestamp());
        self.store.save(&self.event, &snapshot).await?;
        self.is_playing = snapshot.is_playing;
        self.last_position = snapshot.current_time;
        info!("created playback state for {}", self.event);
        Ok(snapshot)
    }

    /// Apply a local play/pause intent.
    ///
    /// The local player is commanded first - the host never waits on a
    /// storage round-trip to see its own click take effect.
    pub async fn set_playing(&mut self, playing: bool) {
        let command = if playing {
            self.player.play().await
        } else {
            self.player.pause().await
        };
        if let Err(e) = command {
            warn!(
                "host {} command failed: {}",
                if playing { "play" } else { "pause" },
                e
            );
        }

        self.is_playing = playing;
        self.sample_position().await;

        let snapshot = self.stamped_snapshot();
        self.publish(snapshot).await;
    }

    /// Periodic sampling tick: refresh the published position while playing.
    pub async fn publish_progress(&mut self) {
        if !self.is_playing {
            return;
        }

        match self.player.progress().await {
            Ok(progress) => {
                // The player can stop on its own (media ended); the sampled
                // state wins over the last command.
                self.is_playing = progress.state.is_advancing();
                self.last_position = progress.current_time;
                if progress.duration.is_some() {
                    self.duration = progress.duration;
                }

                let snapshot = self.stamped_snapshot();
                self.publish(snapshot).await;
            }
            Err(e) => debug!("progress sample failed: {}", e),
        }
    }

    /// Drive the periodic publish cadence until cancelled.
    pub async fn run(host: Arc<Mutex<Self>>, mut cancel: oneshot::Receiver<()>) {
        info!("host publish loop started");

        let mut tick = tokio::time::interval(PUBLISH_PERIOD);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut cancel => break,
                _ = tick.tick() => host.lock().await.publish_progress().await,
            }
        }

        info!("host publish loop stopped");
    }

    async fn sample_position(&mut self) {
        match self.player.progress().await {
            Ok(progress) => {
                self.last_position = progress.current_time;
                if progress.duration.is_some() {
                    self.duration = progress.duration;
                }
            }
            // Keep the last known position; the snapshot is still usable
            Err(e) => debug!("position sample failed: {}", e),
        }
    }

    fn stamped_snapshot(&mut self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            current_time: self.last_position,
            last_updated_at: self.next_timestamp(),
            duration: self.duration,
        }
    }

    /// Timestamps carry the ordering contract for followers: strictly
    /// increasing, even if the wall clock stalls or steps backwards. Two
    /// publishes in the same millisecond must still be distinguishable, or
    /// followers would dedupe the second one away.
    fn next_timestamp(&mut self) -> u64 {
        let stamp = current_time_ms().max(self.last_published_ms + 1);
        self.last_published_ms = stamp;
        stamp
    }

    /// Publish failures are recoverable: the host keeps playing and the next
    /// natural update supersedes the lost write. No retry loop.
    async fn publish(&self, snapshot: PlaybackSnapshot) {
        match self.store.save(&self.event, &snapshot).await {
            Ok(()) => {
                if let Some(observer) = &self.observer {
                    observer.snapshot_applied(&snapshot);
                }
            }
            Err(e) => {
                warn!("publishing playback state for {} failed: {}", self.event, e);
                if let Some(observer) = &self.observer {
                    observer.publish_failed(&e);
                }
            }
        }
    }
}
