//! Shared Playback State

use serde::{Deserialize, Serialize};

/// Snapshot of the host's playback, stored as one document per live event.
///
/// The host is the only writer; every follower reads it. `current_time` is
/// the host's position at the moment `last_updated_at` was stamped and is
/// meaningless without it - consumers must extrapolate for elapsed time
/// before acting on it (see [`crate::sync::clock`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    /// Whether the host's player is currently advancing
    pub is_playing: bool,
    /// Host player position in seconds at `last_updated_at`
    pub current_time: f64,
    /// Wall-clock milliseconds since epoch when the host sampled its player
    pub last_updated_at: u64,
    /// Total media length in seconds, when the player reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl PlaybackSnapshot {
    /// The document a host creates the first time it mounts for a live event.
    pub fn initial(now_ms: u64) -> Self {
        Self {
            is_playing: true,
            current_time: 0.0,
            last_updated_at: now_ms,
            duration: None,
        }
    }

    /// Successive host writes carry non-decreasing timestamps, so "newer"
    /// reduces to a timestamp comparison.
    pub fn is_newer_than(&self, other_updated_at: u64) -> bool {
        self.last_updated_at > other_updated_at
    }
}

/// Health of a follower's last correction attempt. Local to each follower,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// A correction is in flight (or none has completed yet)
    Syncing,
    /// The last correction was dispatched successfully
    Synced,
    /// The last correction failed to dispatch
    Error,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Syncing
    }
}

/// Which side of the protocol this client runs.
///
/// Resolved exactly once per session from the viewer's identity; the two
/// behaviors are constructed separately rather than branching on a flag in
/// shared code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRole {
    /// The event's organizer: owns the authoritative player, publishes state
    Host,
    /// Everyone else: player is inert, converges to the host's snapshots
    Follower,
}

impl SyncRole {
    /// Identity comparison against the event's organizer.
    pub fn resolve(viewer_id: &str, organizer_id: &str) -> Self {
        if viewer_id == organizer_id {
            SyncRole::Host
        } else {
            SyncRole::Follower
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, SyncRole::Host)
    }
}

/// Lifecycle status of an event, supplied by the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    Upcoming,
    Live,
    Completed,
}

impl EventPhase {
    /// Synchronization only runs while the event is live.
    pub fn is_live(&self) -> bool {
        matches!(self, EventPhase::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_snapshot_starts_playing_at_zero() {
        let snapshot = PlaybackSnapshot::initial(1_700_000_000_000);
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.current_time, 0.0);
        assert_eq!(snapshot.last_updated_at, 1_700_000_000_000);
        assert!(snapshot.duration.is_none());
    }

    #[test]
    fn snapshot_wire_shape_matches_backend_document() {
        let snapshot = PlaybackSnapshot {
            is_playing: true,
            current_time: 42.5,
            last_updated_at: 1_700_000_000_000,
            duration: Some(3600.0),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["isPlaying"], true);
        assert_eq!(json["currentTime"], 42.5);
        assert_eq!(json["lastUpdatedAt"], 1_700_000_000_000u64);
        assert_eq!(json["duration"], 3600.0);

        let back: PlaybackSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn duration_is_omitted_when_unknown() {
        let snapshot = PlaybackSnapshot::initial(0);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("duration").is_none());

        // Documents written before the player reported a duration still parse
        let parsed: PlaybackSnapshot =
            serde_json::from_str(r#"{"isPlaying":false,"currentTime":7.0,"lastUpdatedAt":123}"#)
                .unwrap();
        assert_eq!(parsed.duration, None);
        assert_eq!(parsed.current_time, 7.0);
    }

    #[test]
    fn role_resolution_is_identity_comparison() {
        assert_eq!(SyncRole::resolve("org_1", "org_1"), SyncRole::Host);
        assert_eq!(SyncRole::resolve("att_2", "org_1"), SyncRole::Follower);
        assert!(SyncRole::resolve("org_1", "org_1").is_host());
    }

    #[test]
    fn only_live_events_sync() {
        assert!(!EventPhase::Upcoming.is_live());
        assert!(EventPhase::Live.is_live());
        assert!(!EventPhase::Completed.is_live());
    }
}
