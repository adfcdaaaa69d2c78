//! Position extrapolation
//!
//! A follower never observes a snapshot at the instant it was written:
//! storage fan-out and UI refresh sit between the host stamping
//! `last_updated_at` and the follower acting on it. Seeking to the raw
//! `current_time` would leave every follower permanently behind by that
//! propagation delay, so the target position is extrapolated from the
//! timestamp the host recorded - not from when the snapshot arrived.

use super::state::PlaybackSnapshot;

/// Where playback should be right now, given a snapshot and the current
/// wall-clock time in the same domain as `last_updated_at`.
///
/// Paused snapshots are time-invariant. Playing snapshots advance by the
/// elapsed time since the host stamped them. The result is clamped to
/// `[0, duration]` when the duration is known; when it is not, the target is
/// returned unclamped and the caller is expected to seek with
/// `allow_seek_ahead` so the player bounds it.
pub fn extrapolate_position(snapshot: &PlaybackSnapshot, now_ms: u64) -> f64 {
    // Malformed documents (negative or non-finite position) clamp to the start.
    let base = if snapshot.current_time.is_finite() {
        snapshot.current_time.max(0.0)
    } else {
        0.0
    };

    let mut target = if snapshot.is_playing {
        let elapsed_secs = now_ms.saturating_sub(snapshot.last_updated_at) as f64 / 1000.0;
        base + elapsed_secs
    } else {
        base
    };

    if let Some(duration) = snapshot.duration {
        if duration.is_finite() && duration >= 0.0 {
            target = target.min(duration);
        }
    }

    target
}

/// Current wall-clock time in milliseconds since UNIX epoch.
pub fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(current_time: f64, last_updated_at: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: true,
            current_time,
            last_updated_at,
            duration: None,
        }
    }

    #[test]
    fn playing_snapshot_advances_by_elapsed_time() {
        let t = 1_700_000_000_000;
        let snapshot = playing(100.0, t);

        assert_eq!(extrapolate_position(&snapshot, t + 3_000), 103.0);
        assert_eq!(extrapolate_position(&snapshot, t), 100.0);
        assert_eq!(extrapolate_position(&snapshot, t + 500), 100.5);
    }

    #[test]
    fn paused_snapshot_is_time_invariant() {
        let t = 1_700_000_000_000;
        let snapshot = PlaybackSnapshot {
            is_playing: false,
            current_time: 50.0,
            last_updated_at: t,
            duration: None,
        };

        assert_eq!(extrapolate_position(&snapshot, t), 50.0);
        assert_eq!(extrapolate_position(&snapshot, t + 10_000), 50.0);
        assert_eq!(extrapolate_position(&snapshot, t + 86_400_000), 50.0);
    }

    #[test]
    fn target_clamps_to_known_duration() {
        let t = 1_700_000_000_000;
        let mut snapshot = playing(3_590.0, t);
        snapshot.duration = Some(3_600.0);

        // 30s elapsed would put us 20s past the end
        assert_eq!(extrapolate_position(&snapshot, t + 30_000), 3_600.0);
    }

    #[test]
    fn unknown_duration_leaves_target_unclamped() {
        let t = 1_700_000_000_000;
        let snapshot = playing(3_590.0, t);

        // No duration in the document: the player bounds the seek, not us
        assert_eq!(extrapolate_position(&snapshot, t + 30_000), 3_620.0);
    }

    #[test]
    fn clock_skew_before_snapshot_is_treated_as_zero_elapsed() {
        let t = 1_700_000_000_000;
        let snapshot = playing(100.0, t);

        // A follower clock slightly behind the host's must not rewind
        assert_eq!(extrapolate_position(&snapshot, t - 2_000), 100.0);
    }

    #[test]
    fn malformed_position_clamps_to_start() {
        let t = 1_700_000_000_000;
        let snapshot = PlaybackSnapshot {
            is_playing: false,
            current_time: -12.0,
            last_updated_at: t,
            duration: None,
        };
        assert_eq!(extrapolate_position(&snapshot, t), 0.0);

        let snapshot = PlaybackSnapshot {
            is_playing: true,
            current_time: f64::NAN,
            last_updated_at: t,
            duration: None,
        };
        assert_eq!(extrapolate_position(&snapshot, t + 1_000), 1.0);
    }
}
