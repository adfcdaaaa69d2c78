//! Player bridge wire types

use serde::{Deserialize, Serialize};

/// Transport state reported by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Unstarted,
    Playing,
    Paused,
    Buffering,
    Ended,
    Cued,
}

impl PlayerState {
    /// Whether the playhead is advancing. Buffering counts: the player is
    /// trying to advance and will resume on its own.
    pub fn is_advancing(&self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Buffering)
    }
}

/// Progress report sampled from the embedded player.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProgress {
    pub state: PlayerState,
    /// Playhead position in seconds
    pub current_time: f64,
    /// Media length in seconds, once the player knows it
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Request body for the seek command
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekRequest {
    pub seconds: f64,
    pub allow_seek_ahead: bool,
}

/// Request body for the controls toggle
#[derive(Debug, Clone, Serialize)]
pub struct ControlsRequest {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_parses_with_and_without_duration() {
        let progress: PlayerProgress =
            serde_json::from_str(r#"{"state":"playing","currentTime":17.25,"duration":5400.0}"#)
                .unwrap();
        assert_eq!(progress.state, PlayerState::Playing);
        assert_eq!(progress.current_time, 17.25);
        assert_eq!(progress.duration, Some(5400.0));

        let progress: PlayerProgress =
            serde_json::from_str(r#"{"state":"buffering","currentTime":0.0}"#).unwrap();
        assert!(progress.state.is_advancing());
        assert_eq!(progress.duration, None);
    }

    #[test]
    fn ended_and_paused_do_not_advance() {
        assert!(!PlayerState::Paused.is_advancing());
        assert!(!PlayerState::Ended.is_advancing());
        assert!(!PlayerState::Cued.is_advancing());
        assert!(PlayerState::Playing.is_advancing());
    }
}
