//! Embedded player command channel

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{ControlsRequest, PlayerProgress, SeekRequest};

/// Default port the embedding shell's player bridge listens on
pub const DEFAULT_PORT: u16 = 43117;

/// Default connection timeout (short since it's localhost)
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(1);

/// Default request timeout (short since it's localhost)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that can occur when commanding the embedded player
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedded player is not reachable")]
    NotReachable,

    #[error("player bridge error: {0}")]
    Bridge(String),
}

/// Imperative channel to an embedded video player.
///
/// The contract is fire-and-forget: the player acknowledges dispatch, never
/// application, so "success" here means the command reached the bridge - a
/// follower's sync status is tracked at that granularity.
#[async_trait]
pub trait PlayerPort: Send + Sync {
    /// Move the playhead. `allow_seek_ahead` lets the player fetch media
    /// beyond what it has buffered (and bound seeks past the end).
    async fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<(), PlayerError>;

    async fn play(&self) -> Result<(), PlayerError>;

    async fn pause(&self) -> Result<(), PlayerError>;

    /// Sample the player's transport state and position.
    async fn progress(&self) -> Result<PlayerProgress, PlayerError>;

    /// Enable or disable the player's native click/keyboard controls.
    /// Followers run with controls off so they cannot diverge locally.
    async fn set_controls_enabled(&self, enabled: bool) -> Result<(), PlayerError>;
}

/// HTTP client for the embedding shell's local player bridge.
///
/// The shell hosts the embedded player and exposes this small control
/// surface on localhost; the core never touches the player frame directly.
#[derive(Debug, Clone)]
pub struct PlayerBridge {
    http: Client,
    base_url: String,
}

impl PlayerBridge {
    /// Create a bridge with default settings (localhost:43117)
    pub fn new() -> Self {
        Self::with_port(DEFAULT_PORT)
    }

    /// Create a bridge against a custom port
    pub fn with_port(port: u16) -> Self {
        let http = Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            // Limit connection pool to avoid stale connections
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            // 127.0.0.1 explicitly to avoid IPv6 issues
            base_url: format!("http://127.0.0.1:{}/player", port),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(format!("{}{}", self.base_url, path))
    }

    fn map_send_error(e: reqwest::Error) -> PlayerError {
        if e.is_connect() || e.is_timeout() {
            warn!("player bridge unreachable: {:?}", e);
            PlayerError::NotReachable
        } else {
            PlayerError::Http(e)
        }
    }
}

impl Default for PlayerBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerPort for PlayerBridge {
    async fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<(), PlayerError> {
        debug!("seekTo {:.2}s (ahead={})", seconds, allow_seek_ahead);
        self.post("/seek")
            .json(&SeekRequest {
                seconds,
                allow_seek_ahead,
            })
            .send()
            .await
            .map_err(Self::map_send_error)?
            .error_for_status()?;
        Ok(())
    }

    async fn play(&self) -> Result<(), PlayerError> {
        self.post("/play")
            .send()
            .await
            .map_err(Self::map_send_error)?
            .error_for_status()?;
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        self.post("/pause")
            .send()
            .await
            .map_err(Self::map_send_error)?
            .error_for_status()?;
        Ok(())
    }

    async fn progress(&self) -> Result<PlayerProgress, PlayerError> {
        let progress = self
            .http
            .get(format!("{}/progress", self.base_url))
            .send()
            .await
            .map_err(Self::map_send_error)?
            .error_for_status()?
            .json::<PlayerProgress>()
            .await?;
        Ok(progress)
    }

    async fn set_controls_enabled(&self, enabled: bool) -> Result<(), PlayerError> {
        self.post("/controls")
            .json(&ControlsRequest { enabled })
            .send()
            .await
            .map_err(Self::map_send_error)?
            .error_for_status()?;
        Ok(())
    }
}
