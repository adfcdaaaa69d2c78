//! Document backend HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, instrument, warn};

use super::{EventId, StateStore, StoreError};
use crate::sync::PlaybackSnapshot;

/// Connection timeout against the managed backend
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Per-request timeout; a publish that takes longer than this is superseded
/// by the next one anyway
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Error payload the backend attaches to non-2xx responses
#[derive(Debug, serde::Deserialize)]
struct BackendErrorBody {
    message: String,
}

/// Client for the backend's playback-state document API.
#[derive(Debug, Clone)]
pub struct RemoteStateStore {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteStateStore {
    /// Create a store client against the given backend endpoint,
    /// e.g. `https://backend.example.com` or a local `state-server`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            http,
            base_url,
            api_key: None,
        }
    }

    /// Attach an API key sent with every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn request(&self, method: Method, event: &EventId) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/events/{}/playback", self.base_url, event);
        let mut req = self.http.request(method, &url);

        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        req
    }

    /// Turn a non-2xx response into a `StoreError`, draining the error body
    /// for its message when one is present.
    async fn error_from(resp: reqwest::Response) -> StoreError {
        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
            _ => {
                let message = match resp.json::<BackendErrorBody>().await {
                    Ok(body) => body.message,
                    Err(_) => format!("unexpected response (HTTP {})", status.as_u16()),
                };
                StoreError::Backend(message)
            }
        }
    }
}

#[async_trait]
impl StateStore for RemoteStateStore {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn load(&self, event: &EventId) -> Result<Option<PlaybackSnapshot>, StoreError> {
        let resp = self.request(Method::GET, event).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let snapshot = resp.json::<PlaybackSnapshot>().await?;
                debug!(
                    "loaded snapshot for {}: playing={} at {:.1}s",
                    event, snapshot.is_playing, snapshot.current_time
                );
                Ok(Some(snapshot))
            }
            _ => Err(Self::error_from(resp).await),
        }
    }

    async fn save(&self, event: &EventId, snapshot: &PlaybackSnapshot) -> Result<(), StoreError> {
        let resp = self
            .request(Method::PUT, event)
            .json(snapshot)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let err = Self::error_from(resp).await;
            warn!("saving snapshot for {} failed: {}", event, err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let store = RemoteStateStore::new("http://127.0.0.1:8090/");
        assert_eq!(store.base_url, "http://127.0.0.1:8090");

        let with_key = RemoteStateStore::new("http://127.0.0.1:8090").with_api_key("secret");
        assert_eq!(with_key.api_key, Some("secret".to_string()));
    }
}
