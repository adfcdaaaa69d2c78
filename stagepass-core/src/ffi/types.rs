//! FFI types exposed via uniffi

use crate::sync::{
    EventPhase as InternalEventPhase, PlaybackSnapshot, SyncRole,
    SyncStatus as InternalSyncStatus,
};

/// Error types exposed via FFI
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CoreError {
    #[error("viewer does not have access to this event")]
    AccessDenied,

    #[error("event is not live")]
    EventNotLive,

    #[error("invalid event id: {0}")]
    InvalidEventId(String),

    #[error("no state backend configured")]
    BackendNotConfigured,

    #[error("viewer session already started")]
    AlreadyStarted,

    #[error("viewer session not started")]
    NotStarted,

    #[error("only the host can control playback")]
    NotHost,
}

/// Playback state exposed via FFI
#[derive(Debug, Clone, uniffi::Record)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_time: f64,
    pub last_updated_at: u64,
    pub duration: Option<f64>,
}

impl From<&PlaybackSnapshot> for PlaybackState {
    fn from(s: &PlaybackSnapshot) -> Self {
        Self {
            is_playing: s.is_playing,
            current_time: s.current_time,
            last_updated_at: s.last_updated_at,
            duration: s.duration,
        }
    }
}

/// Follower sync health exposed via FFI
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum SyncStatus {
    Synced,
    Syncing,
    Error,
}

impl From<InternalSyncStatus> for SyncStatus {
    fn from(s: InternalSyncStatus) -> Self {
        match s {
            InternalSyncStatus::Synced => SyncStatus::Synced,
            InternalSyncStatus::Syncing => SyncStatus::Syncing,
            InternalSyncStatus::Error => SyncStatus::Error,
        }
    }
}

/// Which side of the sync protocol this session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ViewerRole {
    Host,
    Follower,
}

impl From<SyncRole> for ViewerRole {
    fn from(r: SyncRole) -> Self {
        match r {
            SyncRole::Host => ViewerRole::Host,
            SyncRole::Follower => ViewerRole::Follower,
        }
    }
}

/// Event lifecycle status, supplied by the surrounding application
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum EventPhase {
    Upcoming,
    Live,
    Completed,
}

impl From<EventPhase> for InternalEventPhase {
    fn from(p: EventPhase) -> Self {
        match p {
            EventPhase::Upcoming => InternalEventPhase::Upcoming,
            EventPhase::Live => InternalEventPhase::Live,
            EventPhase::Completed => InternalEventPhase::Completed,
        }
    }
}

/// Callback interface for viewer session events
#[uniffi::export(callback_interface)]
pub trait ViewerCallback: Send + Sync {
    /// Synchronization started, with the resolved role
    fn on_started(&self, role: ViewerRole);
    /// A snapshot was published (host) or applied (follower)
    fn on_snapshot(&self, state: PlaybackState);
    /// The follower's sync health changed
    fn on_sync_status(&self, status: SyncStatus);
    /// A host publish failed; recoverable, surfaced for a toast
    fn on_publish_error(&self, message: String);
    /// Synchronization stopped
    fn on_stopped(&self);
}
