//! Viewer session implementation for FFI

use std::sync::{Arc, Once, RwLock};
use tokio::runtime::Runtime;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

use crate::player::PlayerBridge;
use crate::store::{
    spawn_snapshot_watch, EventId, RemoteStateStore, SnapshotWatch, StoreError,
    SNAPSHOT_POLL_PERIOD,
};
use crate::sync::{
    FollowerSynchronizer, HostController, PlaybackSnapshot, SyncObserver, SyncRole,
    SyncStatus as InternalSyncStatus,
};

use super::types::*;

static TRACING_INIT: Once = Once::new();

type HostHandle = Arc<Mutex<HostController<RemoteStateStore, PlayerBridge>>>;
type FollowerHandle = Arc<Mutex<FollowerSynchronizer<PlayerBridge>>>;
type SharedCallback = Arc<RwLock<Option<Arc<dyn ViewerCallback>>>>;

/// The one behavior constructed for this session. The role is resolved once
/// at start; host and follower never share a code path afterwards.
enum ActiveRole {
    Host {
        controller: HostHandle,
        cancel: oneshot::Sender<()>,
    },
    Follower {
        synchronizer: FollowerHandle,
        /// Holds the store subscription alive; dropped on stop
        watch: SnapshotWatch,
        cancel: oneshot::Sender<()>,
    },
}

struct ActiveSync {
    event: EventId,
    role: ActiveRole,
}

/// Bridges engine events out to the FFI callback.
struct CallbackObserver {
    callback: SharedCallback,
}

impl SyncObserver for CallbackObserver {
    fn snapshot_applied(&self, snapshot: &PlaybackSnapshot) {
        if let Some(cb) = self.callback.read().unwrap().as_ref() {
            cb.on_snapshot(PlaybackState::from(snapshot));
        }
    }

    fn status_changed(&self, status: InternalSyncStatus) {
        if let Some(cb) = self.callback.read().unwrap().as_ref() {
            cb.on_sync_status(status.into());
        }
    }

    fn publish_failed(&self, error: &StoreError) {
        if let Some(cb) = self.callback.read().unwrap().as_ref() {
            cb.on_publish_error(error.to_string());
        }
    }
}

/// Main viewer session interface
#[derive(uniffi::Object)]
pub struct ViewerSession {
    runtime: Runtime,
    store: RwLock<Option<Arc<RemoteStateStore>>>,
    player: RwLock<Arc<PlayerBridge>>,
    callback: SharedCallback,
    active: RwLock<Option<ActiveSync>>,
}

#[uniffi::export]
impl ViewerSession {
    /// Create a new session
    #[uniffi::constructor]
    pub fn new() -> Self {
        // Initialize tracing once
        TRACING_INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_ansi(false) // Viewer shells capture stderr as plain text
                .with_target(false)
                .with_env_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive("stagepass_core=debug".parse().unwrap())
                        .add_directive("hyper_util=off".parse().unwrap())
                        .add_directive("reqwest=off".parse().unwrap())
                        .add_directive("hyper=off".parse().unwrap()),
                )
                .with_writer(std::io::stderr)
                .init();
        });

        info!("Initializing stagepass-core viewer session");

        let runtime = Runtime::new().expect("Failed to create tokio runtime");

        Self {
            runtime,
            store: RwLock::new(None),
            player: RwLock::new(Arc::new(PlayerBridge::new())),
            callback: Arc::new(RwLock::new(None)),
            active: RwLock::new(None),
        }
    }

    /// Point the session at the document backend
    pub fn set_backend(&self, base_url: String, api_key: Option<String>) {
        let mut store = RemoteStateStore::new(base_url);
        if let Some(key) = api_key {
            store = store.with_api_key(key);
        }
        *self.store.write().unwrap() = Some(Arc::new(store));
    }

    /// Point the session at the embedding shell's player bridge port
    pub fn set_player_port(&self, port: u16) {
        *self.player.write().unwrap() = Arc::new(PlayerBridge::with_port(port));
    }

    /// Set the event callback
    pub fn set_callback(&self, callback: Box<dyn ViewerCallback>) {
        *self.callback.write().unwrap() = Some(Arc::from(callback));
    }

    /// Start synchronizing for a live event.
    ///
    /// The role is resolved here, once, from the viewer's identity against
    /// the event's organizer; the gate inputs (`phase`, `has_access`) come
    /// from the surrounding application and are not re-derived.
    pub fn start(
        &self,
        event_id: String,
        viewer_id: String,
        organizer_id: String,
        phase: EventPhase,
        has_access: bool,
    ) -> Result<ViewerRole, CoreError> {
        {
            let active = self.active.read().unwrap();
            if active.is_some() {
                return Err(CoreError::AlreadyStarted);
            }
        }

        if !has_access {
            return Err(CoreError::AccessDenied);
        }
        let phase: crate::sync::EventPhase = phase.into();
        if !phase.is_live() {
            return Err(CoreError::EventNotLive);
        }

        let event =
            EventId::parse(&event_id).ok_or_else(|| CoreError::InvalidEventId(event_id.clone()))?;
        let store = self
            .store
            .read()
            .unwrap()
            .clone()
            .ok_or(CoreError::BackendNotConfigured)?;
        let player = self.player.read().unwrap().clone();

        let role = SyncRole::resolve(&viewer_id, &organizer_id);
        let observer: Arc<dyn SyncObserver> = Arc::new(CallbackObserver {
            callback: Arc::clone(&self.callback),
        });

        let active_role = match role {
            SyncRole::Host => {
                let mut controller = HostController::new(store, player, event.clone())
                    .with_observer(observer);

                // Adopt-or-create. A failed write here is recoverable like
                // any other publish failure; the publish loop supersedes it.
                if let Err(e) = self.runtime.block_on(controller.ensure_initialized()) {
                    warn!("host initialization failed: {}", e);
                    if let Some(cb) = self.callback.read().unwrap().as_ref() {
                        cb.on_publish_error(e.to_string());
                    }
                }

                let controller = Arc::new(Mutex::new(controller));
                let (cancel_tx, cancel_rx) = oneshot::channel();
                self.runtime
                    .spawn(HostController::run(Arc::clone(&controller), cancel_rx));

                ActiveRole::Host {
                    controller,
                    cancel: cancel_tx,
                }
            }
            SyncRole::Follower => {
                let synchronizer = Arc::new(Mutex::new(
                    FollowerSynchronizer::new(player).with_observer(observer),
                ));

                let watch = {
                    let _guard = self.runtime.enter();
                    spawn_snapshot_watch(store, event.clone(), SNAPSHOT_POLL_PERIOD)
                };

                let (cancel_tx, cancel_rx) = oneshot::channel();
                self.runtime.spawn(FollowerSynchronizer::run(
                    Arc::clone(&synchronizer),
                    watch.receiver(),
                    cancel_rx,
                ));

                ActiveRole::Follower {
                    synchronizer,
                    watch,
                    cancel: cancel_tx,
                }
            }
        };

        {
            let mut active = self.active.write().unwrap();
            *active = Some(ActiveSync {
                event,
                role: active_role,
            });
        }

        if let Some(cb) = self.callback.read().unwrap().as_ref() {
            cb.on_started(role.into());
        }

        info!("viewer session started for {} as {:?}", event_id, role);
        Ok(role.into())
    }

    /// Stop synchronizing and tear down timers and subscriptions
    pub fn stop(&self) -> Result<(), CoreError> {
        let Some(active) = self.active.write().unwrap().take() else {
            return Err(CoreError::NotStarted);
        };
        let ActiveSync { event, role } = active;

        match role {
            ActiveRole::Host { cancel, .. } => {
                let _ = cancel.send(());
            }
            ActiveRole::Follower { cancel, watch, .. } => {
                let _ = cancel.send(());
                drop(watch); // aborts the store subscription
            }
        }

        if let Some(cb) = self.callback.read().unwrap().as_ref() {
            cb.on_stopped();
        }

        info!("viewer session stopped for {}", event);
        Ok(())
    }

    /// Host-only manual transport control (the play/pause button)
    pub fn set_playing(&self, playing: bool) -> Result<(), CoreError> {
        let active = self.active.read().unwrap();
        match active.as_ref().map(|a| &a.role) {
            None => Err(CoreError::NotStarted),
            Some(ActiveRole::Follower { .. }) => Err(CoreError::NotHost),
            Some(ActiveRole::Host { controller, .. }) => {
                let controller = Arc::clone(controller);
                self.runtime
                    .block_on(async move { controller.lock().await.set_playing(playing).await });
                Ok(())
            }
        }
    }

    /// Sync health. Meaningful for followers; a host is authoritative and
    /// always reports `Synced`.
    pub fn sync_status(&self) -> SyncStatus {
        let active = self.active.read().unwrap();
        match active.as_ref().map(|a| &a.role) {
            Some(ActiveRole::Host { .. }) => SyncStatus::Synced,
            Some(ActiveRole::Follower { synchronizer, .. }) => {
                let synchronizer = Arc::clone(synchronizer);
                let status = self
                    .runtime
                    .block_on(async move { synchronizer.lock().await.status() });
                status.into()
            }
            None => SyncStatus::Syncing,
        }
    }

    /// The last known playback state, if synchronization has produced one
    pub fn playback_state(&self) -> Option<PlaybackState> {
        let active = self.active.read().unwrap();
        match active.as_ref().map(|a| &a.role) {
            Some(ActiveRole::Host { controller, .. }) => {
                let controller = Arc::clone(controller);
                let snapshot = self
                    .runtime
                    .block_on(async move { controller.lock().await.current_snapshot() });
                Some(PlaybackState::from(&snapshot))
            }
            Some(ActiveRole::Follower { synchronizer, .. }) => {
                let synchronizer = Arc::clone(synchronizer);
                self.runtime.block_on(async move {
                    synchronizer
                        .lock()
                        .await
                        .last_snapshot()
                        .map(PlaybackState::from)
                })
            }
            None => None,
        }
    }

    /// The resolved role, if a session is running
    pub fn role(&self) -> Option<ViewerRole> {
        let active = self.active.read().unwrap();
        active.as_ref().map(|a| match a.role {
            ActiveRole::Host { .. } => ViewerRole::Host,
            ActiveRole::Follower { .. } => ViewerRole::Follower,
        })
    }
}

impl Default for ViewerSession {
    fn default() -> Self {
        Self::new()
    }
}
