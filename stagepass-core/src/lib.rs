//! StagePass Live Viewer - Core Library
//!
//! This library keeps every attendee's embedded video player locked to the
//! event organizer's playback during a live stream: the host publishes small
//! state snapshots to the product's document backend, and followers
//! extrapolate and converge on them.

pub mod ffi;
pub mod player;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use player::{PlayerBridge, PlayerPort};
pub use store::{EventId, RemoteStateStore, StateStore};
pub use sync::{extrapolate_position, FollowerSynchronizer, HostController, PlaybackSnapshot};

// Setup uniffi scaffolding
uniffi::setup_scaffolding!();
