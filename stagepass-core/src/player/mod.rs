//! Embedded Player Control
//!
//! The viewer shell embeds a third-party video player; this module is the
//! command channel the sync engine uses to drive it.

mod bridge;
mod types;

pub use bridge::{PlayerBridge, PlayerError, PlayerPort, DEFAULT_PORT};
pub use types::{PlayerProgress, PlayerState};
