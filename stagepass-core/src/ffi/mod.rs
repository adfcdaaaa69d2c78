//! FFI bindings for viewer shell integration
//!
//! This module provides the interface exposed via uniffi to Swift/Kotlin.

mod session;
mod types;

pub use session::*;
pub use types::*;
