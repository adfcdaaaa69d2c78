//! In-process state store
//!
//! Backs tests and local tooling with the same trait surface as the real
//! backend client.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{EventId, StateStore, StoreError};
use crate::sync::PlaybackSnapshot;

/// Stores snapshot documents in a process-local map.
#[derive(Default)]
pub struct MemoryStateStore {
    docs: RwLock<HashMap<EventId, PlaybackSnapshot>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held, for tooling display.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, event: &EventId) -> Result<Option<PlaybackSnapshot>, StoreError> {
        Ok(self.docs.read().get(event).cloned())
    }

    async fn save(&self, event: &EventId, snapshot: &PlaybackSnapshot) -> Result<(), StoreError> {
        self.docs.write().insert(event.clone(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = MemoryStateStore::new();
        let event = EventId::random();

        assert_eq!(store.load(&event).await.unwrap(), None);

        let snapshot = PlaybackSnapshot::initial(42);
        store.save(&event, &snapshot).await.unwrap();
        assert_eq!(store.load(&event).await.unwrap(), Some(snapshot));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn events_are_isolated() {
        let store = MemoryStateStore::new();
        let a = EventId::random();
        let b = EventId::random();

        store.save(&a, &PlaybackSnapshot::initial(1)).await.unwrap();
        assert_eq!(store.load(&b).await.unwrap(), None);
    }
}
