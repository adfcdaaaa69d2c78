//! In-memory document store

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use stagepass_core::{EventId, PlaybackSnapshot};

use crate::metrics::Metrics;

/// Holds one playback-state document per event.
///
/// Writes are last-write-wins, matching the managed backend this server
/// stands in for. The non-decreasing-timestamp contract belongs to the
/// (single) writer, so a stale write is accepted - but it is counted and
/// logged, because it means some client is not the writer it thinks it is.
pub struct DocumentStore {
    docs: RwLock<HashMap<EventId, PlaybackSnapshot>>,
    metrics: Arc<RwLock<Metrics>>,
}

impl DocumentStore {
    pub fn new(metrics: Arc<RwLock<Metrics>>) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn get(&self, event: &EventId) -> Option<PlaybackSnapshot> {
        let doc = self.docs.read().get(event).cloned();
        self.metrics.write().record_read(doc.is_some());
        doc
    }

    pub fn put(&self, event: &EventId, snapshot: PlaybackSnapshot) {
        let stale = {
            let mut docs = self.docs.write();
            let stale = docs
                .get(event)
                .map_or(false, |prev| snapshot.last_updated_at < prev.last_updated_at);
            docs.insert(event.clone(), snapshot.clone());
            stale
        };

        self.metrics.write().record_write(event, &snapshot, stale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (DocumentStore, Arc<RwLock<Metrics>>) {
        let metrics = Arc::new(RwLock::new(Metrics::new()));
        (DocumentStore::new(Arc::clone(&metrics)), metrics)
    }

    fn snapshot(last_updated_at: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: true,
            current_time: 1.0,
            last_updated_at,
            duration: None,
        }
    }

    #[test]
    fn put_then_get() {
        let (store, metrics) = store();
        let event = EventId::random();

        assert_eq!(store.get(&event), None);
        store.put(&event, snapshot(100));
        assert_eq!(store.get(&event).unwrap().last_updated_at, 100);

        let m = metrics.read();
        assert_eq!(m.total_reads, 2);
        assert_eq!(m.read_misses, 1);
        assert_eq!(m.total_writes, 1);
    }

    #[test]
    fn stale_write_wins_but_is_counted() {
        let (store, metrics) = store();
        let event = EventId::random();

        store.put(&event, snapshot(200));
        store.put(&event, snapshot(100)); // timestamp regression

        // Last write wins, like the managed backend
        assert_eq!(store.get(&event).unwrap().last_updated_at, 100);
        assert_eq!(metrics.read().stale_writes, 1);
    }
}
