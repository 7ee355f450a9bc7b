//! Permanent score storage shared across connections.

use dashmap::DashMap;
use hexagram_core::ledger::{PermanentScoreRecord, ScoreStore};
use std::sync::Arc;

/// Cloneable handle to one in-memory record map; every clone sees the same
/// records.
#[derive(Debug, Clone, Default)]
pub struct SharedScoreStore {
    records: Arc<DashMap<String, PermanentScoreRecord>>,
}

impl SharedScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl ScoreStore for SharedScoreStore {
    fn get(&self, key: &str) -> Option<PermanentScoreRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }

    fn set(&mut self, key: &str, record: PermanentScoreRecord) {
        self.records.insert(key.to_string(), record);
    }
}
