//! In-memory record store.

use crate::value::{Record, RecordId};
use crate::{RecordStore, StoreError};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::Duration;

/// Per-model lookup counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub find_by_id: HashMap<String, usize>,
    pub find_by_ids: HashMap<String, usize>,
}

impl LookupStats {
    /// Total lookups of either kind issued against `model`.
    pub fn lookups(&self, model: &str) -> usize {
        self.find_by_id.get(model).copied().unwrap_or(0)
            + self.find_by_ids.get(model).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.find_by_id.values().sum::<usize>() + self.find_by_ids.values().sum::<usize>()
    }
}

/// Collections of records held in memory, one per model.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, IndexMap<RecordId, Record>>>,
    stats: Mutex<LookupStats>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup by `latency`, so that concurrent lookups overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make `model` servable even while it holds no records.
    pub fn create_collection(&self, model: &str) {
        self.collections
            .write()
            .entry(model.to_string())
            .or_default();
    }

    /// Insert or replace a record, creating its collection on demand.
    pub fn insert(&self, record: Record) {
        self.collections
            .write()
            .entry(record.model.clone())
            .or_default()
            .insert(record.id.clone(), record);
    }

    pub fn insert_many(&self, records: impl IntoIterator<Item = Record>) {
        let mut collections = self.collections.write();
        for record in records {
            collections
                .entry(record.model.clone())
                .or_default()
                .insert(record.id.clone(), record);
        }
    }

    /// Remove every record, keeping the collections themselves.
    pub fn clear(&self) {
        for records in self.collections.write().values_mut() {
            records.clear();
        }
        *self.stats.lock() = LookupStats::default();
    }

    /// All records of `model` in insertion order.
    pub fn all(&self, model: &str) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read();
        let records = collections
            .get(model)
            .ok_or_else(|| StoreError::UnknownCollection(model.to_string()))?;
        Ok(records.values().cloned().collect())
    }

    pub fn len(&self, model: &str) -> usize {
        self.collections.read().get(model).map_or(0, IndexMap::len)
    }

    pub fn stats(&self) -> LookupStats {
        self.stats.lock().clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_id(&self, model: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        *self
            .stats
            .lock()
            .find_by_id
            .entry(model.to_string())
            .or_default() += 1;
        self.delay().await;

        let collections = self.collections.read();
        let records = collections
            .get(model)
            .ok_or_else(|| StoreError::UnknownCollection(model.to_string()))?;
        Ok(records.get(id).cloned())
    }

    async fn find_by_ids(&self, model: &str, ids: &[RecordId]) -> Result<Vec<Record>, StoreError> {
        *self
            .stats
            .lock()
            .find_by_ids
            .entry(model.to_string())
            .or_default() += 1;
        self.delay().await;

        let collections = self.collections.read();
        let records = collections
            .get(model)
            .ok_or_else(|| StoreError::UnknownCollection(model.to_string()))?;

        // Collection order, like a `{_id: {$in: ids}}` scan.
        Ok(records
            .values()
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect())
    }

    fn has_model(&self, model: &str) -> bool {
        self.collections.read().contains_key(model)
    }
}
