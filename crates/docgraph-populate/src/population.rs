//! Per-traversal accumulator of resolved records.

use crate::config::{DanglingPolicy, PopulateConfig};
use crate::error::{PopulateError, Result};
use crate::key::TypeKey;
use crate::populator::Target;
use crate::registry::ModelRegistry;
use docgraph_store::{lean, Record, RecordId, RecordStore, Value};
use futures::future::try_join_all;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{HashMap, HashSet};
use std::slice;
use std::sync::Arc;

#[derive(Debug, Default)]
struct State {
    /// Records per type, first discovery wins the slot.
    models: IndexMap<TypeKey, Vec<Record>>,
    /// Ids newly resolved per resolution step, per type.
    ids: IndexMap<TypeKey, Vec<Vec<RecordId>>>,
    /// Ids already in `models`.
    stored: HashMap<TypeKey, HashSet<RecordId>>,
    /// Ids some lookup has taken responsibility for, fetched or not.
    claimed: HashMap<TypeKey, HashSet<RecordId>>,
}

/// State of one population run.
///
/// Sibling lookups run concurrently and append through a mutex that is never
/// held across a lookup.
pub struct Population {
    pub(crate) registry: Arc<ModelRegistry>,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) config: PopulateConfig,
    state: Mutex<State>,
}

impl Population {
    /// Create a population with an empty bucket for every registered type.
    pub fn new(registry: Arc<ModelRegistry>, store: Arc<dyn RecordStore>) -> Self {
        let mut state = State::default();
        for key in registry.keys() {
            state.models.insert(key.clone(), Vec::new());
            state.ids.insert(key.clone(), Vec::new());
        }

        Self {
            registry,
            store,
            config: PopulateConfig::default(),
            state: Mutex::new(state),
        }
    }

    pub fn with_config(mut self, config: PopulateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Append the records not yet in `key`'s bucket and return them.
    ///
    /// With `save_ids`, the ids appended form one entry of [`Population::ids`].
    pub fn register_models(&self, key: &TypeKey, records: Vec<Record>, save_ids: bool) -> Vec<Record> {
        let mut state = self.state.lock();
        let State {
            models,
            ids,
            stored,
            claimed,
        } = &mut *state;

        let stored = stored.entry(key.clone()).or_default();
        let claimed = claimed.entry(key.clone()).or_default();
        let bucket = models.entry(key.clone()).or_default();

        let mut fresh = Vec::new();
        for record in records {
            if !stored.insert(record.id.clone()) {
                continue;
            }
            claimed.insert(record.id.clone());
            bucket.push(record.clone());
            fresh.push(record);
        }

        if save_ids && !fresh.is_empty() {
            ids.entry(key.clone())
                .or_default()
                .push(fresh.iter().map(|record| record.id.clone()).collect());
        }

        tracing::trace!(key = %key, added = fresh.len(), "registered records");
        fresh
    }

    /// Take responsibility for fetching `ids`; returns those nobody has yet.
    pub(crate) fn claim(&self, key: &TypeKey, ids: IndexSet<RecordId>) -> Vec<RecordId> {
        let mut state = self.state.lock();
        let claimed = state.claimed.entry(key.clone()).or_default();
        ids.into_iter().filter(|id| claimed.insert(id.clone())).collect()
    }

    // ========================================================================
    // Population
    // ========================================================================

    /// Add one record and resolve everything it references.
    pub async fn add_model(&self, key: &TypeKey, record: Record) -> Result<()> {
        self.add_models(key, vec![record]).await
    }

    /// Add records and resolve everything they reference.
    ///
    /// Records already present are skipped, and so is their traversal.
    pub async fn add_models(&self, key: &TypeKey, records: Vec<Record>) -> Result<()> {
        let fresh = self.register_models(key, records, false);
        if fresh.is_empty() {
            return Ok(());
        }
        self.populate_array(key, &fresh).await
    }

    /// Resolve the references of a single record of type `key`.
    pub async fn populate_element(&self, key: &TypeKey, record: &Record) -> Result<()> {
        self.populate_array(key, slice::from_ref(record)).await
    }

    /// Resolve the references of `records`, all of type `key`.
    ///
    /// Ids are deduplicated across the whole slice, so each populator issues
    /// at most one lookup.
    pub async fn populate_array(&self, key: &TypeKey, records: &[Record]) -> Result<()> {
        let populators = self
            .registry
            .populators_for(key.as_str())
            .ok_or_else(|| PopulateError::MissingPopulator { key: key.clone() })?;

        if populators.is_empty() || records.is_empty() {
            return Ok(());
        }

        let holders: Vec<_> = records.iter().map(|record| &record.fields).collect();
        try_join_all(
            populators
                .iter()
                .map(|(field, populator)| self.dispatch(field, populator, holders.clone())),
        )
        .await?;
        Ok(())
    }

    /// Fetch the unclaimed ids of `target`, register what comes back, and
    /// recurse into the fresh records.
    pub(crate) async fn resolve(&self, target: &Target, fetched: Vec<Record>, unseen: &[RecordId]) -> Result<()> {
        if fetched.len() < unseen.len() {
            self.check_dangling(target, unseen, &fetched)?;
        }

        let fresh = self.register_models(&target.key, fetched, true);
        if fresh.is_empty() {
            return Ok(());
        }
        self.populate_array(&target.key, &fresh).await
    }

    fn check_dangling(&self, target: &Target, unseen: &[RecordId], fetched: &[Record]) -> Result<()> {
        let found: HashSet<&RecordId> = fetched.iter().map(|record| &record.id).collect();
        let mut missing = unseen.iter().filter(|id| !found.contains(id));

        match self.config.dangling {
            DanglingPolicy::Ignore => {
                let missing: Vec<&RecordId> = missing.collect();
                tracing::debug!(key = %target.key, missing = ?missing, "ignoring dangling references");
                Ok(())
            }
            DanglingPolicy::Error => match missing.next() {
                Some(id) => Err(PopulateError::DanglingReference {
                    key: target.key.clone(),
                    id: id.clone(),
                }),
                None => Ok(()),
            },
        }
    }

    /// Apply the dangling policy to reference values that are not ids.
    pub(crate) fn check_invalid(&self, target: &Target, field: &str, invalid: &[&Value]) -> Result<()> {
        match (self.config.dangling, invalid.first()) {
            (DanglingPolicy::Error, Some(value)) => Err(PopulateError::InvalidReference {
                key: target.key.clone(),
                field: field.to_string(),
                value: format!("{value:?}"),
            }),
            _ => {
                tracing::debug!(key = %target.key, field, count = invalid.len(), "ignoring non-id references");
                Ok(())
            }
        }
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Snapshot of the records gathered so far.
    pub fn models(&self) -> IndexMap<TypeKey, Vec<Record>> {
        self.state.lock().models.clone()
    }

    /// Snapshot of the ids resolved per step, per type.
    pub fn ids(&self) -> IndexMap<TypeKey, Vec<Vec<RecordId>>> {
        self.state.lock().ids.clone()
    }

    /// Drop the bookkeeping and keep the records.
    pub fn flatten(self) -> Populated {
        Populated {
            models: self.state.into_inner().models,
        }
    }
}

// ============================================================================
// Flattened Result
// ============================================================================

/// Records of a finished population, bucketed by type key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Populated {
    models: IndexMap<TypeKey, Vec<Record>>,
}

impl Populated {
    pub fn get(&self, key: &str) -> Option<&[Record]> {
        self.models.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.models.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeKey, &[Record])> {
        self.models.iter().map(|(key, records)| (key, records.as_slice()))
    }

    /// Total number of records across all buckets.
    pub fn len(&self) -> usize {
        self.models.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_inner(self) -> IndexMap<TypeKey, Vec<Record>> {
        self.models
    }

    /// Lean JSON object of arrays, ready to send to a client.
    pub fn to_plain_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.models
                .iter()
                .map(|(key, records)| (key.to_string(), lean::to_plain_values(records)))
                .collect(),
        )
    }
}

impl Serialize for Populated {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.models.len()))?;
        for (key, records) in &self.models {
            map.serialize_entry(key, &lean::to_plain_values(records))?;
        }
        map.end()
    }
}
