//! Entry points: populate one record or many.

use crate::config::PopulateConfig;
use crate::error::Result;
use crate::key::TypeKey;
use crate::population::{Populated, Population};
use crate::registry::ModelRegistry;
use docgraph_store::{Catalog, Record, RecordStore};
use futures::future::try_join_all;
use indexmap::IndexMap;
use std::sync::Arc;

/// Populates records against one catalog and one store.
///
/// Each call builds its own registry and population; nothing is kept between
/// calls.
#[derive(Clone)]
pub struct PopulateEngine {
    catalog: Arc<Catalog>,
    store: Arc<dyn RecordStore>,
    config: PopulateConfig,
}

impl PopulateEngine {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            catalog,
            store,
            config: PopulateConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PopulateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PopulateConfig {
        &self.config
    }

    /// Populate a single root record.
    pub async fn populate_model(&self, record: Record) -> Result<Populated> {
        self.populate_models(vec![record]).await
    }

    /// Populate root records, which may be of different models.
    ///
    /// All roots are registered before any reference is resolved, so a root
    /// that another root references is never fetched again.
    pub async fn populate_models(&self, records: Vec<Record>) -> Result<Populated> {
        let mut registry = ModelRegistry::new();
        let mut roots: IndexMap<TypeKey, Vec<Record>> = IndexMap::new();

        for record in records {
            let schema = self.catalog.schema_of(&record)?;
            let key = registry.add_model(&self.catalog, schema)?;
            roots.entry(key).or_default().push(record);
        }

        let population = Population::new(Arc::new(registry), Arc::clone(&self.store))
            .with_config(self.config.clone());

        let mut seeded = Vec::with_capacity(roots.len());
        for (key, records) in roots {
            let fresh = population.register_models(&key, records, false);
            seeded.push((key, fresh));
        }

        tracing::debug!(roots = seeded.len(), "populating root records");
        try_join_all(
            seeded
                .iter()
                .map(|(key, fresh)| population.populate_array(key, fresh)),
        )
        .await?;

        Ok(population.flatten())
    }
}

/// Populate a single record with the default configuration.
pub async fn populate_model(
    catalog: Arc<Catalog>,
    store: Arc<dyn RecordStore>,
    record: Record,
) -> Result<Populated> {
    PopulateEngine::new(catalog, store).populate_model(record).await
}

/// Populate records with the default configuration.
pub async fn populate_models(
    catalog: Arc<Catalog>,
    store: Arc<dyn RecordStore>,
    records: Vec<Record>,
) -> Result<Populated> {
    PopulateEngine::new(catalog, store).populate_models(records).await
}
