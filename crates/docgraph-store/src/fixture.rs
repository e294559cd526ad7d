//! JSON fixtures: a catalog plus seed records.
//!
//! ```json
//! {
//!   "models": [
//!     { "name": "Author", "fields": { "name": "scalar" } },
//!     { "name": "User", "fields": { "favorite_author": { "ref": "Author" } } }
//!   ],
//!   "records": {
//!     "Author": [ { "_id": "a1", "name": "John Doe" } ],
//!     "User": [ { "_id": "u1", "favorite_author": { "$id": "a1" } } ]
//!   }
//! }
//! ```

use crate::memory::MemoryStore;
use crate::schema::{Catalog, ModelSchema};
use crate::value::Record;
use anyhow::{bail, Context};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub models: Vec<ModelSchema>,
    #[serde(default)]
    pub records: IndexMap<String, Vec<serde_json::Value>>,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("failed to parse fixture {}", path.display()))
    }

    pub fn from_json_str(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::from(self.models.clone())
    }

    /// Decode every seed record, in file order, reading plain strings in
    /// reference fields as ids.
    pub fn records(&self) -> anyhow::Result<Vec<Record>> {
        let catalog = self.catalog();
        let mut out = Vec::new();

        for (model, docs) in &self.records {
            let Some(schema) = catalog.model(model) else {
                bail!("fixture has records for undeclared model `{model}`");
            };
            for (index, doc) in docs.iter().enumerate() {
                let mut record = Record::from_json(model.as_str(), doc.clone())
                    .with_context(|| format!("{model}[{index}]"))?;
                schema.cast_references(&mut record.fields);
                out.push(record);
            }
        }

        Ok(out)
    }

    /// Clear `store`, create a collection per declared model, and insert the
    /// seed records. Returns the number of records inserted.
    pub fn seed(&self, store: &MemoryStore) -> anyhow::Result<usize> {
        let records = self.records()?;
        let count = records.len();

        store.clear();
        for schema in &self.models {
            store.create_collection(&schema.name);
        }
        store.insert_many(records);

        tracing::debug!(models = self.models.len(), records = count, "seeded store from fixture");
        Ok(count)
    }
}
