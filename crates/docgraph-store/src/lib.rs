//! Docgraph Record Store
//!
//! The collaborator side of population: how records look, how their types are
//! introspected, and how they are looked up.
//!
//! ```text
//! ┌──────────────┐   schema_of()   ┌──────────────┐
//! │   Record     │────────────────►│   Catalog    │
//! │ (model, id,  │                 │ ModelSchema  │
//! │  fields)     │                 │  FieldType   │
//! └──────┬───────┘                 └──────────────┘
//!        │ find_by_id / find_by_ids
//!        ▼
//! ┌──────────────┐   lean   ┌──────────────────┐
//! │ RecordStore  │─────────►│ serde_json::Value │
//! │ (MemoryStore)│          │  (plain values)   │
//! └──────────────┘          └──────────────────┘
//! ```
//!
//! ## Key Pieces
//!
//! - **Values**: driver-level [`Value`]s keep ids and timestamps wrapped
//! - **Catalog**: declared [`ModelSchema`]s, including embedded documents
//! - **Lookups**: the async [`RecordStore`] trait and the in-memory [`MemoryStore`]
//! - **Fixtures**: JSON files that declare a catalog and seed a store

pub mod fixture;
pub mod lean;
pub mod memory;
pub mod schema;
pub mod value;


use async_trait::async_trait;

pub use fixture::Fixture;
pub use memory::{LookupStats, MemoryStore};
pub use schema::{Catalog, EmbeddedSchema, FieldType, ModelSchema};
pub use value::{Document, Record, RecordId, Value, ValueError};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no collection for model `{0}`")]
    UnknownCollection(String),
    #[error("no schema for model `{0}`")]
    UnknownModel(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

// ============================================================================
// Lookup Interface
// ============================================================================

/// Lookups the population engine issues against a document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one record. A missing record is `Ok(None)`, not an error.
    async fn find_by_id(&self, model: &str, id: &RecordId) -> Result<Option<Record>, StoreError>;

    /// Fetch every record whose id is in `ids`.
    ///
    /// Result order is the store's, not the order of `ids`; ids with no record
    /// are simply absent.
    async fn find_by_ids(&self, model: &str, ids: &[RecordId]) -> Result<Vec<Record>, StoreError>;

    /// Whether the store can serve lookups for `model` at all.
    fn has_model(&self, model: &str) -> bool;
}
