//! Docgraph Population Engine
//!
//! Given root records and the reference fields declared on their models,
//! resolves every record reachable through those references and returns them
//! deduplicated, bucketed by type key:
//!
//! ```text
//! populate_models([u1, u2])
//!        │
//!        ▼
//! ┌──────────────┐  populators_for  ┌──────────────┐
//! │  Population  │─────────────────►│ ModelRegistry│
//! │  (buckets)   │                  └──────────────┘
//! └──────┬───────┘
//!        │ dispatch (one task per populator, joined)
//!        ▼
//! ┌──────────────┐  find_by_id(s)   ┌──────────────┐
//! │  Populator   │─────────────────►│ RecordStore  │
//! │ Element/Array│                  └──────────────┘
//! │ Embedded/... │
//! └──────┬───────┘
//!        │ register fresh records, recurse
//!        ▼
//!   { users: [u1, u2], authors: [a1] }
//! ```
//!
//! ## Guarantees
//!
//! - **Dedup**: a record identity lands in its bucket once, however many paths
//!   reach it; the first path to reach it decides its position
//! - **Fan-out/fan-in**: populators of one level run concurrently and are joined
//!   before the level completes
//! - **Fail fast**: the first error drops every outstanding sibling lookup and
//!   fails the whole call; no partial result is returned

pub mod config;
mod dispatch;
pub mod engine;
pub mod error;
pub mod key;
pub mod population;
pub mod populator;
pub mod registry;


pub use config::{DanglingPolicy, PopulateConfig};
pub use engine::{populate_model, populate_models, PopulateEngine};
pub use error::{PopulateError, Result};
pub use key::TypeKey;
pub use population::{Populated, Population};
pub use populator::{Cardinality, CollectedIds, Embedded, Populator, Relationship, Target};
pub use registry::ModelRegistry;
