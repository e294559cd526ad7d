use crate::key::TypeKey;
use docgraph_store::{RecordId, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PopulateError {
    /// A relationship targets a type the registry never resolved.
    #[error("Populator for {key} does not exist")]
    MissingPopulator { key: TypeKey },
    #[error("type key `{key}` is claimed by both `{first}` and `{second}`")]
    KeyCollision {
        key: TypeKey,
        first: String,
        second: String,
    },
    /// Only raised under [`crate::DanglingPolicy::Error`].
    #[error("dangling reference: no {key} record with id {id}")]
    DanglingReference { key: TypeKey, id: RecordId },
    /// Only raised under [`crate::DanglingPolicy::Error`].
    #[error("field `{field}` references {key} with a non-id value {value}")]
    InvalidReference {
        key: TypeKey,
        field: String,
        value: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PopulateError {
    /// Whether the error comes from registry or catalog setup rather than data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PopulateError::MissingPopulator { .. }
                | PopulateError::KeyCollision { .. }
                | PopulateError::Store(StoreError::UnknownModel(_))
                | PopulateError::Store(StoreError::UnknownCollection(_))
        )
    }
}

pub type Result<T, E = PopulateError> = std::result::Result<T, E>;
