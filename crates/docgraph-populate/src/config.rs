use serde::{Deserialize, Serialize};

/// What to do with a non-null id whose record the store does not have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
    /// Leave the record out of the result.
    #[default]
    Ignore,
    /// Fail the whole population.
    Error,
}

/// Options for one population run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateConfig {
    pub dangling: DanglingPolicy,
}

impl PopulateConfig {
    pub fn strict() -> Self {
        Self {
            dangling: DanglingPolicy::Error,
        }
    }
}
