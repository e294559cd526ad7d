//! Driver-level values and records.
//!
//! Records come back from a store in this representation, not as plain JSON:
//! ids and timestamps keep their wrapper types until [`crate::lean`] strips
//! them for comparison or serialization.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

/// Opaque identity of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh, globally unique id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Values
// ============================================================================

/// Ordered field map of a document or embedded sub-document.
pub type Document = IndexMap<String, Value>;

/// A field value as the store hands it out.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Reference to another record.
    Id(RecordId),
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
    /// Embedded sub-document, stored inline.
    Document(Document),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_id(&self) -> Option<&RecordId> {
        match self {
            Value::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Read a value from extended JSON.
    ///
    /// `{"$id": "..."}` becomes [`Value::Id`] and `{"$date": "<rfc3339>"}`
    /// becomes [`Value::DateTime`]; every other object is an embedded document.
    pub fn from_json(json: serde_json::Value) -> Result<Self, ValueError> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().ok_or(ValueError::Number)?),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(id) = map.get("$id") {
                        let id = id.as_str().ok_or(ValueError::Id)?;
                        return Ok(Value::Id(RecordId::from(id)));
                    }
                    if let Some(date) = map.get("$date") {
                        let date = date.as_str().ok_or_else(|| ValueError::Date(date.to_string()))?;
                        let parsed = DateTime::parse_from_rfc3339(date)
                            .map_err(|_| ValueError::Date(date.to_string()))?;
                        return Ok(Value::DateTime(parsed.with_timezone(&Utc)));
                    }
                }

                let mut doc = Document::with_capacity(map.len());
                for (name, value) in map {
                    doc.insert(name, Value::from_json(value)?);
                }
                Value::Document(doc)
            }
        })
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::Id(id)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("number is not representable")]
    Number,
    #[error("`$id` must be a string")]
    Id,
    #[error("invalid `$date`: {0}")]
    Date(String),
    #[error("record must be a JSON object")]
    NotAnObject,
}

// ============================================================================
// Records
// ============================================================================

/// A stored record: its model name, identity, and fields (without `_id`).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub model: String,
    pub id: RecordId,
    pub fields: Document,
}

impl Record {
    pub fn new(model: impl Into<String>, id: impl Into<RecordId>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
            fields: Document::new(),
        }
    }

    /// Builder-style field setter, mostly for tests and fixtures.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Read a record of `model` from an extended-JSON object.
    ///
    /// `_id` may be `{"$id": ..}` or a plain string; a fresh id is generated
    /// when it is missing.
    pub fn from_json(model: impl Into<String>, json: serde_json::Value) -> Result<Self, ValueError> {
        let serde_json::Value::Object(map) = json else {
            return Err(ValueError::NotAnObject);
        };

        let mut raw_id = None;
        let mut fields = Document::with_capacity(map.len());
        for (name, value) in map {
            if name == "_id" {
                raw_id = Some(value);
            } else {
                fields.insert(name, Value::from_json(value)?);
            }
        }

        let id = match raw_id {
            None | Some(serde_json::Value::Null) => RecordId::generate(),
            Some(serde_json::Value::String(s)) => RecordId::from(s),
            Some(other) => match Value::from_json(other)? {
                Value::Id(id) => id,
                _ => return Err(ValueError::Id),
            },
        };

        Ok(Self {
            model: model.into(),
            id,
            fields,
        })
    }
}
