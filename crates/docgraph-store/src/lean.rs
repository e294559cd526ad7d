//! Lean conversion: strip driver wrapper types into plain JSON values.
//!
//! Ids become their string form and timestamps RFC 3339 strings, which makes a
//! record directly comparable with the JSON a client sends or receives.

use crate::value::{Document, Record, Value};
use serde_json::{Map, Number};

/// Plain form of a single value.
pub fn to_plain(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        // NaN and infinities have no JSON form.
        Value::Float(f) => Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Id(id) => serde_json::Value::String(id.to_string()),
        Value::DateTime(at) => serde_json::Value::String(at.to_rfc3339()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_plain).collect()),
        Value::Document(doc) => serde_json::Value::Object(document_to_plain(doc)),
    }
}

/// Plain form of a record, `_id` first.
pub fn to_plain_value(record: &Record) -> serde_json::Value {
    let mut map = Map::with_capacity(record.fields.len() + 1);
    map.insert("_id".to_string(), serde_json::Value::String(record.id.to_string()));
    map.extend(document_to_plain(&record.fields));
    serde_json::Value::Object(map)
}

pub fn to_plain_values<'a>(records: impl IntoIterator<Item = &'a Record>) -> serde_json::Value {
    serde_json::Value::Array(records.into_iter().map(to_plain_value).collect())
}

fn document_to_plain(doc: &Document) -> Map<String, serde_json::Value> {
    doc.iter()
        .map(|(name, value)| (name.clone(), to_plain(value)))
        .collect()
}
