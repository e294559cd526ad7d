//! Declared model schemas and the catalog used for type introspection.

use crate::value::{Document, Record, RecordId, Value};
use crate::StoreError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declared shape of a single field.
///
/// Serialized externally tagged, e.g. `"scalar"`, `{"ref": "Author"}`,
/// `{"embedded_array": {"author": {"ref": "User"}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Plain value with no outgoing reference.
    Scalar,
    /// Single id of a record of the named model.
    Ref(String),
    /// Array of ids of records of the named model.
    RefArray(String),
    /// Inline sub-document with its own fields.
    Embedded(EmbeddedSchema),
    /// Inline array of sub-documents sharing one schema.
    EmbeddedArray(EmbeddedSchema),
}

impl FieldType {
    pub fn reference(model: impl Into<String>) -> Self {
        FieldType::Ref(model.into())
    }

    pub fn references(model: impl Into<String>) -> Self {
        FieldType::RefArray(model.into())
    }

    /// Whether this field, or anything nested under it, points at another record.
    pub fn has_references(&self) -> bool {
        match self {
            FieldType::Scalar => false,
            FieldType::Ref(_) | FieldType::RefArray(_) => true,
            FieldType::Embedded(schema) | FieldType::EmbeddedArray(schema) => {
                schema.fields.values().any(FieldType::has_references)
            }
        }
    }

    /// Read plain strings held where this field declares references as ids.
    pub fn cast(&self, value: &mut Value) {
        match (self, value) {
            (FieldType::Scalar, _) => {}
            (FieldType::Ref(_), value) => cast_id(value),
            (FieldType::RefArray(_), Value::Array(items)) => items.iter_mut().for_each(cast_id),
            (FieldType::RefArray(_), value) => cast_id(value),
            (FieldType::Embedded(schema), Value::Document(doc)) => cast_fields(&schema.fields, doc),
            (FieldType::EmbeddedArray(schema), Value::Array(items)) => {
                for item in items {
                    if let Value::Document(doc) = item {
                        cast_fields(&schema.fields, doc);
                    }
                }
            }
            _ => {}
        }
    }
}

fn cast_id(value: &mut Value) {
    if let Value::String(raw) = value {
        let id = RecordId::new(std::mem::take(raw));
        *value = Value::Id(id);
    }
}

fn cast_fields(fields: &IndexMap<String, FieldType>, doc: &mut Document) {
    for (name, ty) in fields {
        if let Some(value) = doc.get_mut(name) {
            ty.cast(value);
        }
    }
}

/// Field map of an embedded sub-document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddedSchema {
    pub fields: IndexMap<String, FieldType>,
}

impl EmbeddedSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }
}

/// Schema of one stored model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    #[serde(default)]
    pub fields: IndexMap<String, FieldType>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    /// Cast the reference fields of `fields` in place; see [`FieldType::cast`].
    pub fn cast_references(&self, fields: &mut Document) {
        cast_fields(&self.fields, fields);
    }

    /// Names of every model this schema references, directly or through
    /// embedded documents, in declaration order.
    pub fn referenced_models(&self) -> Vec<&str> {
        fn walk<'a>(fields: &'a IndexMap<String, FieldType>, out: &mut Vec<&'a str>) {
            for ty in fields.values() {
                match ty {
                    FieldType::Scalar => {}
                    FieldType::Ref(model) | FieldType::RefArray(model) => {
                        if !out.contains(&model.as_str()) {
                            out.push(model);
                        }
                    }
                    FieldType::Embedded(schema) | FieldType::EmbeddedArray(schema) => {
                        walk(&schema.fields, out)
                    }
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.fields, &mut out);
        out
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// All model schemas known to an application, keyed by model name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ModelSchema>", into = "Vec<ModelSchema>")]
pub struct Catalog {
    models: IndexMap<String, ModelSchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a model schema.
    pub fn define(&mut self, schema: ModelSchema) -> &mut Self {
        self.models.insert(schema.name.clone(), schema);
        self
    }

    pub fn with(mut self, schema: ModelSchema) -> Self {
        self.define(schema);
        self
    }

    pub fn model(&self, name: &str) -> Option<&ModelSchema> {
        self.models.get(name)
    }

    /// Runtime schema of a record.
    pub fn schema_of(&self, record: &Record) -> Result<&ModelSchema, StoreError> {
        self.model(&record.model)
            .ok_or_else(|| StoreError::UnknownModel(record.model.clone()))
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl From<Vec<ModelSchema>> for Catalog {
    fn from(schemas: Vec<ModelSchema>) -> Self {
        let mut catalog = Catalog::new();
        for schema in schemas {
            catalog.define(schema);
        }
        catalog
    }
}

impl From<Catalog> for Vec<ModelSchema> {
    fn from(catalog: Catalog) -> Self {
        catalog.models.into_values().collect()
    }
}
