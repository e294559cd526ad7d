//! Populator strategies, one per relationship shape.
//!
//! | strategy        | field holds                         | fetch            |
//! |-----------------|-------------------------------------|------------------|
//! | `Element`       | one id                              | find by id       |
//! | `Array`         | array of ids                        | find by id-list  |
//! | `Embedded`      | sub-document with reference fields  | via children     |
//! | `EmbeddedArray` | array of such sub-documents         | via children     |
//!
//! Every strategy works on a set of *holders*: the documents that carry the
//! field. At the top level these are the records being populated; below an
//! embedded field they are the sub-documents found there, flattened across all
//! parents so each child populator fetches once for the whole set.

use crate::key::TypeKey;
use docgraph_store::{Document, EmbeddedSchema, FieldType, Record, RecordId, RecordStore, StoreError, Value};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
}

/// Flat description of one declared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub field: String,
    pub target: TypeKey,
    pub model: String,
    pub cardinality: Cardinality,
    /// Embedded fields leading to `field`; `None` when it sits on the record.
    pub embedding_path: Option<Vec<String>>,
}

/// The stored model a reference resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub model: String,
    pub key: TypeKey,
}

impl Target {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        let key = TypeKey::for_model(&model);
        Self { model, key }
    }

    /// Issue the single lookup for `unseen`.
    pub async fn populate(
        &self,
        store: &dyn RecordStore,
        cardinality: Cardinality,
        unseen: &[RecordId],
    ) -> Result<Vec<Record>, StoreError> {
        match (cardinality, unseen) {
            (_, []) => Ok(Vec::new()),
            (Cardinality::One, [id]) => Ok(store.find_by_id(&self.model, id).await?.into_iter().collect()),
            _ => store.find_by_ids(&self.model, unseen).await,
        }
    }
}

/// Ids found in a reference field, plus the values that could not be read
/// as one.
#[derive(Debug, Default)]
pub struct CollectedIds<'a> {
    pub ids: IndexSet<RecordId>,
    pub invalid: Vec<&'a Value>,
}

impl<'a> CollectedIds<'a> {
    fn push(&mut self, value: &'a Value) {
        match value {
            Value::Id(id) => {
                self.ids.insert(id.clone());
            }
            Value::String(raw) => {
                self.ids.insert(RecordId::from(raw.as_str()));
            }
            other => self.invalid.push(other),
        }
    }
}

/// Child populators of an embedded document, keyed by nested field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embedded {
    pub populators: IndexMap<String, Populator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Populator {
    Element(Target),
    Array(Target),
    Embedded(Embedded),
    EmbeddedArray(Embedded),
}

impl Populator {
    /// Build the populator for a declared field; `None` when the field can
    /// never reference another record.
    pub fn for_field(ty: &FieldType) -> Option<Self> {
        match ty {
            FieldType::Scalar => None,
            FieldType::Ref(model) => Some(Populator::Element(Target::new(model.as_str()))),
            FieldType::RefArray(model) => Some(Populator::Array(Target::new(model.as_str()))),
            FieldType::Embedded(schema) => {
                Self::embedded(schema).map(Populator::Embedded)
            }
            FieldType::EmbeddedArray(schema) => {
                Self::embedded(schema).map(Populator::EmbeddedArray)
            }
        }
    }

    fn embedded(schema: &EmbeddedSchema) -> Option<Embedded> {
        let populators = populators_for_fields(&schema.fields);
        (!populators.is_empty()).then_some(Embedded { populators })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Populator::Element(_) => "element",
            Populator::Array(_) => "array",
            Populator::Embedded(_) => "embedded",
            Populator::EmbeddedArray(_) => "embedded_array",
        }
    }

    /// Ids held in `field` across `holders`, in first-seen order.
    ///
    /// Plain strings are read as ids. Null and absent fields contribute
    /// nothing; any other value lands in [`CollectedIds::invalid`]. Empty for
    /// the embedded strategies, which hold no ids themselves.
    pub fn collect_ids<'a>(&self, field: &str, holders: &[&'a Document]) -> CollectedIds<'a> {
        let mut collected = CollectedIds::default();
        for value in holders.iter().copied().filter_map(|doc| doc.get(field)) {
            match (self, value) {
                (_, Value::Null) => {}
                (Populator::Element(_), _) => collected.push(value),
                (Populator::Array(_), Value::Array(items)) => {
                    items
                        .iter()
                        .filter(|item| !item.is_null())
                        .for_each(|item| collected.push(item));
                }
                // A lone id where a list is declared still counts.
                (Populator::Array(_), _) => collected.push(value),
                _ => {}
            }
        }
        collected
    }

    /// Sub-documents stored in `field` across `holders`.
    ///
    /// Absent or null embedded values contribute nothing.
    pub fn embedded_holders<'a>(&self, field: &str, holders: &[&'a Document]) -> Vec<&'a Document> {
        let mut nested = Vec::new();
        for value in holders.iter().copied().filter_map(|doc| doc.get(field)) {
            match (self, value) {
                (Populator::Embedded(_), Value::Document(doc)) => nested.push(doc),
                (Populator::EmbeddedArray(_), Value::Array(items)) => {
                    nested.extend(items.iter().filter_map(Value::as_document));
                }
                _ => {}
            }
        }
        nested
    }

    /// Flatten into descriptors, depth first.
    pub fn relationships(&self, field: &str, path: &[String], out: &mut Vec<Relationship>) {
        let embedding_path = (!path.is_empty()).then(|| path.to_vec());
        match self {
            Populator::Element(target) | Populator::Array(target) => out.push(Relationship {
                field: field.to_string(),
                target: target.key.clone(),
                model: target.model.clone(),
                cardinality: if matches!(self, Populator::Element(_)) {
                    Cardinality::One
                } else {
                    Cardinality::Many
                },
                embedding_path,
            }),
            Populator::Embedded(embedded) | Populator::EmbeddedArray(embedded) => {
                let mut nested = path.to_vec();
                nested.push(field.to_string());
                for (name, child) in &embedded.populators {
                    child.relationships(name, &nested, out);
                }
            }
        }
    }
}

/// Populators for every reference-carrying field of a field map.
pub fn populators_for_fields(fields: &IndexMap<String, FieldType>) -> IndexMap<String, Populator> {
    fields
        .iter()
        .filter_map(|(name, ty)| Populator::for_field(ty).map(|p| (name.clone(), p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_store::ModelSchema;

    fn doc(pairs: Vec<(&str, Value)>) -> Document {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_element_ids_skip_null_and_duplicates() {
        let populator = Populator::Element(Target::new("Author"));
        let a = doc(vec![("author", Value::Id("a1".into()))]);
        let b = doc(vec![("author", Value::Null)]);
        let c = doc(vec![("author", Value::Id("a1".into()))]);
        let d = doc(vec![]);

        let collected = populator.collect_ids("author", &[&a, &b, &c, &d]);
        assert_eq!(collected.ids.into_iter().collect::<Vec<_>>(), vec![RecordId::from("a1")]);
        assert!(collected.invalid.is_empty());
    }

    #[test]
    fn test_array_ids_are_flattened() {
        let populator = Populator::Array(Target::new("Blog"));
        let a = doc(vec![("blogs", vec![RecordId::from("b2"), RecordId::from("b1")].into())]);
        let b = doc(vec![("blogs", vec![RecordId::from("b1"), RecordId::from("b3")].into())]);

        let ids: Vec<_> = populator.collect_ids("blogs", &[&a, &b]).ids.into_iter().collect();
        assert_eq!(ids, vec![RecordId::from("b2"), RecordId::from("b1"), RecordId::from("b3")]);
    }

    #[test]
    fn test_plain_string_ids_are_read_as_ids() {
        let element = Populator::Element(Target::new("Author"));
        let a = doc(vec![("author", Value::from("a1"))]);
        let b = doc(vec![("author", Value::Id("a2".into()))]);
        let ids: Vec<_> = element.collect_ids("author", &[&a, &b]).ids.into_iter().collect();
        assert_eq!(ids, vec![RecordId::from("a1"), RecordId::from("a2")]);

        let array = Populator::Array(Target::new("Blog"));
        let c = doc(vec![("blogs", Value::Array(vec![Value::from("b1"), Value::Null]))]);
        let d = doc(vec![("blogs", Value::from("b2"))]);
        let collected = array.collect_ids("blogs", &[&c, &d]);
        assert_eq!(
            collected.ids.into_iter().collect::<Vec<_>>(),
            vec![RecordId::from("b1"), RecordId::from("b2")]
        );
        assert!(collected.invalid.is_empty());
    }

    #[test]
    fn test_non_id_values_are_reported() {
        let element = Populator::Element(Target::new("Author"));
        let a = doc(vec![("author", Value::Int(7))]);
        let b = doc(vec![("author", Value::Bool(true))]);
        let collected = element.collect_ids("author", &[&a, &b]);
        assert!(collected.ids.is_empty());
        assert_eq!(collected.invalid, vec![&Value::Int(7), &Value::Bool(true)]);

        let array = Populator::Array(Target::new("Blog"));
        let c = doc(vec![("blogs", Value::Array(vec![Value::Id("b1".into()), Value::Int(3)]))]);
        let collected = array.collect_ids("blogs", &[&c]);
        assert_eq!(collected.ids.len(), 1);
        assert_eq!(collected.invalid, vec![&Value::Int(3)]);
    }

    #[test]
    fn test_embedded_array_holders() {
        let schema = EmbeddedSchema::new().field("by", FieldType::reference("User"));
        let populator = Populator::for_field(&FieldType::EmbeddedArray(schema)).unwrap();

        let c1 = doc(vec![("by", Value::Id("u1".into()))]);
        let c2 = doc(vec![("by", Value::Id("u2".into()))]);
        let post = doc(vec![(
            "comments",
            Value::Array(vec![Value::Document(c1), Value::Null, Value::Document(c2)]),
        )]);
        let empty = doc(vec![]);

        let nested = populator.embedded_holders("comments", &[&post, &empty]);
        assert_eq!(nested.len(), 2);
    }

    #[test]
    fn test_scalar_only_embedded_has_no_populator() {
        let schema = EmbeddedSchema::new().field("city", FieldType::Scalar);
        assert!(Populator::for_field(&FieldType::Embedded(schema)).is_none());
        assert!(Populator::for_field(&FieldType::Scalar).is_none());
    }

    #[test]
    fn test_relationships_carry_embedding_path() {
        let schema = ModelSchema::new("Post")
            .field("author", FieldType::reference("User"))
            .field(
                "meta",
                FieldType::Embedded(EmbeddedSchema::new().field(
                    "reviews",
                    FieldType::EmbeddedArray(
                        EmbeddedSchema::new().field("tags", FieldType::references("Tag")),
                    ),
                )),
            );

        let mut out = Vec::new();
        for (name, populator) in populators_for_fields(&schema.fields) {
            populator.relationships(&name, &[], &mut out);
        }

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].embedding_path, None);
        assert_eq!(out[0].cardinality, Cardinality::One);
        assert_eq!(out[1].target.as_str(), "tags");
        assert_eq!(out[1].cardinality, Cardinality::Many);
        assert_eq!(
            out[1].embedding_path,
            Some(vec!["meta".to_string(), "reviews".to_string()])
        );
    }
}
