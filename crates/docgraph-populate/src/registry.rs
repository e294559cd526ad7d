//! Type registry: which populators apply to records of which type.

use crate::error::{PopulateError, Result};
use crate::key::TypeKey;
use crate::populator::{populators_for_fields, Populator, Relationship};
use docgraph_store::{Catalog, ModelSchema};
use indexmap::IndexMap;

/// Populators per type key, built by walking model schemas from one or more
/// root models.
///
/// Every model is visited once; a key is registered before its fields are
/// walked, so reference cycles terminate.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: IndexMap<TypeKey, IndexMap<String, Populator>>,
    names: IndexMap<TypeKey, String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` and, transitively, every model it references.
    ///
    /// A referenced model missing from `catalog` is left unregistered; it
    /// fails the traversal only once an id for it turns up.
    pub fn add_model(&mut self, catalog: &Catalog, schema: &ModelSchema) -> Result<TypeKey> {
        let key = TypeKey::for_model(&schema.name);

        if let Some(existing) = self.names.get(&key) {
            if existing != &schema.name {
                return Err(PopulateError::KeyCollision {
                    key,
                    first: existing.clone(),
                    second: schema.name.clone(),
                });
            }
            return Ok(key);
        }

        self.names.insert(key.clone(), schema.name.clone());
        self.models.insert(key.clone(), IndexMap::new());

        for model in schema.referenced_models() {
            match catalog.model(model) {
                Some(target) => {
                    self.add_model(catalog, target)?;
                }
                None => tracing::warn!(
                    model = %schema.name,
                    target = model,
                    "referenced model has no schema; leaving it unregistered"
                ),
            }
        }

        let populators = populators_for_fields(&schema.fields);
        tracing::trace!(key = %key, populators = populators.len(), "registered model");
        self.models.insert(key.clone(), populators);

        Ok(key)
    }

    /// Register a model by name.
    pub fn add_model_named(&mut self, catalog: &Catalog, name: &str) -> Result<TypeKey> {
        let schema = catalog
            .model(name)
            .ok_or_else(|| docgraph_store::StoreError::UnknownModel(name.to_string()))?;
        self.add_model(catalog, schema)
    }

    /// Populators for records of `key`, keyed by field name.
    ///
    /// `None` means the type was never registered; an empty map means it has
    /// nothing further to resolve.
    pub fn populators_for(&self, key: &str) -> Option<&IndexMap<String, Populator>> {
        self.models.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    pub fn model_name(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.models.keys()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Flat relationship descriptors declared for `key`.
    pub fn relationships(&self, key: &str) -> Vec<Relationship> {
        let mut out = Vec::new();
        if let Some(populators) = self.models.get(key) {
            for (field, populator) in populators {
                populator.relationships(field, &[], &mut out);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_store::{EmbeddedSchema, FieldType};

    fn catalog() -> Catalog {
        Catalog::new()
            .with(ModelSchema::new("Author").field("name", FieldType::Scalar))
            .with(
                ModelSchema::new("User")
                    .field("favorite_author", FieldType::reference("Author"))
                    .field("first_name", FieldType::Scalar),
            )
    }

    #[test]
    fn test_registers_root_and_targets() {
        let catalog = catalog();
        let mut registry = ModelRegistry::new();
        let key = registry.add_model_named(&catalog, "User").unwrap();

        assert_eq!(key.as_str(), "users");
        let keys: Vec<&str> = registry.keys().map(TypeKey::as_str).collect();
        assert_eq!(keys, vec!["users", "authors"]);
        assert_eq!(registry.populators_for("users").unwrap().len(), 1);
        assert!(registry.populators_for("authors").unwrap().is_empty());
        assert_eq!(registry.model_name("authors"), Some("Author"));
    }

    #[test]
    fn test_cycles_terminate() {
        let catalog = Catalog::new()
            .with(ModelSchema::new("A").field("b", FieldType::reference("B")))
            .with(ModelSchema::new("B").field("a", FieldType::references("A")));

        let mut registry = ModelRegistry::new();
        registry.add_model_named(&catalog, "A").unwrap();
        registry.add_model_named(&catalog, "B").unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.populators_for("as").unwrap().len(), 1);
        assert_eq!(registry.populators_for("bs").unwrap().len(), 1);
    }

    #[test]
    fn test_embedded_targets_are_registered() {
        let catalog = Catalog::new()
            .with(ModelSchema::new("Tag"))
            .with(ModelSchema::new("Post").field(
                "comments",
                FieldType::EmbeddedArray(EmbeddedSchema::new().field("tags", FieldType::references("Tag"))),
            ));

        let mut registry = ModelRegistry::new();
        registry.add_model_named(&catalog, "Post").unwrap();

        assert!(registry.contains("tags"));
        let rels = registry.relationships("posts");
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].embedding_path, Some(vec!["comments".to_string()]));
    }

    #[test]
    fn test_missing_target_is_left_unregistered() {
        let catalog = Catalog::new()
            .with(ModelSchema::new("Book").field("publisher", FieldType::reference("Publisher")));

        let mut registry = ModelRegistry::new();
        registry.add_model_named(&catalog, "Book").unwrap();

        assert!(registry.contains("books"));
        assert!(!registry.contains("publishers"));
        assert_eq!(registry.populators_for("books").unwrap().len(), 1);
    }

    #[test]
    fn test_key_collision() {
        // Both derive `blog_posts`.
        let catalog = Catalog::new()
            .with(ModelSchema::new("BlogPost"))
            .with(ModelSchema::new("blog_post"));

        let mut registry = ModelRegistry::new();
        registry.add_model_named(&catalog, "BlogPost").unwrap();
        let err = registry.add_model_named(&catalog, "blog_post").unwrap_err();

        assert!(matches!(err, PopulateError::KeyCollision { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_root_model() {
        let mut registry = ModelRegistry::new();
        let err = registry.add_model_named(&catalog(), "Ghost").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Ghost"));
    }
}
