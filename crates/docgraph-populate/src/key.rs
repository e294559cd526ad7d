//! Type keys: the bucket and registry key derived from a model name.

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Pluralized snake_case form of a model name (`BlogPost` -> `blog_posts`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(String);

impl TypeKey {
    /// Wrap an already-derived key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key for a model name.
    pub fn for_model(model: &str) -> Self {
        let snake = model.to_snake_case();
        let (head, last) = match snake.rfind('_') {
            Some(at) => snake.split_at(at + 1),
            None => ("", snake.as_str()),
        };
        Self(format!("{head}{}", pluralize(last)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
];

fn pluralize(word: &str) -> String {
    if let Some((_, plural)) = IRREGULAR.iter().find(|(single, _)| *single == word) {
        return plural.to_string();
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|end| word.ends_with(end)) {
        return format!("{word}es");
    }

    if let Some(stem) = word.strip_suffix('y') {
        if !stem.is_empty() && !stem.ends_with(&['a', 'e', 'i', 'o', 'u'][..]) {
            return format!("{stem}ies");
        }
    }

    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names_to_keys() {
        let cases = [
            ("User", "users"),
            ("Author", "authors"),
            ("BlogPost", "blog_posts"),
            ("Category", "categories"),
            ("Address", "addresses"),
            ("Box", "boxes"),
            ("Key", "keys"),
            ("SalesPerson", "sales_people"),
            ("Match", "matches"),
        ];
        for (model, key) in cases {
            assert_eq!(TypeKey::for_model(model).as_str(), key, "{model}");
        }
    }

    #[test]
    fn test_key_borrows_as_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(TypeKey::for_model("User"), 1);
        assert_eq!(map.get("users"), Some(&1));
    }
}
