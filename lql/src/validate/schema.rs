//! Schema description used to derive the default field allow set.

use std::collections::{BTreeMap, BTreeSet};

/// Tables and their typed fields: `table -> field -> type`.
///
/// Only the names matter to validation; the type strings are carried for
/// the schema provider's benefit.
///
/// # Example
///
/// ```
/// use lql::SchemaFields;
///
/// let schema = SchemaFields::new().table("tasks", &[("status", "text"), ("priority", "int")]);
/// let fields = schema.field_names();
/// assert!(fields.contains("status"));
/// assert!(fields.contains("tasks.status"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFields {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl SchemaFields {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with `(field, type)` pairs, merging with existing fields.
    #[must_use]
    pub fn table(mut self, table: &str, fields: &[(&str, &str)]) -> Self {
        for (field, ty) in fields {
            self.insert(table, field, ty);
        }
        self
    }

    /// Add one field.
    pub fn insert(&mut self, table: &str, field: &str, ty: &str) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), ty.to_string());
    }

    /// Whether the schema declares no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Declared type of `table.field`.
    #[must_use]
    pub fn field_type(&self, table: &str, field: &str) -> Option<&str> {
        self.tables.get(table)?.get(field).map(String::as_str)
    }

    /// Every referenceable name: `table.field` and the bare `field`.
    #[must_use]
    pub fn field_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for (table, fields) in &self.tables {
            for field in fields.keys() {
                names.insert(format!("{table}.{field}"));
                names.insert(field.clone());
            }
        }
        names
    }
}

impl FromIterator<(String, BTreeMap<String, String>)> for SchemaFields {
    fn from_iter<I: IntoIterator<Item = (String, BTreeMap<String, String>)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        let schema = SchemaFields::new()
            .table("users", &[("id", "int"), ("name", "text")])
            .table("orders", &[("id", "int")]);

        let names: Vec<String> = schema.field_names().into_iter().collect();
        assert_eq!(
            names,
            vec!["id", "name", "orders.id", "users.id", "users.name"]
        );
        assert_eq!(schema.field_type("users", "name"), Some("text"));
        assert_eq!(schema.field_type("users", "email"), None);
    }

    #[test]
    fn test_from_iter() {
        let schema: SchemaFields = [(
            "t".to_string(),
            [("f".to_string(), "text".to_string())].into_iter().collect(),
        )]
        .into_iter()
        .collect();
        assert!(!schema.is_empty());
        assert!(schema.field_names().contains("t.f"));
    }
}
