use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{database::{ColumnDef, SqlType}, sql::Ident};

/// Ordered column metadata for a relation.
///
/// Column order is significant: it is the order columns are declared in and
/// the order rows are presented in. Lookups by name are case-insensitive,
/// matching the catalog's identifier rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDict {
    /// Map of column name -> column metadata
    pub fields: IndexMap<String, ColumnDef>,
}

impl SchemaDict {
    pub fn from_columns(columns: Vec<ColumnDef>) -> Self {
        let mut fields = IndexMap::new();
        for column in columns {
            fields.insert(column.name.clone(), column);
        }
        SchemaDict { fields }
    }

    /// Return the `ColumnDef` for a column name if present.
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.fields.get(name).or_else(|| {
            let folded = Ident::fold(name);
            self.fields.values().find(|c| Ident::fold(&c.name) == folded)
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.fields.values()
    }

    /// Merge a JSON row into the schema, promoting types where necessary and
    /// marking columns as nullable when they are absent or null in the row.
    pub fn merge_schema(&mut self, obj: &Map<String, Value>, text_type: SqlType) {
        let first_row = self.fields.is_empty();
        for (key, column) in self.fields.iter_mut() {
            if !obj.contains_key(key) {
                column.nullable = true;
            }
        }

        for (key, value) in obj {
            match self.fields.get_mut(key) {
                Some(old) => {
                    *old = old.merge_column_def(value, text_type);
                }
                None => {
                    if let Some(column) = ColumnDef::infer_column_def(key, value, text_type) {
                        // first seen after the first row: earlier rows lacked it
                        self.fields.insert(key.clone(), ColumnDef { nullable: !first_row, ..column });
                    }
                }
            }
        }
    }
}
