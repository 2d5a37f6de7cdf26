use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::{
    catalog::RelationKind,
    database::{ColumnDef, SchemaDict, SqlType},
    executor::helpers::Helpers,
    sql::{Ident, PivotView},
};

/// A named object held by the in-memory catalog.
#[derive(Debug, Clone)]
pub enum Relation {
    Table(MemoryTable),
    /// A stored pivot definition, evaluated against its source on every read.
    View(PivotView),
}

impl Relation {
    pub fn name(&self) -> &str {
        match self {
            Relation::Table(table) => &table.name,
            Relation::View(view) => view.name.as_str(),
        }
    }

    pub fn kind(&self) -> RelationKind {
        match self {
            Relation::Table(_) => RelationKind::Table,
            Relation::View(_) => RelationKind::View,
        }
    }
}

/// In-memory table: an ordered schema, an optional primary key and rows
/// stored in column order.
///
/// Every write goes through `add`/`add_batch`, which coerce values to the
/// declared column types and enforce nullability and key uniqueness.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub name: String,
    pub schema: SchemaDict,
    pub primary_key: Option<String>,
    rows: Vec<Map<String, Value>>,
}

impl MemoryTable {
    pub fn new(name: &str, schema: SchemaDict, primary_key: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            schema,
            primary_key,
            rows: Vec::new(),
        }
    }

    /// Build a table whose schema is inferred from the rows it will hold.
    ///
    /// Columns that only ever hold NULL get `text_type`.
    pub fn infer_from_rows(name: &str, rows: &[Map<String, Value>], text_type: SqlType) -> Self {
        let mut schema = SchemaDict::default();
        for row in rows {
            schema.merge_schema(row, text_type);
        }
        for row in rows {
            for key in row.keys() {
                if !schema.fields.contains_key(key) {
                    schema.fields.insert(key.clone(), ColumnDef::new(key, text_type, true));
                }
            }
        }
        Self::new(name, schema, None)
    }

    pub fn get_all(&self) -> Vec<Map<String, Value>> {
        self.rows.clone()
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn add(&mut self, row: Map<String, Value>) -> Result<Map<String, Value>, String> {
        let mut added = self.add_batch(vec![row])?;
        added.pop().ok_or_else(|| "row was not stored".to_string())
    }

    /// Validate and append rows. Either every row is stored or none is.
    pub fn add_batch(&mut self, rows: Vec<Map<String, Value>>) -> Result<Vec<Map<String, Value>>, String> {
        let mut keys: HashSet<String> = match &self.primary_key {
            Some(pk) => self.rows.iter()
                .filter_map(|r| r.get(pk))
                .map(Helpers::group_key)
                .collect(),
            None => HashSet::new(),
        };

        let mut staged = Vec::with_capacity(rows.len());
        for row in rows {
            let stored = self.conform_row(row)?;
            if let Some(pk) = &self.primary_key {
                let key = stored.get(pk).map(Helpers::group_key).unwrap_or_default();
                if !keys.insert(key) {
                    return Err(format!(
                        "Violation of PRIMARY KEY constraint on {}. Cannot insert duplicate key {}",
                        self.name,
                        stored.get(pk).cloned().unwrap_or(Value::Null)
                    ));
                }
            }
            staged.push(stored);
        }

        self.rows.extend(staged.iter().cloned());
        Ok(staged)
    }

    /// Reorder a row to the schema, coerce every value to its column type and
    /// check nullability. Unknown columns are rejected.
    fn conform_row(&self, mut row: Map<String, Value>) -> Result<Map<String, Value>, String> {
        let mut stored = Map::new();
        for column in self.schema.columns() {
            let key = row.keys()
                .find(|k| Ident::fold(k) == Ident::fold(&column.name))
                .cloned();
            let value = key.and_then(|k| row.remove(&k)).unwrap_or(Value::Null);

            if value.is_null() && !column.nullable {
                return Err(format!("Cannot insert the value NULL into column {}, table {}", column.name, self.name));
            }
            let coerced = column.ty.coerce(&value).ok_or_else(|| {
                format!("Value {value} does not fit column {} of type {} in table {}", column.name, column.ty, self.name)
            })?;
            stored.insert(column.name.clone(), coerced);
        }

        if let Some(unknown) = row.keys().next() {
            return Err(format!("Invalid column name {unknown} for table {}", self.name));
        }
        Ok(stored)
    }
}
