use serde_json::Value;

use crate::database::SqlType;

/// A named, typed column of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SqlType,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: &str, ty: SqlType, nullable: bool) -> Self {
        Self { name: name.to_string(), ty, nullable }
    }

    /// Infer a column from the first value seen for it. `None` when the value
    /// carries no type (null, array, object).
    pub fn infer_column_def(name: &str, value: &Value, text_type: SqlType) -> Option<ColumnDef> {
        let ty = SqlType::of_value(value, text_type)?;
        Some(ColumnDef::new(name, ty, false))
    }

    pub fn merge_column_def(&self, value: &Value, text_type: SqlType) -> ColumnDef {
        match SqlType::of_value(value, text_type) {
            Some(ty) => ColumnDef {
                name: self.name.clone(),
                ty: SqlType::promote(self.ty, ty),
                nullable: self.nullable,
            },
            None => ColumnDef { nullable: true, ..self.clone() },
        }
    }
}
