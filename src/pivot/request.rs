use serde::{Deserialize, Serialize};

/// What to pivot: the long-format source and the roles of its columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PivotRequest {
    pub source_relation: String,
    /// Column averaged into every pivoted cell.
    pub value_column: String,
    /// Column whose distinct values become the pivoted columns.
    pub category_column: String,
    /// Column whose distinct values become the rows.
    pub axis_column: String,
    /// Also snapshot the view into a typed table.
    #[serde(default)]
    pub materialize: bool,
}

impl PivotRequest {
    pub fn new(source_relation: &str, value_column: &str, category_column: &str, axis_column: &str) -> Self {
        Self {
            source_relation: source_relation.to_string(),
            value_column: value_column.to_string(),
            category_column: category_column.to_string(),
            axis_column: axis_column.to_string(),
            materialize: false,
        }
    }

    pub fn materialized(mut self, materialize: bool) -> Self {
        self.materialize = materialize;
        self
    }
}
