use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PivotError, Result};

/// A JSON document describing relations to preload into the in-memory catalog.
///
/// ```json
/// { "relations": [
///     { "name": "Sales",
///       "columns": [{ "name": "Quarter", "type": "nvarchar(8)" }],
///       "primary_key": null,
///       "rows": [{ "Quarter": "Q1" }] } ] }
/// ```
///
/// `columns` may be omitted, in which case types are inferred from `rows`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SeedFile {
    pub relations: Vec<SeedRelation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeedRelation {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<SeedColumn>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeedColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
}

fn nullable_by_default() -> bool {
    true
}

impl SeedFile {
    pub fn from_json(json_value: Value) -> Result<Self> {
        serde_json::from_value(json_value)
            .map_err(|e| PivotError::Config(format!("invalid seed document: {e}")))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| PivotError::Config(format!("invalid seed document: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PivotError::Config(format!("could not read seed file {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }
}
