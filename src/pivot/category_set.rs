use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::{error::Result, executor::Helpers, sql::Ident};

/// Distinct category values, in discovery order, that become pivot columns.
///
/// The same set names the output columns and fills the `IN` list, so one
/// instance is built per run and passed to every step. Values are unique
/// case-insensitively; NULL is not a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategorySet {
    values: Vec<String>,
}

impl CategorySet {
    pub fn from_values(values: &[Value]) -> Self {
        Self::from_labels(values.iter().filter_map(Helpers::label_of))
    }

    pub fn from_labels(labels: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        let values = labels.into_iter()
            .filter(|label| seen.insert(Ident::fold(label)))
            .collect();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn identifiers(&self) -> Result<Vec<Ident>> {
        self.values.iter().map(|v| Ident::new(v)).collect()
    }

    /// `[East], [West]`: every value quoted on its own.
    pub fn identifier_list(&self) -> Result<String> {
        Ok(Ident::join(&self.identifiers()?))
    }
}
