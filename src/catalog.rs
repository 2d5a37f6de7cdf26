use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{database::SqlType, error::Result, sql::Statement};

/// Kind of a named object in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    Table,
    View,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::Table => f.write_str("TABLE"),
            RelationKind::View => f.write_str("VIEW"),
        }
    }
}

/// The execution environment the generator runs against.
///
/// Every call is a synchronous request/response. Names are resolved the way
/// the environment resolves them; the generator never caches answers across
/// runs.
pub trait Catalog {
    /// Names of every table and view.
    fn list_relations(&self) -> Result<Vec<String>>;

    /// Kind of the object named `name`, or `None` when nothing uses that name.
    fn relation_kind(&self, name: &str) -> Result<Option<RelationKind>>;

    /// Declared type of `column` in `relation`.
    ///
    /// Fails with `CatalogLookup` when the relation or column does not exist.
    fn describe_column(&self, relation: &str, column: &str) -> Result<SqlType>;

    /// Distinct non-NULL values of `column` in `relation`, in a deterministic
    /// order.
    fn distinct_values(&self, relation: &str, column: &str) -> Result<Vec<Value>>;

    /// Execute one definition or manipulation statement.
    fn execute(&self, statement: &Statement) -> Result<()>;
}
