use thiserror::Error;

/// Errors raised while generating a pivot view or its materialized table.
///
/// Nothing in the pipeline retries: every variant aborts the remaining steps
/// of the current run and is handed back to the caller as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PivotError {
    /// The relation, a column, or a column's declared type could not be resolved.
    #[error("catalog lookup failed for {relation}{}: {reason}", column.as_ref().map(|c| format!(".{c}")).unwrap_or_default())]
    CatalogLookup {
        relation: String,
        column: Option<String>,
        reason: String,
    },

    /// Discovery found no category values, so the pivot would have no data columns.
    #[error("column {column} of {relation} has no category values to pivot on")]
    EmptyCategorySet { relation: String, column: String },

    /// The derived name is held by an object that cannot be replaced.
    #[error("cannot replace {name}: an object of kind {existing} already uses that name")]
    NameCollision { name: String, existing: String },

    /// The execution environment rejected a composed statement.
    #[error("statement rejected: {reason}\n  statement: {statement}")]
    StatementExecution { statement: String, reason: String },

    /// A name that cannot be turned into a safe bracket-quoted identifier.
    #[error("invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl PivotError {
    pub fn relation_not_found(relation: &str) -> Self {
        PivotError::CatalogLookup {
            relation: relation.to_string(),
            column: None,
            reason: "relation does not exist".to_string(),
        }
    }

    pub fn column_not_found(relation: &str, column: &str) -> Self {
        PivotError::CatalogLookup {
            relation: relation.to_string(),
            column: Some(column.to_string()),
            reason: "column does not exist".to_string(),
        }
    }

    pub fn rejected(statement: impl ToString, reason: impl Into<String>) -> Self {
        PivotError::StatementExecution {
            statement: statement.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PivotError>;
