use std::fmt::Display;

use serde_json::Value;

use crate::{database::SqlType, sql::Ident};

/// `CREATE VIEW ... AS SELECT ... PIVOT (AVG(value) FOR category IN (...))`.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotView {
    pub name: Ident,
    pub source: Ident,
    pub axis: Ident,
    pub category: Ident,
    pub value: Ident,
    /// One output column per entry, in this order.
    pub categories: Vec<Ident>,
}

impl PivotView {
    /// Output column names: the axis followed by every category.
    pub fn output_columns(&self) -> Vec<&Ident> {
        std::iter::once(&self.axis).chain(self.categories.iter()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: Ident,
    pub ty: SqlType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: Ident,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Option<Ident>,
}

/// The definition and manipulation statements the generator issues.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    DropView { name: Ident },
    DropTable { name: Ident },
    CreatePivotView(PivotView),
    CreateTable(TableDefinition),
    /// `INSERT INTO table SELECT * FROM source`
    InsertFromRelation { table: Ident, source: Ident },
    InsertValues { table: Ident, columns: Vec<Ident>, values: Vec<Value> },
}

impl Statement {
    /// Name of the object the statement writes to.
    pub fn target(&self) -> &Ident {
        match self {
            Statement::DropView { name } | Statement::DropTable { name } => name,
            Statement::CreatePivotView(view) => &view.name,
            Statement::CreateTable(table) => &table.name,
            Statement::InsertFromRelation { table, .. } | Statement::InsertValues { table, .. } => table,
        }
    }

    pub fn to_sql(&self) -> String {
        self.to_string()
    }

    /// Render a JSON value as a T-SQL literal.
    pub fn literal(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1".to_string() } else { "0".to_string() },
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("N'{}'", s.replace('\'', "''")),
            other => format!("N'{}'", other.to_string().replace('\'', "''")),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::DropView { name } => write!(f, "DROP VIEW {name}"),
            Statement::DropTable { name } => write!(f, "DROP TABLE {name}"),
            Statement::CreatePivotView(view) => {
                let outputs = view.output_columns().into_iter().cloned().collect::<Vec<_>>();
                writeln!(f, "CREATE VIEW {} AS", view.name)?;
                writeln!(f, "SELECT {}", Ident::join(&outputs))?;
                writeln!(f, "FROM (")?;
                writeln!(f, "    SELECT {}, {}, {}", view.axis, view.category, view.value)?;
                writeln!(f, "    FROM {}", view.source)?;
                writeln!(f, ") AS src")?;
                writeln!(f, "PIVOT (")?;
                writeln!(f, "    AVG({}) FOR {} IN ({})", view.value, view.category, Ident::join(&view.categories))?;
                write!(f, ") AS pvt")
            }
            Statement::CreateTable(table) => {
                writeln!(f, "CREATE TABLE {} (", table.name)?;
                let mut lines = table.columns.iter()
                    .map(|c| format!("    {} {} {}", c.name, c.ty, if c.nullable { "NULL" } else { "NOT NULL" }))
                    .collect::<Vec<_>>();
                if let Some(pk) = &table.primary_key {
                    let constraint = Ident::new(&format!("PK_{}", table.name.as_str()))
                        .map(|c| c.quoted())
                        .unwrap_or_else(|_| "[PK]".to_string());
                    lines.push(format!("    CONSTRAINT {constraint} PRIMARY KEY ({pk})"));
                }
                writeln!(f, "{}", lines.join(",\n"))?;
                write!(f, ")")
            }
            Statement::InsertFromRelation { table, source } => {
                write!(f, "INSERT INTO {table} SELECT * FROM {source}")
            }
            Statement::InsertValues { table, columns, values } => {
                let values = values.iter().map(Statement::literal).collect::<Vec<_>>().join(", ");
                write!(f, "INSERT INTO {table} ({}) VALUES ({values})", Ident::join(columns))
            }
        }
    }
}
