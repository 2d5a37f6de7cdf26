use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::{
    catalog::RelationKind,
    database::{ColumnDef, InternalDb, MemoryTable, Relation, SchemaDict},
    error::{PivotError, Result},
    executor::pivot_eval::PivotEvaluator,
    sql::{Ident, PivotView, Statement, TableDefinition},
};

/// Applies statements to an `InternalDb`, the way the catalog's execution
/// environment would: each statement succeeds completely or leaves the
/// catalog untouched.
pub struct StatementExecutor;

impl StatementExecutor {
    /// Run one statement and return the number of rows it wrote.
    pub fn run(statement: &Statement, db: &mut InternalDb) -> Result<usize> {
        let reject = |reason: String| PivotError::rejected(statement, reason);

        match statement {
            Statement::DropView { name } => Self::drop(db, name, RelationKind::View).map_err(reject),
            Statement::DropTable { name } => Self::drop(db, name, RelationKind::Table).map_err(reject),
            Statement::CreatePivotView(view) => {
                Self::check_view(db, view).map_err(reject)?;
                // resolve the output schema once so a broken source fails now
                PivotEvaluator::schema(view, db, 0).map_err(|e| reject(e.to_string()))?;
                db.insert(Relation::View(view.clone())).map_err(reject)?;
                Ok(0)
            }
            Statement::CreateTable(definition) => {
                let table = Self::table_from_definition(definition).map_err(reject)?;
                db.insert(Relation::Table(table)).map_err(reject)?;
                Ok(0)
            }
            Statement::InsertFromRelation { table, source } => {
                let source_schema = db.schema_of_relation(source.as_str()).map_err(|e| reject(e.to_string()))?;
                let rows = db.rows_of(source.as_str()).map_err(|e| reject(e.to_string()))?;
                let target = Self::table_mut(db, table).map_err(reject)?;

                if source_schema.len() != target.schema.len() {
                    return Err(reject(format!(
                        "Column name or number of supplied values does not match table definition ({} vs {})",
                        source_schema.len(),
                        target.schema.len()
                    )));
                }

                // SELECT * maps columns by position
                let target_columns = target.schema.column_names();
                let positioned = rows.into_iter()
                    .map(|row| {
                        source_schema.columns()
                            .zip(target_columns.iter())
                            .map(|(src, dst)| (dst.clone(), row.get(&src.name).cloned().unwrap_or(Value::Null)))
                            .collect::<Map<String, Value>>()
                    })
                    .collect::<Vec<_>>();
                target.add_batch(positioned).map(|added| added.len()).map_err(reject)
            }
            Statement::InsertValues { table, columns, values } => {
                if columns.len() != values.len() {
                    return Err(reject("There are fewer columns in the INSERT statement than values specified".to_string()));
                }
                let target = Self::table_mut(db, table).map_err(reject)?;
                let row = columns.iter()
                    .map(|c| c.as_str().to_string())
                    .zip(values.iter().cloned())
                    .collect::<Map<String, Value>>();
                target.add(row).map(|_| 1).map_err(reject)
            }
        }
    }

    fn drop(db: &mut InternalDb, name: &Ident, kind: RelationKind) -> std::result::Result<usize, String> {
        match db.get(name.as_str()).map(Relation::kind) {
            Some(existing) if existing == kind => {
                db.remove(name.as_str());
                Ok(0)
            }
            Some(existing) => Err(format!(
                "Cannot use DROP {kind} with {} because it is a {existing}",
                name.as_str()
            )),
            None => Err(format!(
                "Cannot drop the {kind} {}, because it does not exist or you do not have permission",
                name.as_str()
            )),
        }
    }

    fn check_view(db: &InternalDb, view: &PivotView) -> std::result::Result<(), String> {
        if db.contains(view.name.as_str()) {
            return Err(format!("There is already an object named {} in the database", view.name.as_str()));
        }
        if view.categories.is_empty() {
            return Err("PIVOT requires at least one column in the IN list".to_string());
        }
        let inner = [&view.axis, &view.category, &view.value];
        Self::unique_names(inner.iter().map(|i| i.as_str()))
            .map_err(|c| format!("The column {c} was specified multiple times for src"))?;
        Self::unique_names(view.output_columns().into_iter().map(Ident::as_str))
            .map_err(|c| format!("The column {c} was specified multiple times for pvt"))?;
        Ok(())
    }

    fn table_from_definition(definition: &TableDefinition) -> std::result::Result<MemoryTable, String> {
        if definition.columns.is_empty() {
            return Err(format!("Table {} must have at least one column", definition.name.as_str()));
        }
        Self::unique_names(definition.columns.iter().map(|c| c.name.as_str()))
            .map_err(|c| format!("Column names in each table must be unique. Column name {c} is specified more than once"))?;

        let columns = definition.columns.iter()
            .map(|c| ColumnDef::new(c.name.as_str(), c.ty, c.nullable))
            .collect::<Vec<_>>();

        let primary_key = match &definition.primary_key {
            Some(pk) => {
                let Some(column) = columns.iter().find(|c| pk.matches(&c.name)) else {
                    return Err(format!("Column name {} does not exist in the target table", pk.as_str()));
                };
                if column.nullable {
                    return Err(format!("Cannot define PRIMARY KEY constraint on nullable column {}", column.name));
                }
                Some(column.name.clone())
            }
            None => None,
        };

        Ok(MemoryTable::new(definition.name.as_str(), SchemaDict::from_columns(columns), primary_key))
    }

    fn table_mut<'a>(db: &'a mut InternalDb, name: &Ident) -> std::result::Result<&'a mut MemoryTable, String> {
        match db.get_mut(name.as_str()) {
            Some(Relation::Table(table)) => Ok(table),
            Some(Relation::View(_)) => Err(format!("{} is a view and cannot be inserted into", name.as_str())),
            None => Err(format!("Invalid object name {}", name.as_str())),
        }
    }

    /// Ok when every name is unique (case-insensitively), else the first repeat.
    fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(Ident::fold(name)) {
                return Err(name.to_string());
            }
        }
        Ok(())
    }
}
