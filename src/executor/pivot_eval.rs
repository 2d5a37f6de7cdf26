use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    database::{ColumnDef, InternalDb, SchemaDict},
    error::{PivotError, Result},
    executor::{accumulator::{Accumulator, AvgAcc}, helpers::Helpers},
    sql::{PivotView, Statement},
};

/// Deepest chain of views over views a read may follow.
pub const MAX_VIEW_NESTING: usize = 32;

type GroupEntry = (Value, Vec<Box<dyn Accumulator>>);

/// Evaluates stored pivot views.
///
/// Semantics follow `PIVOT`: rows are grouped by the axis column (every
/// source row contributes a group, even when its category is not pivoted),
/// each pivoted cell is `AVG(value)` over the rows whose category matches
/// the column name (case-insensitively), and cells with no contributing rows
/// are NULL. Output rows are ordered by the axis, NULLs last.
pub struct PivotEvaluator;

impl PivotEvaluator {
    pub fn schema(view: &PivotView, db: &InternalDb, depth: usize) -> Result<SchemaDict> {
        let source = Self::source_schema(view, db, depth)?;
        let axis = Self::source_column(view, &source, view.axis.as_str())?;
        let value = Self::source_column(view, &source, view.value.as_str())?;
        Self::source_column(view, &source, view.category.as_str())?;

        let mut columns = vec![ColumnDef::new(view.axis.as_str(), axis.ty, axis.nullable)];
        for category in &view.categories {
            columns.push(ColumnDef::new(category.as_str(), AvgAcc::result_type(value.ty), true));
        }
        Ok(SchemaDict::from_columns(columns))
    }

    pub fn rows(view: &PivotView, db: &InternalDb, depth: usize) -> Result<Vec<Map<String, Value>>> {
        let source = Self::source_schema(view, db, depth)?;
        let axis_col = Self::source_column(view, &source, view.axis.as_str())?.name.clone();
        let category_col = Self::source_column(view, &source, view.category.as_str())?.name.clone();
        let value_def = Self::source_column(view, &source, view.value.as_str())?.clone();

        let mut groups: IndexMap<String, GroupEntry> = IndexMap::new();
        for row in db.rows_at_depth(view.source.as_str(), depth + 1)? {
            let axis = row.get(&axis_col).cloned().unwrap_or(Value::Null);
            let (_, accs) = groups.entry(Helpers::group_key(&axis)).or_insert_with(|| {
                let accs = view.categories.iter()
                    .map(|_| Box::new(AvgAcc::new(value_def.ty)) as Box<dyn Accumulator>)
                    .collect();
                (axis.clone(), accs)
            });

            let Some(label) = row.get(&category_col).and_then(Helpers::label_of) else {
                continue;
            };
            if let Some(idx) = view.categories.iter().position(|c| c.matches(&label)) {
                let value = row.get(&value_def.name).unwrap_or(&Value::Null);
                accs[idx].update(value)
                    .map_err(|e| PivotError::rejected(Statement::CreatePivotView(view.clone()), e.to_string()))?;
            }
        }

        let mut out = groups.into_values()
            .map(|(axis, accs)| {
                let mut m = Map::new();
                m.insert(view.axis.as_str().to_string(), axis);
                for (category, acc) in view.categories.iter().zip(accs.iter()) {
                    m.insert(category.as_str().to_string(), acc.finalize());
                }
                m
            })
            .collect::<Vec<_>>();

        let axis_key = view.axis.as_str();
        out.sort_by(|a, b| {
            let av = a.get(axis_key).unwrap_or(&Value::Null);
            let bv = b.get(axis_key).unwrap_or(&Value::Null);
            Helpers::cmp_json_for_sort(av, bv, true)
        });
        Ok(out)
    }

    fn source_schema(view: &PivotView, db: &InternalDb, depth: usize) -> Result<SchemaDict> {
        if depth >= MAX_VIEW_NESTING {
            return Err(PivotError::rejected(
                Statement::CreatePivotView(view.clone()),
                format!("view nesting exceeds {MAX_VIEW_NESTING} levels"),
            ));
        }
        db.schema_at_depth(view.source.as_str(), depth + 1)
    }

    fn source_column<'a>(view: &PivotView, schema: &'a SchemaDict, name: &str) -> Result<&'a ColumnDef> {
        schema.get(name).ok_or_else(|| PivotError::column_not_found(view.source.as_str(), name))
    }
}
