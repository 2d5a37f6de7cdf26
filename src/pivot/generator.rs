use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, info_span, warn};

use crate::{
    catalog::Catalog,
    config::PivotConfig,
    error::Result,
    pivot::{CategoryDiscovery, CategorySet, Materializer, PivotNames, PivotRequest, PivotStatementBuilder},
    sql::{Ident, Statement},
};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotOutcome {
    pub view_name: String,
    /// Set when the run materialized the view.
    pub table_name: Option<String>,
    pub categories: CategorySet,
    /// SQL text of every statement executed, in order.
    pub statements: Vec<String>,
}

pub struct PivotGenerator<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    config: &'a PivotConfig,
}

impl<'a, C: Catalog + ?Sized> PivotGenerator<'a, C> {
    pub fn new(catalog: &'a C, config: &'a PivotConfig) -> Self {
        Self { catalog, config }
    }

    /// Rebuild the pivot view of `request.source_relation`, and its table when
    /// `request.materialize` is set.
    ///
    /// The configuration is checked before anything is read. Steps run in
    /// order and the first failure ends the run. Objects created by earlier
    /// steps stay in place: a failed materialization leaves the new view
    /// behind.
    pub fn generate(&self, request: &PivotRequest) -> Result<PivotOutcome> {
        let span = info_span!("pivot", source = %request.source_relation);
        let _enter = span.enter();

        self.config.validate()?;

        let names = PivotNames::derive(&request.source_relation, self.config);
        let categories = CategoryDiscovery::new(self.catalog)
            .discover(&request.source_relation, &request.category_column)?;

        let builder = PivotStatementBuilder::new(request, &names, &categories);
        let view = builder.view_definition()?;
        let materializer = Materializer::new(self.catalog);
        let (axis, value) = materializer.infer_types(request)?;

        let mut executed = Vec::new();
        let existing_view = self.catalog.relation_kind(&names.view)?;
        for statement in builder.view_statements(existing_view)? {
            self.run(&statement, &mut executed)?;
        }

        let table_name = if request.materialize {
            let table = Ident::new(&names.table)?;
            let existing_table = self.catalog.relation_kind(&names.table)?;
            let statements = Materializer::<C>::table_statements(
                &table,
                &view.name,
                &axis,
                &value,
                &view.categories,
                existing_table,
            )?;
            for statement in statements {
                self.run(&statement, &mut executed)?;
            }
            Some(names.table.clone())
        } else {
            None
        };

        if let Some(log_table) = &self.config.log_table {
            let logged = table_name.as_deref().unwrap_or(&names.view);
            let statement = Self::log_statement(log_table, logged)?;
            self.run(&statement, &mut executed)?;
        }

        info!(
            view = %names.view,
            table = table_name.as_deref().unwrap_or("-"),
            categories = categories.len(),
            "pivot generated"
        );

        Ok(PivotOutcome {
            view_name: names.view,
            table_name,
            categories,
            statements: executed,
        })
    }

    fn run(&self, statement: &Statement, executed: &mut Vec<String>) -> Result<()> {
        match statement {
            Statement::DropView { name } => warn!(view = %name, "replacing existing view"),
            Statement::DropTable { name } => warn!(table = %name, "replacing existing table"),
            _ => {}
        }
        self.catalog.execute(statement)?;
        let sql = statement.to_sql();
        info!(object = %statement.target(), "{}", sql.lines().next().unwrap_or_default());
        executed.push(sql);
        Ok(())
    }

    fn log_statement(log_table: &str, logged: &str) -> Result<Statement> {
        let updated_at = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        Ok(Statement::InsertValues {
            table: Ident::new(log_table)?,
            columns: vec![Ident::new("table_name")?, Ident::new("updated_at")?],
            values: vec![Value::String(logged.to_string()), Value::String(updated_at)],
        })
    }
}
