use tracing::debug;

use crate::{
    catalog::{Catalog, RelationKind},
    database::SqlType,
    error::Result,
    pivot::{replace_statement, PivotRequest},
    sql::{ColumnDefinition, Ident, Statement, TableDefinition},
};

/// Declared type of one source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTypeDescriptor {
    pub column_name: String,
    pub declared_type: SqlType,
}

/// Builds the typed snapshot table of a pivot view.
///
/// The axis keeps its source type and becomes the primary key; every
/// category column takes the value column's type. Categories whose values
/// would need a wider type are not inspected.
pub struct Materializer<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: Catalog + ?Sized> Materializer<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    pub fn describe(&self, relation: &str, column: &str) -> Result<ColumnTypeDescriptor> {
        let declared_type = self.catalog.describe_column(relation, column)?;
        Ok(ColumnTypeDescriptor { column_name: column.to_string(), declared_type })
    }

    /// Types of the axis and value columns, in that order.
    pub fn infer_types(&self, request: &PivotRequest) -> Result<(ColumnTypeDescriptor, ColumnTypeDescriptor)> {
        let axis = self.describe(&request.source_relation, &request.axis_column)?;
        let value = self.describe(&request.source_relation, &request.value_column)?;
        debug!(axis = %axis.declared_type, value = %value.declared_type, "inferred column types");
        Ok((axis, value))
    }

    /// Drop (when present), create, then fill the table from the view.
    pub fn table_statements(
        table: &Ident,
        view: &Ident,
        axis: &ColumnTypeDescriptor,
        value: &ColumnTypeDescriptor,
        categories: &[Ident],
        existing: Option<RelationKind>,
    ) -> Result<Vec<Statement>> {
        let definition = Self::table_definition(table, axis, value, categories)?;
        let mut statements = Vec::with_capacity(3);
        if let Some(drop) = replace_statement(table, RelationKind::Table, existing)? {
            statements.push(drop);
        }
        statements.push(Statement::CreateTable(definition));
        statements.push(Statement::InsertFromRelation { table: table.clone(), source: view.clone() });
        Ok(statements)
    }

    pub fn table_definition(
        table: &Ident,
        axis: &ColumnTypeDescriptor,
        value: &ColumnTypeDescriptor,
        categories: &[Ident],
    ) -> Result<TableDefinition> {
        let axis_name = Ident::new(&axis.column_name)?;
        let mut columns = vec![ColumnDefinition {
            name: axis_name.clone(),
            ty: axis.declared_type,
            nullable: false,
        }];
        columns.extend(categories.iter().map(|category| ColumnDefinition {
            name: category.clone(),
            ty: value.declared_type,
            nullable: true,
        }));

        Ok(TableDefinition {
            name: table.clone(),
            columns,
            primary_key: Some(axis_name),
        })
    }
}
