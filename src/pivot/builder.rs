use crate::{
    catalog::RelationKind,
    error::{PivotError, Result},
    pivot::{CategorySet, PivotNames, PivotRequest},
    sql::{Ident, PivotView, Statement},
};

/// Composes the pivot view definition from a request and its discovered
/// categories.
///
/// Every name that reaches the generated text passes through `Ident`, so
/// values discovered at run time are quoted, never spliced in raw.
pub struct PivotStatementBuilder<'a> {
    request: &'a PivotRequest,
    names: &'a PivotNames,
    categories: &'a CategorySet,
}

impl<'a> PivotStatementBuilder<'a> {
    pub fn new(request: &'a PivotRequest, names: &'a PivotNames, categories: &'a CategorySet) -> Self {
        Self { request, names, categories }
    }

    /// The view definition. Fails before composing anything when there are
    /// no categories to pivot on.
    pub fn view_definition(&self) -> Result<PivotView> {
        if self.categories.is_empty() {
            return Err(PivotError::EmptyCategorySet {
                relation: self.request.source_relation.clone(),
                column: self.request.category_column.clone(),
            });
        }

        Ok(PivotView {
            name: Ident::new(&self.names.view)?,
            source: Ident::new(&self.request.source_relation)?,
            axis: Ident::new(&self.request.axis_column)?,
            category: Ident::new(&self.request.category_column)?,
            value: Ident::new(&self.request.value_column)?,
            categories: self.categories.identifiers()?,
        })
    }

    /// Statements that replace the view: a drop when one already exists,
    /// then the create.
    pub fn view_statements(&self, existing: Option<RelationKind>) -> Result<Vec<Statement>> {
        let view = self.view_definition()?;
        let mut statements = Vec::with_capacity(2);
        if let Some(drop) = replace_statement(&view.name, RelationKind::View, existing)? {
            statements.push(drop);
        }
        statements.push(Statement::CreatePivotView(view));
        Ok(statements)
    }
}

/// The drop needed before creating `name` as `wanted`.
///
/// Nothing to drop when the name is free; an object of another kind under
/// the name is a collision rather than something to remove.
pub fn replace_statement(name: &Ident, wanted: RelationKind, existing: Option<RelationKind>) -> Result<Option<Statement>> {
    match existing {
        None => Ok(None),
        Some(kind) if kind == wanted => Ok(Some(match wanted {
            RelationKind::View => Statement::DropView { name: name.clone() },
            RelationKind::Table => Statement::DropTable { name: name.clone() },
        })),
        Some(kind) => Err(PivotError::NameCollision {
            name: name.as_str().to_string(),
            existing: kind.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PivotConfig;

    fn sales_request() -> PivotRequest {
        PivotRequest::new("Sales", "Amount", "Region", "Quarter")
    }

    #[test]
    fn composes_the_view_from_quoted_parts() {
        let request = sales_request();
        let names = PivotNames::derive(&request.source_relation, &PivotConfig::default());
        let categories = CategorySet::from_labels(vec!["East".to_string(), "West".to_string()]);

        let view = PivotStatementBuilder::new(&request, &names, &categories).view_definition().unwrap();
        assert_eq!(view.name.as_str(), "VW_Sales_pivoted");
        assert_eq!(view.output_columns().len(), categories.len() + 1);

        let sql = Statement::CreatePivotView(view).to_sql();
        assert!(sql.contains("AVG([Amount]) FOR [Region] IN ([East], [West])"));
        assert!(sql.contains("SELECT [Quarter], [Region], [Amount]"));
    }

    #[test]
    fn empty_categories_fail_before_composing() {
        let request = sales_request();
        let names = PivotNames::derive(&request.source_relation, &PivotConfig::default());
        let categories = CategorySet::default();

        let builder = PivotStatementBuilder::new(&request, &names, &categories);
        assert_eq!(
            builder.view_statements(None).unwrap_err(),
            PivotError::EmptyCategorySet { relation: "Sales".into(), column: "Region".into() }
        );
    }

    #[test]
    fn existing_view_is_dropped_first() {
        let request = sales_request();
        let names = PivotNames::derive(&request.source_relation, &PivotConfig::default());
        let categories = CategorySet::from_labels(vec!["East".to_string()]);
        let builder = PivotStatementBuilder::new(&request, &names, &categories);

        let fresh = builder.view_statements(None).unwrap();
        assert_eq!(fresh.len(), 1);

        let replacing = builder.view_statements(Some(RelationKind::View)).unwrap();
        assert_eq!(replacing[0].to_sql(), "DROP VIEW [VW_Sales_pivoted]");
        assert!(matches!(replacing[1], Statement::CreatePivotView(_)));
    }

    #[test]
    fn a_table_under_the_view_name_collides() {
        let request = sales_request();
        let names = PivotNames::derive(&request.source_relation, &PivotConfig::default());
        let categories = CategorySet::from_labels(vec!["East".to_string()]);
        let builder = PivotStatementBuilder::new(&request, &names, &categories);

        assert!(matches!(
            builder.view_statements(Some(RelationKind::Table)),
            Err(PivotError::NameCollision { existing, .. }) if existing == "TABLE"
        ));
    }
}
