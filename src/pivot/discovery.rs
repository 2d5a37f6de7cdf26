use tracing::debug;

use crate::{catalog::Catalog, error::Result, pivot::CategorySet};

/// Finds the categories to pivot on.
///
/// Discovery is a plain read: it asks the catalog for the distinct values of
/// the category column and returns them. Nothing is created in the catalog,
/// so there is nothing to clean up when a later step fails.
pub struct CategoryDiscovery<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: Catalog + ?Sized> CategoryDiscovery<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// The result may be empty; callers decide whether that is fatal.
    pub fn discover(&self, source_relation: &str, category_column: &str) -> Result<CategorySet> {
        let values = self.catalog.distinct_values(source_relation, category_column)?;
        let categories = CategorySet::from_values(&values);
        debug!(
            relation = source_relation,
            column = category_column,
            count = categories.len(),
            categories = %categories.identifier_list()?,
            "discovered categories"
        );
        Ok(categories)
    }
}
