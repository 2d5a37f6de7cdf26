use crate::{config::PivotConfig, sql::Ident};

/// Names of the objects a run replaces, derived from the source name alone so
/// every run targets the same objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotNames {
    pub view: String,
    pub table: String,
}

impl PivotNames {
    pub fn derive(source_relation: &str, config: &PivotConfig) -> Self {
        let view = Self::view_name(source_relation, &config.view_prefix, &config.pivot_suffix);
        let table = Self::table_name(&view, &config.view_prefix);
        Self { view, table }
    }

    /// `Sales` -> `VW_Sales_pivoted`; `VW_Sales` -> `VW_Sales_pivoted`.
    ///
    /// The prefix is matched case-insensitively, like any other identifier.
    pub fn view_name(source_relation: &str, prefix: &str, suffix: &str) -> String {
        if Self::leading_prefix_len(source_relation, prefix).is_some() {
            format!("{source_relation}{suffix}")
        } else {
            format!("{prefix}{source_relation}{suffix}")
        }
    }

    /// Remove the prefix from the start of the view name only; occurrences
    /// further in are kept.
    pub fn table_name(view_name: &str, prefix: &str) -> String {
        match Self::leading_prefix_len(view_name, prefix) {
            Some(len) => view_name[len..].to_string(),
            None => view_name.to_string(),
        }
    }

    fn leading_prefix_len(name: &str, prefix: &str) -> Option<usize> {
        let head = name.get(..prefix.len())?;
        (Ident::fold(head) == Ident::fold(prefix)).then_some(prefix.len())
    }
}
