use std::fmt::Display;

use crate::error::{PivotError, Result};

/// A validated identifier rendered in bracket-quoted form.
///
/// The raw name is kept as given; `Display` produces `[name]` with every `]`
/// doubled, so any validated name can be embedded in generated SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Longest identifier the catalog accepts.
    pub const MAX_LEN: usize = 128;

    pub fn new(name: &str) -> Result<Self> {
        let invalid = |reason: &str| PivotError::InvalidIdentifier {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if name.chars().count() > Self::MAX_LEN {
            return Err(invalid("identifier is longer than 128 characters"));
        }
        if name.chars().any(char::is_control) {
            return Err(invalid("identifier contains control characters"));
        }
        Ok(Ident(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn quoted(&self) -> String {
        format!("[{}]", self.0.replace(']', "]]"))
    }

    /// Case-insensitive comparison, as the catalog resolves names.
    pub fn matches(&self, other: &str) -> bool {
        Self::fold(&self.0) == Self::fold(other)
    }

    /// The form two names share when they differ only in case. Every
    /// case-insensitive comparison of names and category labels uses it.
    pub fn fold(name: &str) -> String {
        name.to_lowercase()
    }

    /// Render identifiers as a comma-separated list: `[a], [b]`.
    pub fn join(idents: &[Ident]) -> String {
        idents.iter().map(Ident::quoted).collect::<Vec<_>>().join(", ")
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.quoted())
    }
}
