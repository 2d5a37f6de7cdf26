use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PivotError, Result};

/// Settings shared by every generation run.
///
/// - `view_prefix` marks generated view names (`VW_` by default).
/// - `pivot_suffix` is appended to every generated name.
/// - `log_table`, when set, receives one row per successful run.
/// - `text_type` is the declared type given to string columns whose type
///   has to be inferred from seed rows.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PivotConfig {
    pub view_prefix: String,
    pub pivot_suffix: String,
    pub log_table: Option<String>,
    pub text_type: String,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            view_prefix: "VW_".to_string(),
            pivot_suffix: "_pivoted".to_string(),
            log_table: None,
            text_type: "nvarchar(256)".to_string(),
        }
    }
}

impl PivotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(view_prefix: &str, pivot_suffix: &str) -> Self {
        Self {
            view_prefix: view_prefix.to_string(),
            pivot_suffix: pivot_suffix.to_string(),
            ..Self::default()
        }
    }

    pub fn with_log_table(mut self, log_table: &str) -> Self {
        self.log_table = Some(log_table.to_string());
        self
    }

    /// Parse a configuration from JSON text. Missing keys take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: PivotConfig = serde_json::from_str(text)
            .map_err(|e| PivotError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PivotError::Config(format!("could not read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Names derived with an empty prefix or suffix would collide with their
    /// source or with each other.
    pub fn validate(&self) -> Result<()> {
        if self.view_prefix.is_empty() {
            return Err(PivotError::Config("view_prefix must not be empty".to_string()));
        }
        if self.pivot_suffix.is_empty() {
            return Err(PivotError::Config("pivot_suffix must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = PivotConfig::from_json_str(r#"{ "log_table": "PivotLog" }"#).unwrap();
        assert_eq!(config.view_prefix, "VW_");
        assert_eq!(config.pivot_suffix, "_pivoted");
        assert_eq!(config.log_table.as_deref(), Some("PivotLog"));
        assert_eq!(config.text_type, "nvarchar(256)");
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let err = PivotConfig::from_json_str(r#"{ "view_prefix": "" }"#).unwrap_err();
        assert!(matches!(err, PivotError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "view_prefix": "V_", "pivot_suffix": "_wide" }}"#).unwrap();

        let config = PivotConfig::from_file(file.path()).unwrap();
        assert_eq!(config, PivotConfig::from("V_", "_wide"));
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PivotConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, PivotError::Config(msg) if msg.contains("could not read")));
    }
}
