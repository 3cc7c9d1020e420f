//! Load options and their YAML form

use crate::error::{CoreError, CoreResult};
use crate::matcher::ColumnOverrides;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Options for one load call.
///
/// ```yaml
/// replace: true
/// allow_duplication: false
/// validate: true
/// exact: false
/// where_clause: "customers.name <> ''"
/// overrides:
///   customers.name: customer_name
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadOptions {
    /// Drop each table's matched dataset columns once its ids are merged
    #[serde(default = "default_true")]
    pub replace: bool,

    /// Accept retrieve-merges that multiply rows
    #[serde(default)]
    pub allow_duplication: bool,

    /// Read the data back and compare it to the input
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Exact (multiset equality) or subset comparison
    #[serde(default = "default_true")]
    pub exact: bool,

    /// Filter appended to the automatic compare query
    #[serde(default)]
    pub where_clause: Option<String>,

    /// Caller-supplied compare query, used instead of the automatic one
    #[serde(default)]
    pub compare_query: Option<String>,

    /// Table the automatic compare query starts from
    #[serde(default)]
    pub anchor: Option<String>,

    /// Explicit target tables; inferred from the dataset columns when empty
    #[serde(default)]
    pub tables: Vec<String>,

    /// Column overrides, `"table.column": dataset_column`
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,

    /// How rows are written
    #[serde(default)]
    pub insert_mode: InsertMode,

    /// What the row-by-row insert does with constraint conflicts
    #[serde(default)]
    pub on_conflict: OnConflict,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            replace: true,
            allow_duplication: false,
            validate: true,
            exact: true,
            where_clause: None,
            compare_query: None,
            anchor: None,
            tables: Vec::new(),
            overrides: BTreeMap::new(),
            insert_mode: InsertMode::default(),
            on_conflict: OnConflict::default(),
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

/// Insert strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// One parameterized INSERT per row (default)
    #[default]
    RowByRow,
    /// The backend's bulk path
    BulkAppend,
}

/// Conflict handling for the row-by-row insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnConflict {
    /// Constraint violations fail the load (default)
    #[default]
    Error,
    /// Conflicting rows are skipped
    Ignore,
}

impl LoadOptions {
    /// Load options from a YAML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate options from YAML text
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let options: LoadOptions =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Check the options are consistent with each other
    pub fn validate(&self) -> CoreResult<()> {
        if self.compare_query.is_some() && self.where_clause.is_some() {
            return Err(CoreError::ConfigInvalid {
                message: "where_clause only applies to the automatic compare query, remove it or compare_query".to_string(),
            });
        }
        if self.compare_query.is_some() && self.anchor.is_some() {
            return Err(CoreError::ConfigInvalid {
                message: "anchor only applies to the automatic compare query, remove it or compare_query".to_string(),
            });
        }
        if let Some(query) = &self.compare_query {
            if query.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "compare_query cannot be empty".to_string(),
                });
            }
        }
        if self.tables.iter().any(|t| t.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: "tables cannot contain empty names".to_string(),
            });
        }
        if let Some(anchor) = &self.anchor {
            if !self.tables.is_empty() && !self.tables.contains(anchor) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("anchor '{anchor}' is not one of the listed tables"),
                });
            }
        }
        self.column_overrides()?;
        Ok(())
    }

    /// Parsed column overrides
    pub fn column_overrides(&self) -> CoreResult<ColumnOverrides> {
        ColumnOverrides::parse(&self.overrides)
    }

    /// Explicit targets, or `None` to infer them
    pub fn targets(&self) -> Option<&[String]> {
        if self.tables.is_empty() {
            None
        } else {
            Some(&self.tables)
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
