//! Column matching: dataset column names to schema columns, per table
//!
//! Matching is by exact name. Caller overrides of the form
//! `table.column -> dataset_column` take precedence and are the only way to
//! resolve a name that exists on more than one touched table.

use crate::error::{quoted_list, CoreError, CoreResult};
use crate::names::{ColumnName, TableName};
use crate::schema::{SchemaGraph, Table};
use std::collections::{BTreeMap, BTreeSet};

/// Caller-supplied column overrides, keyed by `(table, column)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOverrides {
    entries: BTreeMap<(TableName, ColumnName), String>,
}

impl ColumnOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `table.column` to `dataset_column`.
    pub fn insert(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        dataset_column: impl Into<String>,
    ) -> CoreResult<()> {
        let table = table.into();
        let column = column.into();
        let key = format!("{table}.{column}");
        let (Some(table), Some(column)) = (TableName::try_new(table), ColumnName::try_new(column))
        else {
            return Err(CoreError::InvalidOverride {
                key,
                reason: "table and column must not be empty".into(),
            });
        };
        self.entries.insert((table, column), dataset_column.into());
        Ok(())
    }

    /// Parse overrides written as `"table.column": dataset_column`.
    pub fn parse(raw: &BTreeMap<String, String>) -> CoreResult<Self> {
        let mut overrides = Self::new();
        for (key, dataset_column) in raw {
            let Some((table, column)) = key.split_once('.') else {
                return Err(CoreError::InvalidOverride {
                    key: key.clone(),
                    reason: "expected the form <table>.<column>".into(),
                });
            };
            if column.contains('.') {
                return Err(CoreError::InvalidOverride {
                    key: key.clone(),
                    reason: "expected exactly one '.' separating table and column".into(),
                });
            }
            overrides.insert(table, column, dataset_column.clone())?;
        }
        Ok(overrides)
    }

    pub fn get(&self, table: &TableName, column: &ColumnName) -> Option<&str> {
        self.entries
            .get(&(table.clone(), column.clone()))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableName, &ColumnName, &str)> {
        self.entries
            .iter()
            .map(|((t, c), d)| (t, c, d.as_str()))
    }

    /// Tables named by at least one override.
    pub fn tables(&self) -> BTreeSet<TableName> {
        self.entries.keys().map(|(t, _)| t.clone()).collect()
    }

    /// Dataset columns consumed by overrides; these never match by bare name.
    pub fn claimed(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    /// Check every override against the schema and the dataset.
    pub fn validate(&self, schema: &SchemaGraph, dataset_columns: &[String]) -> CoreResult<()> {
        for ((table, column), dataset_column) in &self.entries {
            let key = format!("{table}.{column}");
            let Ok(found) = schema.table(table) else {
                return Err(CoreError::InvalidOverride {
                    key,
                    reason: format!("table '{table}' does not appear in the schema"),
                });
            };
            if !found.has_column(column) {
                let reason = if found.primary_key.as_ref() == Some(column) {
                    "primary keys cannot be set directly".to_string()
                } else {
                    format!("table '{table}' has no column '{column}'")
                };
                return Err(CoreError::InvalidOverride { key, reason });
            }
            if !dataset_columns.iter().any(|c| c == dataset_column) {
                return Err(CoreError::OverrideColumnNotInDataset {
                    table: table.to_string(),
                    column: column.to_string(),
                    dataset_column: dataset_column.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Where the values of a mapped column come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    /// A column of the caller's dataset
    Dataset,
    /// Primary keys retrieved from `parent` earlier in the same load
    Key { parent: TableName },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub db_column: ColumnName,
    pub dataset_column: String,
    pub source: MappingSource,
    /// Whether the db column is a foreign key
    pub is_key: bool,
}

/// Dataset-column to db-column mapping for one table, sorted by db column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub table: TableName,
    columns: Vec<MappedColumn>,
}

impl ColumnMapping {
    pub fn new(table: TableName, mut columns: Vec<MappedColumn>) -> Self {
        columns.sort_by(|a, b| a.db_column.cmp(&b.db_column));
        Self { table, columns }
    }

    pub fn columns(&self) -> &[MappedColumn] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn db_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.db_column.as_str()).collect()
    }

    pub fn dataset_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.dataset_column.as_str()).collect()
    }

    /// Dataset columns feeding non-key columns; these are what `replace` drops.
    pub fn data_dataset_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.is_key)
            .map(|c| c.dataset_column.as_str())
            .collect()
    }

    pub fn get(&self, db_column: &str) -> Option<&MappedColumn> {
        self.columns.iter().find(|c| c.db_column == db_column)
    }
}

/// Resolves dataset columns against the schema.
pub struct ColumnMatcher<'a> {
    schema: &'a SchemaGraph,
    overrides: &'a ColumnOverrides,
}

impl<'a> ColumnMatcher<'a> {
    pub fn new(schema: &'a SchemaGraph, overrides: &'a ColumnOverrides) -> Self {
        Self { schema, overrides }
    }

    pub fn overrides(&self) -> &ColumnOverrides {
        self.overrides
    }

    /// Dataset columns that take part in bare-name matching.
    pub fn unclaimed<'c>(&self, dataset_columns: &'c [String]) -> Vec<&'c str> {
        let claimed = self.overrides.claimed();
        dataset_columns
            .iter()
            .map(String::as_str)
            .filter(|c| !claimed.contains(c))
            .collect()
    }

    /// Candidate tables having a non-key column named `column`.
    pub fn tables_with_data_column(
        &self,
        column: &str,
        candidates: &BTreeSet<TableName>,
    ) -> Vec<TableName> {
        candidates
            .iter()
            .filter_map(|name| self.schema.table(name).ok())
            .filter(|table| table.data_columns().any(|c| c.name == column))
            .map(|table| table.name.clone())
            .collect()
    }

    /// Build one mapping per touched table, in table-name order.
    pub fn resolve(
        &self,
        dataset_columns: &[String],
        touched: &BTreeSet<TableName>,
    ) -> CoreResult<Vec<ColumnMapping>> {
        self.overrides.validate(self.schema, dataset_columns)?;

        let unclaimed = self.unclaimed(dataset_columns);
        for column in &unclaimed {
            let owners = self.tables_with_data_column(column, touched);
            if owners.len() > 1 {
                return Err(CoreError::AmbiguousColumn {
                    column: column.to_string(),
                    tables: quoted_list(&owners),
                });
            }
        }

        touched
            .iter()
            .map(|name| {
                let table = self.schema.table(name)?;
                let mapping = self.map_table(table, &unclaimed, touched)?;
                if mapping.is_empty() {
                    return Err(CoreError::NoMatchingColumns {
                        table: name.to_string(),
                        columns: quoted_list(dataset_columns),
                    });
                }
                Ok(mapping)
            })
            .collect()
    }

    /// Mapping for a single table, as used by manual insert/retrieve calls.
    ///
    /// Foreign keys can only come from the dataset here, since no parent
    /// is loaded in the same call.
    pub fn resolve_table(&self, dataset_columns: &[String], table: &str) -> CoreResult<ColumnMapping> {
        let table = self.schema.table(table)?;
        let touched = BTreeSet::from([table.name.clone()]);
        self.resolve(dataset_columns, &touched)?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NoMatchingColumns {
                table: table.name.to_string(),
                columns: quoted_list(dataset_columns),
            })
    }

    fn map_table(
        &self,
        table: &Table,
        unclaimed: &[&str],
        touched: &BTreeSet<TableName>,
    ) -> CoreResult<ColumnMapping> {
        let mut mapped = Vec::new();

        for column in &table.columns {
            let fk = table.foreign_key(&column.name);
            let is_key = fk.is_some();

            if let Some(dataset_column) = self.overrides.get(&table.name, &column.name) {
                mapped.push(MappedColumn {
                    db_column: column.name.clone(),
                    dataset_column: dataset_column.to_string(),
                    source: MappingSource::Dataset,
                    is_key,
                });
                continue;
            }

            if let Some(fk) = fk {
                if touched.contains(&fk.references) {
                    mapped.push(MappedColumn {
                        db_column: column.name.clone(),
                        dataset_column: self.schema.key_alias(&fk.references)?,
                        source: MappingSource::Key {
                            parent: fk.references.clone(),
                        },
                        is_key,
                    });
                    continue;
                }
            }

            if unclaimed.contains(&column.name.as_str()) {
                mapped.push(MappedColumn {
                    db_column: column.name.clone(),
                    dataset_column: column.name.to_string(),
                    source: MappingSource::Dataset,
                    is_key,
                });
                continue;
            }

            if column.is_required() {
                return Err(CoreError::MissingRequiredColumn {
                    table: table.name.to_string(),
                    column: column.name.to_string(),
                });
            }
        }

        Ok(ColumnMapping::new(table.name.clone(), mapped))
    }
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod tests;
