//! In-memory tabular dataset.
//!
//! A [`Dataset`] is an ordered list of named columns plus rows of
//! [`Value`]s. It supports exactly what loading needs: projection,
//! de-duplication, key-matched left joins and multiset counting.

use crate::error::{CoreError, CoreResult};
use crate::value::{Value, ValueKind};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Rows keyed by their full contents, with occurrence counts.
pub type RowCounts = HashMap<Vec<Value>, usize>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate column names and ragged rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> CoreResult<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(CoreError::DuplicateDatasetColumn {
                    column: column.clone(),
                });
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(CoreError::RowWidthMismatch {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Create a dataset with columns but no rows.
    pub fn empty(columns: Vec<String>) -> CoreResult<Self> {
        Self::new(columns, Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require_index(&self, name: &str) -> CoreResult<usize> {
        self.column_index(name)
            .ok_or_else(|| CoreError::DatasetColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Append a row, checking its width.
    pub fn push_row(&mut self, row: Vec<Value>) -> CoreResult<()> {
        if row.len() != self.columns.len() {
            return Err(CoreError::RowWidthMismatch {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Keep only `columns`, in the given order.
    pub fn project<S: AsRef<str>>(&self, columns: &[S]) -> CoreResult<Dataset> {
        let indices = columns
            .iter()
            .map(|c| self.require_index(c.as_ref()))
            .collect::<CoreResult<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Dataset::new(
            columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows,
        )
    }

    /// Remove repeated rows, keeping the first occurrence of each.
    pub fn distinct(&self) -> Dataset {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(row.as_slice()))
            .cloned()
            .collect();
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Drop the named columns; names that are not present are ignored.
    pub fn drop_columns<S: AsRef<str>>(&self, columns: &[S]) -> Dataset {
        let keep: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !columns.iter().any(|d| d.as_ref() == c.as_str()))
            .cloned()
            .collect();
        // every kept name comes from self, so projection cannot fail
        let indices: Vec<usize> = keep
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Dataset {
            columns: keep,
            rows,
        }
    }

    /// Values of a single column.
    pub fn column_values(&self, name: &str) -> CoreResult<Vec<&Value>> {
        let idx = self.require_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Kind of the first non-null value in a column.
    pub fn column_kind(&self, name: &str) -> Option<ValueKind> {
        let idx = self.column_index(name)?;
        self.rows.iter().find_map(|row| row[idx].kind())
    }

    /// Coerce every column that also exists in `reference` to the kind
    /// observed there.
    pub fn coerce_like(mut self, reference: &Dataset) -> Dataset {
        let targets: Vec<(usize, ValueKind)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| reference.column_kind(c).map(|k| (i, k)))
            .collect();
        for row in &mut self.rows {
            for &(i, kind) in &targets {
                let value = std::mem::replace(&mut row[i], Value::Null);
                row[i] = value.coerce_to(kind);
            }
        }
        self
    }

    /// Left-join `right` onto this dataset on the `on` columns.
    ///
    /// Output columns are this dataset's columns followed by the columns of
    /// `right` that are not join keys. Left rows without a match get `Null`
    /// in the right-hand columns; left rows with several matches are
    /// repeated once per match. `Null` keys match `Null` keys.
    pub fn left_join<S: AsRef<str>>(&self, right: &Dataset, on: &[S]) -> CoreResult<Dataset> {
        let left_keys = on
            .iter()
            .map(|c| self.require_index(c.as_ref()))
            .collect::<CoreResult<Vec<_>>>()?;
        let right_keys = on
            .iter()
            .map(|c| right.require_index(c.as_ref()))
            .collect::<CoreResult<Vec<_>>>()?;
        let right_extra: Vec<usize> = (0..right.columns.len())
            .filter(|i| !right_keys.contains(i))
            .collect();

        let mut columns = self.columns.clone();
        for &i in &right_extra {
            let name = &right.columns[i];
            if columns.contains(name) {
                return Err(CoreError::DuplicateDatasetColumn {
                    column: name.clone(),
                });
            }
            columns.push(name.clone());
        }

        let mut index: HashMap<Vec<&Value>, Vec<usize>> = HashMap::new();
        for (r, row) in right.rows.iter().enumerate() {
            let key: Vec<&Value> = right_keys.iter().map(|&i| &row[i]).collect();
            index.entry(key).or_default().push(r);
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let key: Vec<&Value> = left_keys.iter().map(|&i| &row[i]).collect();
            match index.get(&key) {
                Some(matches) => {
                    for &r in matches {
                        let mut out = row.clone();
                        out.extend(right_extra.iter().map(|&i| right.rows[r][i].clone()));
                        rows.push(out);
                    }
                }
                None => {
                    let mut out = row.clone();
                    out.extend(right_extra.iter().map(|_| Value::Null));
                    rows.push(out);
                }
            }
        }

        Ok(Dataset { columns, rows })
    }

    /// Count occurrences of each distinct row.
    pub fn row_counts(&self) -> RowCounts {
        let mut counts = RowCounts::new();
        for row in &self.rows {
            *counts.entry(row.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Multiset equality: same rows with the same multiplicities, in any order.
    pub fn same_rows(&self, other: &Dataset) -> bool {
        self.columns == other.columns && self.row_counts() == other.row_counts()
    }

    /// Rename columns according to `renames` (old name to new name).
    pub fn rename_columns(mut self, renames: &HashMap<String, String>) -> CoreResult<Dataset> {
        for column in &mut self.columns {
            if let Some(new_name) = renames.get(column) {
                *column = new_name.clone();
            }
        }
        Dataset::new(self.columns, self.rows)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dataset_test.rs"]
mod tests;
