//! Round-trip validation of a load
//!
//! The compare query reads the loaded tables back in dataset shape. Its
//! result is checked against the caller's input, either as an equal
//! multiset of rows or as a superset of it.

use crate::error::{LoadError, LoadResult};
use fk_core::{Dataset, Value};
use fk_db::Executor;
use fk_sql::CompareQuery;
use std::fmt;

/// Rows shown per side in a failed report
const SAMPLE_ROWS: usize = 5;

/// How retrieved rows must relate to the original rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Same rows with the same multiplicities
    Exact,
    /// Every original row is present at least as often as in the original
    Subset,
}

impl CompareMode {
    pub fn from_exact(exact: bool) -> Self {
        if exact {
            CompareMode::Exact
        } else {
            CompareMode::Subset
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareMode::Exact => write!(f, "exact"),
            CompareMode::Subset => write!(f, "subset"),
        }
    }
}

/// The statement that reads loaded data back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareStatement {
    /// Built from the load plan; output columns are known up front
    Synthesized(CompareQuery),
    /// Caller-supplied SELECT; its output columns must be dataset columns
    Custom(String),
}

impl CompareStatement {
    pub fn sql(&self) -> &str {
        match self {
            CompareStatement::Synthesized(query) => &query.sql,
            CompareStatement::Custom(sql) => sql,
        }
    }
}

/// Outcome of comparing retrieved rows with the original rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub mode: CompareMode,
    pub columns: Vec<String>,
    pub expected_rows: usize,
    pub retrieved_rows: usize,
    /// Original rows the database is short of, with the shortfall
    pub missing: Vec<(Vec<Value>, usize)>,
    /// Retrieved rows beyond the original, with the surplus; only
    /// relevant to exact comparison
    pub unexpected: Vec<(Vec<Value>, usize)>,
}

impl ValidationReport {
    pub fn is_match(&self) -> bool {
        match self.mode {
            CompareMode::Exact => self.missing.is_empty() && self.unexpected.is_empty(),
            CompareMode::Subset => self.missing.is_empty(),
        }
    }
}

fn write_samples(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    rows: &[(Vec<Value>, usize)],
) -> fmt::Result {
    let total: usize = rows.iter().map(|(_, n)| n).sum();
    write!(f, "; {total} {label}")?;
    for (row, count) in rows.iter().take(SAMPLE_ROWS) {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        write!(f, " ({})", cells.join(", "))?;
        if *count > 1 {
            write!(f, " x{count}")?;
        }
    }
    if rows.len() > SAMPLE_ROWS {
        write!(f, " ...")?;
    }
    Ok(())
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} comparison over [{}]: expected {} rows, retrieved {}",
            self.mode,
            self.columns.join(", "),
            self.expected_rows,
            self.retrieved_rows
        )?;
        if !self.missing.is_empty() {
            write_samples(f, "missing", &self.missing)?;
        }
        if self.mode == CompareMode::Exact && !self.unexpected.is_empty() {
            write_samples(f, "unexpected", &self.unexpected)?;
        }
        Ok(())
    }
}

/// Runs compare statements and checks their result.
pub struct Validator<'a, E: Executor + ?Sized> {
    executor: &'a E,
}

impl<'a, E: Executor + ?Sized> Validator<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self { executor }
    }

    /// Execute `statement` and compare its rows with `original`.
    ///
    /// Every row of `original` counts, duplicates included. Returns the
    /// report on a match and `LoadError::Validation` otherwise.
    pub fn check(
        &self,
        statement: &CompareStatement,
        original: &Dataset,
        mode: CompareMode,
    ) -> LoadResult<ValidationReport> {
        self.run(statement, original, mode, false)
    }

    /// Like [`Validator::check`], against the rows a load writes for
    /// `original`.
    ///
    /// A load writes each distinct row once, so the expected side is the
    /// distinct projection of `original` onto the compare columns. The
    /// retrieved side is taken as read and extra copies still count.
    pub fn check_loaded(
        &self,
        statement: &CompareStatement,
        original: &Dataset,
        mode: CompareMode,
    ) -> LoadResult<ValidationReport> {
        self.run(statement, original, mode, true)
    }

    fn run(
        &self,
        statement: &CompareStatement,
        original: &Dataset,
        mode: CompareMode,
        written: bool,
    ) -> LoadResult<ValidationReport> {
        log::info!("Validating load ({mode} comparison)");
        let retrieved = self.executor.query(statement.sql(), &[])?;

        let expected = match statement {
            CompareStatement::Synthesized(query) => {
                reshape(original, &query.sources, &query.columns)?
            }
            CompareStatement::Custom(_) => original.project(retrieved.columns())?,
        };
        let expected = if written { expected.distinct() } else { expected };

        let report = compare_datasets(&expected, &retrieved, mode)?;
        if report.is_match() {
            log::debug!(
                "Validation passed: {} rows matched",
                report.expected_rows
            );
            Ok(report)
        } else {
            Err(LoadError::Validation(Box::new(report)))
        }
    }
}

/// Compare `retrieved` against `expected` as multisets over the expected
/// columns.
///
/// Exact mode needs equal row counts per distinct row; subset mode needs
/// every expected row at least as often as it is expected. Retrieved values
/// are coerced to the kinds seen in `expected`.
pub fn compare_datasets(
    expected: &Dataset,
    retrieved: &Dataset,
    mode: CompareMode,
) -> LoadResult<ValidationReport> {
    let retrieved = retrieved.project(expected.columns())?.coerce_like(expected);

    let expected_counts = expected.row_counts();
    let retrieved_counts = retrieved.row_counts();

    let mut missing: Vec<(Vec<Value>, usize)> = expected_counts
        .iter()
        .filter_map(|(row, &count)| {
            let found = retrieved_counts.get(row).copied().unwrap_or(0);
            (found < count).then(|| (row.clone(), count - found))
        })
        .collect();
    let mut unexpected: Vec<(Vec<Value>, usize)> = retrieved_counts
        .iter()
        .filter_map(|(row, &count)| {
            let wanted = expected_counts.get(row).copied().unwrap_or(0);
            (count > wanted).then(|| (row.clone(), count - wanted))
        })
        .collect();
    missing.sort_by_cached_key(|(row, _)| row_key(row));
    unexpected.sort_by_cached_key(|(row, _)| row_key(row));

    Ok(ValidationReport {
        mode,
        columns: expected.columns().to_vec(),
        expected_rows: expected.row_count(),
        retrieved_rows: retrieved.row_count(),
        missing,
        unexpected,
    })
}

// stable ordering for report samples
fn row_key(row: &[Value]) -> String {
    row.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

/// Project `original` onto `sources`, naming the outputs `columns`.
///
/// One dataset column can feed several compare outputs.
fn reshape(original: &Dataset, sources: &[String], columns: &[String]) -> LoadResult<Dataset> {
    let indices = sources
        .iter()
        .map(|source| {
            original
                .column_index(source)
                .ok_or_else(|| fk_core::CoreError::DatasetColumnNotFound {
                    column: source.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let rows = original
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Ok(Dataset::new(columns.to_vec(), rows)?)
}

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;
