//! Error types for fk-load

use crate::validator::ValidationReport;
use fk_core::{CoreError, ErrorKind};
use fk_db::DbError;
use fk_sql::SqlError;
use thiserror::Error;

/// Load orchestration errors
#[derive(Error, Debug)]
pub enum LoadError {
    /// Merging retrieved keys multiplied rows (L001)
    #[error("[L001] Merging ids of '{table}' turned {before} rows into {after}. The table holds several rows with the same values; enable allow_duplication to accept this")]
    Duplication {
        table: String,
        before: usize,
        after: usize,
    },

    /// Rows left without a key after a merge (L002)
    #[error("[L002] {rows} rows did not receive a '{alias}' id from table '{table}'")]
    MissingKeys {
        table: String,
        alias: String,
        rows: usize,
    },

    /// Stored data does not match the input (L003)
    #[error("[L003] Validation failed: {0}")]
    Validation(Box<ValidationReport>),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Sql(#[from] SqlError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl LoadError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Duplication { .. } => ErrorKind::Duplication,
            LoadError::MissingKeys { .. } => ErrorKind::Data,
            LoadError::Validation(_) => ErrorKind::Validation,
            LoadError::Core(e) => e.kind(),
            LoadError::Sql(e) => e.kind(),
            LoadError::Db(e) => e.kind(),
        }
    }
}

/// Result type alias for LoadError
pub type LoadResult<T> = Result<T, LoadError>;
