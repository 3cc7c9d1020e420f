//! Error types for fk-sql

use fk_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Query synthesis and SQL checking errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Unsupported SQL statement (S003)
    #[error("[S003] Unsupported SQL statement type: {0}")]
    UnsupportedStatement(String),

    /// Compare query is not a single SELECT (S004)
    #[error("[S004] SQL validation failed: {0}")]
    ValidationError(String),

    /// Unknown dialect name (S005)
    #[error("[S005] Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// Compare anchor is not one of the loaded tables (S006)
    #[error("[S006] Compare anchor '{anchor}' is not one of the loaded tables: {tables}")]
    InvalidAnchor { anchor: String, tables: String },

    /// A statement would have no columns (S007)
    #[error("[S007] No columns to {operation} for table '{table}'")]
    NoColumns { operation: String, table: String },

    /// Schema or matching error raised while building a statement
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SqlError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SqlError::ParseError { .. }
            | SqlError::EmptySql
            | SqlError::UnsupportedStatement(_)
            | SqlError::ValidationError(_)
            | SqlError::UnknownDialect(_)
            | SqlError::InvalidAnchor { .. } => ErrorKind::Config,
            SqlError::NoColumns { .. } => ErrorKind::MissingColumn,
            SqlError::Core(e) => e.kind(),
        }
    }
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
