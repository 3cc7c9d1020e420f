//! Error types for fk-db

use fk_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Transaction control failed (D004)
    #[error("[D004] Transaction error: {0}")]
    TransactionError(String),

    /// Not implemented (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Schema introspection failed (D007)
    #[error("[D007] Schema introspection failed: {0}")]
    IntrospectionError(String),

    /// Row width does not match the statement (D008)
    #[error("[D008] Statement expects {expected} parameters per row, got {found}")]
    ParameterCount { expected: usize, found: usize },

    /// Result column type has no loader value (D009)
    #[error("[D009] Cannot read result column {column}: {detail}")]
    UnsupportedType { column: usize, detail: String },

    /// Result rows could not be assembled into a dataset
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DbError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Core(e) => e.kind(),
            _ => ErrorKind::Executor,
        }
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error has no structured variants for catalog errors
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
