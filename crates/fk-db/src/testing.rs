//! Test doubles for code driving an [`Executor`].

use crate::error::{DbError, DbResult};
use crate::traits::Executor;
use fk_core::{Dataset, RawSchema, Value};
use fk_sql::{DuckDbDialect, SqlDialect};
use std::sync::Mutex;

/// Executor that records every statement and touches no database.
///
/// Introspection returns the schema it was built with; queries return an
/// empty dataset with no columns.
pub struct RecordingExecutor {
    schema: RawSchema,
    dialect: DuckDbDialect,
    statements: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn new(schema: RawSchema) -> Self {
        Self {
            schema,
            dialect: DuckDbDialect::new(),
            statements: Mutex::new(Vec::new()),
        }
    }

    /// Statements seen so far, transaction control included
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &str) -> DbResult<()> {
        self.statements
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .push(sql.to_string());
        Ok(())
    }
}

impl Executor for RecordingExecutor {
    fn dialect(&self) -> &dyn SqlDialect {
        &self.dialect
    }

    fn db_type(&self) -> &'static str {
        "recording"
    }

    fn execute(&self, sql: &str, _params: &[Value]) -> DbResult<usize> {
        self.record(sql)?;
        Ok(0)
    }

    fn query(&self, sql: &str, _params: &[Value]) -> DbResult<Dataset> {
        self.record(sql)?;
        Ok(Dataset::empty(Vec::new())?)
    }

    fn begin(&self) -> DbResult<()> {
        self.record("BEGIN TRANSACTION")
    }

    fn commit(&self) -> DbResult<()> {
        self.record("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.record("ROLLBACK")
    }

    fn introspect_schema(&self) -> DbResult<RawSchema> {
        Ok(self.schema.clone())
    }
}
