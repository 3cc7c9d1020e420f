//! Executor trait definition

use crate::error::{DbError, DbResult};
use fk_core::{Dataset, RawSchema, Value};
use fk_sql::{BulkAppendQuery, SqlDialect};

/// Database executor driven by the loader.
///
/// Calls are synchronous and issued one at a time from a single thread.
/// Transaction scope is explicit: the loader brackets a full load with
/// [`begin`](Self::begin) and [`commit`](Self::commit) or
/// [`rollback`](Self::rollback).
pub trait Executor: Send + Sync {
    /// Dialect statements for this executor are rendered in
    fn dialect(&self) -> &dyn SqlDialect;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Execute a statement with positional parameters, returns affected rows
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize>;

    /// Execute one statement per parameter row, returns affected rows
    fn execute_many(&self, sql: &str, rows: &[Vec<Value>]) -> DbResult<usize> {
        let mut affected = 0;
        for row in rows {
            affected += self.execute(sql, row)?;
        }
        Ok(affected)
    }

    /// Run a query and collect its result
    fn query(&self, sql: &str, params: &[Value]) -> DbResult<Dataset>;

    /// Start a transaction
    fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    fn rollback(&self) -> DbResult<()>;

    /// Read tables, columns, primary keys and foreign keys
    fn introspect_schema(&self) -> DbResult<RawSchema>;

    /// Append rows through the backend's bulk path.
    ///
    /// Append-only: conflict handling does not apply.
    fn bulk_append(&self, query: &BulkAppendQuery, rows: &[Vec<Value>]) -> DbResult<usize> {
        let _ = (query, rows);
        Err(DbError::NotImplemented {
            backend: self.db_type().to_string(),
            feature: "bulk append".to_string(),
        })
    }
}

/// Run `body` inside a transaction on `executor`.
///
/// Commits when `body` succeeds and rolls back when it fails; a failed
/// commit is rolled back too. The error from `body` is returned unchanged.
pub fn in_transaction<E, T, Err, F>(executor: &E, body: F) -> Result<T, Err>
where
    E: Executor + ?Sized,
    Err: From<DbError>,
    F: FnOnce(&E) -> Result<T, Err>,
{
    executor.begin()?;

    let result = body(executor);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = executor.commit() {
                if let Err(e) = executor.rollback() {
                    log::warn!("Rollback after failed commit also failed: {e}");
                }
                return Err(DbError::TransactionError(format!("COMMIT failed: {commit_err}")).into());
            }
        }
        Err(_) => {
            log::warn!("Rolling back transaction");
            if let Err(e) = executor.rollback() {
                log::warn!("Rollback failed: {e}");
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingExecutor;
    use fk_core::RawSchema;

    #[test]
    fn test_in_transaction_commits_on_success() {
        let executor = RecordingExecutor::new(RawSchema::default());
        let result: DbResult<usize> = in_transaction(&executor, |e| {
            e.execute("INSERT INTO t (a) VALUES (?)", &[Value::Int(1)])
        });
        assert!(result.is_ok());
        assert_eq!(
            executor.statements(),
            vec!["BEGIN TRANSACTION", "INSERT INTO t (a) VALUES (?)", "COMMIT"]
        );
    }

    #[test]
    fn test_in_transaction_rolls_back_on_error() {
        let executor = RecordingExecutor::new(RawSchema::default());
        let result: DbResult<()> = in_transaction(&executor, |e| {
            e.execute("INSERT INTO t (a) VALUES (?)", &[Value::Int(1)])?;
            Err(DbError::ExecutionError("boom".to_string()))
        });
        assert!(matches!(result, Err(DbError::ExecutionError(ref m)) if m == "boom"));
        assert_eq!(
            executor.statements(),
            vec!["BEGIN TRANSACTION", "INSERT INTO t (a) VALUES (?)", "ROLLBACK"]
        );
    }

    #[test]
    fn test_default_bulk_append_not_implemented() {
        let executor = RecordingExecutor::new(RawSchema::default());
        let query = BulkAppendQuery {
            table: fk_core::TableName::new("t"),
            sql: "INSERT INTO t (a) VALUES".to_string(),
            form: fk_sql::BulkAppendForm::MultiRowValues,
            db_columns: vec!["a".to_string()],
            dataset_columns: vec!["a".to_string()],
        };
        assert!(matches!(
            executor.bulk_append(&query, &[]),
            Err(DbError::NotImplemented { .. })
        ));
    }
}
