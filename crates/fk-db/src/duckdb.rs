//! DuckDB executor implementation

use crate::error::{DbError, DbResult};
use crate::traits::Executor;
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value as DuckValue, ValueRef};
use duckdb::{params_from_iter, Connection, Row};
use fk_core::{Dataset, RawColumn, RawForeignKey, RawSchema, RawTable, Value};
use fk_sql::{BulkAppendForm, BulkAppendQuery, DuckDbDialect, SqlDialect};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Rows per multi-row VALUES statement in a bulk append
const BULK_BATCH_ROWS: usize = 500;

const COLUMNS_QUERY: &str = "SELECT c.table_name, c.column_name, c.is_nullable, \
     c.column_default IS NOT NULL AS has_default \
     FROM information_schema.columns c \
     JOIN information_schema.tables t \
     ON c.table_catalog = t.table_catalog AND c.table_schema = t.table_schema AND c.table_name = t.table_name \
     WHERE t.table_type = 'BASE TABLE' AND c.table_schema = current_schema() \
     ORDER BY c.table_name, c.ordinal_position";

const PRIMARY_KEYS_QUERY: &str = "SELECT table_name, unnest(constraint_column_names) AS column_name \
     FROM duckdb_constraints() \
     WHERE schema_name = current_schema() AND constraint_type = 'PRIMARY KEY' \
     ORDER BY table_name";

const FOREIGN_KEYS_QUERY: &str = "SELECT table_name, constraint_index, \
     unnest(constraint_column_names) AS column_name, referenced_table, \
     unnest(referenced_column_names) AS referenced_column \
     FROM duckdb_constraints() \
     WHERE schema_name = current_schema() AND constraint_type = 'FOREIGN KEY' \
     ORDER BY table_name, constraint_index";

/// DuckDB executor
pub struct DuckDbExecutor {
    conn: Mutex<Connection>,
    dialect: DuckDbDialect,
}

impl DuckDbExecutor {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            dialect: DuckDbDialect::new(),
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute several `;`-separated statements without parameters
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    fn transaction_control(&self, sql: &str) -> DbResult<()> {
        log::debug!("{sql}");
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{sql} failed: {e}")))
    }

    fn table_columns(&self) -> DbResult<Vec<(String, RawColumn)>> {
        let data = self
            .query(COLUMNS_QUERY, &[])
            .map_err(|e| DbError::IntrospectionError(format!("reading columns: {e}")))?;
        data.rows()
            .iter()
            .map(|row| match row.as_slice() {
                [Value::Text(table), Value::Text(column), Value::Text(nullable), has_default] => {
                    Ok((
                        table.clone(),
                        RawColumn {
                            name: column.clone(),
                            nullable: nullable.eq_ignore_ascii_case("YES"),
                            has_default: *has_default == Value::Bool(true),
                        },
                    ))
                }
                other => Err(DbError::IntrospectionError(format!(
                    "unexpected column row: {other:?}"
                ))),
            })
            .collect()
    }

    fn primary_keys(&self) -> DbResult<BTreeMap<String, Vec<String>>> {
        let data = self
            .query(PRIMARY_KEYS_QUERY, &[])
            .map_err(|e| DbError::IntrospectionError(format!("reading primary keys: {e}")))?;
        let mut keys: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in data.rows() {
            if let [Value::Text(table), Value::Text(column)] = row.as_slice() {
                keys.entry(table.clone()).or_default().push(column.clone());
            }
        }
        Ok(keys)
    }

    fn foreign_keys(&self) -> DbResult<Vec<RawForeignKey>> {
        let data = self
            .query(FOREIGN_KEYS_QUERY, &[])
            .map_err(|e| DbError::IntrospectionError(format!("reading foreign keys: {e}")))?;

        // group by constraint so composite keys can be recognised
        let mut constraints: BTreeMap<(String, String), Vec<RawForeignKey>> = BTreeMap::new();
        for row in data.rows() {
            if let [Value::Text(table), index, Value::Text(column), Value::Text(parent), Value::Text(parent_column)] =
                row.as_slice()
            {
                constraints
                    .entry((table.clone(), index.to_string()))
                    .or_default()
                    .push(RawForeignKey {
                        table: table.clone(),
                        column: column.clone(),
                        references_table: parent.clone(),
                        references_column: parent_column.clone(),
                    });
            }
        }

        let mut foreign_keys = Vec::new();
        for ((table, _), mut parts) in constraints {
            if parts.len() == 1 {
                foreign_keys.append(&mut parts);
            } else {
                log::warn!(
                    "Skipping composite foreign key on '{table}' ({} columns)",
                    parts.len()
                );
            }
        }
        Ok(foreign_keys)
    }
}

/// Convert a loader value into a DuckDB parameter.
fn to_duckdb(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Int(n) => DuckValue::BigInt(*n),
        Value::Float(f) => DuckValue::Double(*f),
        Value::Text(s) => DuckValue::Text(s.clone()),
    }
}

/// Read a column of a result row.
///
/// Dates and times come back as ISO text, decimals as floats and integers
/// wider than 64 bits as text when they do not fit.
fn read_value(row: &Row<'_>, idx: usize) -> DbResult<Value> {
    let value = row.get_ref(idx).map_err(|e| DbError::UnsupportedType {
        column: idx,
        detail: e.to_string(),
    })?;
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Int(n.into()),
        ValueRef::SmallInt(n) => Value::Int(n.into()),
        ValueRef::Int(n) => Value::Int(n.into()),
        ValueRef::BigInt(n) => Value::Int(n),
        ValueRef::UTinyInt(n) => Value::Int(n.into()),
        ValueRef::USmallInt(n) => Value::Int(n.into()),
        ValueRef::UInt(n) => Value::Int(n.into()),
        ValueRef::UBigInt(n) => i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Int),
        ValueRef::HugeInt(n) => i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Int),
        ValueRef::Float(f) => Value::Float(f.into()),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>().map_or(Value::Text(text), Value::Float)
        }
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Date32(days) => Value::Text(render_date(idx, days)?),
        ValueRef::Timestamp(unit, ts) => Value::Text(render_timestamp(idx, to_micros(unit, ts))?),
        ValueRef::Time64(unit, t) => Value::Text(render_time(idx, to_micros(unit, t))?),
        _ => match row.get::<_, Option<String>>(idx) {
            Ok(Some(s)) => Value::Text(s),
            Ok(None) => Value::Null,
            Err(e) => {
                return Err(DbError::UnsupportedType {
                    column: idx,
                    detail: e.to_string(),
                })
            }
        },
    })
}

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn out_of_range(column: usize, what: &str, raw: i64) -> DbError {
    DbError::UnsupportedType {
        column,
        detail: format!("{what} {raw} is out of range"),
    }
}

fn render_date(column: usize, days: i32) -> DbResult<String> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| out_of_range(column, "date", days.into()))
}

fn render_timestamp(column: usize, micros: i64) -> DbResult<String> {
    DateTime::from_timestamp_micros(micros)
        .map(|ts| ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
        .ok_or_else(|| out_of_range(column, "timestamp", micros))
}

fn render_time(column: usize, micros: i64) -> DbResult<String> {
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok();
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok();
    secs.zip(nanos)
        .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
        .map(|t| t.format("%H:%M:%S%.f").to_string())
        .ok_or_else(|| out_of_range(column, "time", micros))
}

impl Executor for DuckDbExecutor {
    fn dialect(&self) -> &dyn SqlDialect {
        &self.dialect
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, params_from_iter(params.iter().map(to_duckdb)))
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    fn execute_many(&self, sql: &str, rows: &[Vec<Value>]) -> DbResult<usize> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        let mut affected = 0;
        for row in rows {
            affected += stmt
                .execute(params_from_iter(row.iter().map(to_duckdb)))
                .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        }
        Ok(affected)
    }

    fn query(&self, sql: &str, params: &[Value]) -> DbResult<Dataset> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;

        // DuckDB panics on column_count() before execution, so collect rows first
        let rows: Vec<Vec<Value>> = stmt
            .query_map(params_from_iter(params.iter().map(to_duckdb)), |row| {
                let count = row.as_ref().column_count();
                Ok((0..count)
                    .map(|i| read_value(row, i))
                    .collect::<DbResult<Vec<Value>>>())
            })
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::ExecutionError(format!("row error: {e}")))?
            .into_iter()
            .collect::<DbResult<Vec<_>>>()?;

        let columns: Vec<String> = (0..stmt.column_count())
            .map(|i| stmt.column_name(i).map_or("?".to_string(), |v| v.to_string()))
            .collect();

        Ok(Dataset::new(columns, rows)?)
    }

    fn begin(&self) -> DbResult<()> {
        self.transaction_control("BEGIN TRANSACTION")
    }

    fn commit(&self) -> DbResult<()> {
        self.transaction_control("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.transaction_control("ROLLBACK")
    }

    fn introspect_schema(&self) -> DbResult<RawSchema> {
        let mut tables: BTreeMap<String, RawTable> = BTreeMap::new();
        for (table, column) in self.table_columns()? {
            tables
                .entry(table.clone())
                .or_insert_with(|| RawTable {
                    name: table,
                    columns: Vec::new(),
                    primary_key: None,
                })
                .columns
                .push(column);
        }

        for (table, mut columns) in self.primary_keys()? {
            let Some(raw) = tables.get_mut(&table) else {
                continue;
            };
            if columns.len() == 1 {
                raw.primary_key = columns.pop();
            } else {
                log::warn!(
                    "Table '{table}' has a composite primary key, ids cannot be retrieved from it"
                );
            }
        }

        let schema = RawSchema {
            tables: tables.into_values().collect(),
            foreign_keys: self.foreign_keys()?,
        };
        log::debug!(
            "Introspected {} tables and {} foreign keys",
            schema.tables.len(),
            schema.foreign_keys.len()
        );
        Ok(schema)
    }

    fn bulk_append(&self, query: &BulkAppendQuery, rows: &[Vec<Value>]) -> DbResult<usize> {
        if query.form != BulkAppendForm::MultiRowValues {
            return Err(DbError::NotImplemented {
                backend: self.db_type().to_string(),
                feature: format!("{:?} bulk append", query.form),
            });
        }
        let width = query.db_columns.len();
        if let Some(row) = rows.iter().find(|r| r.len() != width) {
            return Err(DbError::ParameterCount {
                expected: width,
                found: row.len(),
            });
        }

        let group = format!("({})", vec!["?"; width].join(", "));
        let mut appended = 0;
        for batch in rows.chunks(BULK_BATCH_ROWS) {
            let sql = format!("{} {}", query.sql, vec![group.as_str(); batch.len()].join(", "));
            let params: Vec<Value> = batch.iter().flatten().cloned().collect();
            appended += self.execute(&sql, &params)?;
        }
        log::debug!("Appended {appended} rows to {}", query.table);
        Ok(appended)
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
