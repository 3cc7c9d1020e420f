//! SQL dialect abstraction

use fk_core::sql_utils::{is_plain_ident, quote_ident};
use fk_core::OnConflict;
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    Dialect, DuckDbDialect as SqlParserDuckDb, PostgreSqlDialect as SqlParserPostgres,
    SQLiteDialect as SqlParserSqlite,
};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// Words reserved by the PostgreSQL grammar and DuckDB's extension of it.
/// As bare table or column names they break the statement.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC",
    "AUTHORIZATION", "BINARY", "BOTH", "CASE", "CAST", "CHECK", "COLLATE", "COLLATION",
    "COLUMN", "CONCURRENTLY", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_CATALOG",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_SCHEMA", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "CURRENT_USER", "DEFAULT", "DEFERRABLE", "DESC", "DESCRIBE", "DISTINCT", "DO", "ELSE",
    "END", "EXCEPT", "FALSE", "FETCH", "FOR", "FOREIGN", "FREEZE", "FROM", "FULL", "GRANT",
    "GROUP", "HAVING", "ILIKE", "IN", "INITIALLY", "INNER", "INTERSECT", "INTO", "IS",
    "ISNULL", "JOIN", "LATERAL", "LEADING", "LEFT", "LIKE", "LIMIT", "LOCALTIME",
    "LOCALTIMESTAMP", "NATURAL", "NOT", "NOTNULL", "NULL", "OFFSET", "ON", "ONLY", "OR",
    "ORDER", "OUTER", "OVERLAPS", "PIVOT", "PLACING", "PRIMARY", "QUALIFY", "REFERENCES",
    "RETURNING", "RIGHT", "SELECT", "SESSION_USER", "SHOW", "SIMILAR", "SOME", "SUMMARIZE",
    "SYMMETRIC", "SYSTEM_USER", "TABLE", "TABLESAMPLE", "THEN", "TO", "TRAILING", "TRUE",
    "UNION", "UNIQUE", "UNPIVOT", "USER", "USING", "VARIADIC", "VERBOSE", "WHEN", "WHERE",
    "WINDOW", "WITH",
];

/// How bound parameters are written in statement text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    QuestionMark,
    /// `$1`, `$2`, ...
    Numbered,
    /// `:column`
    Colon,
    /// `%(column)s`
    Pyformat,
}

impl PlaceholderStyle {
    /// Placeholder for `column` at 1-based `position`.
    pub fn render(&self, column: &str, position: usize) -> String {
        match self {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${position}"),
            PlaceholderStyle::Colon => format!(":{column}"),
            PlaceholderStyle::Pyformat => format!("%({column})s"),
        }
    }
}

/// Conflict handling rendered into the row-by-row INSERT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictStrategy {
    /// Plain INSERT; constraint violations fail the statement
    #[default]
    Error,
    /// `INSERT OR IGNORE INTO ...`
    OrIgnore,
    /// `INSERT INTO ... ON CONFLICT DO NOTHING`
    DoNothing,
}

/// Statement shape of a dialect's bulk path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAppendForm {
    /// `INSERT INTO t (cols) VALUES` followed by batched row groups
    MultiRowValues,
    /// `COPY t (cols) FROM STDIN` with rows streamed by the driver
    CopyFromStdin,
}

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line,
                column,
            }
        })
    }

    /// Whether `word` cannot appear as a bare identifier
    fn is_reserved(&self, word: &str) -> bool {
        RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word))
    }

    /// Render an identifier, quoting it when it is not a plain name or is
    /// a reserved word
    fn ident(&self, name: &str) -> String {
        if is_plain_ident(name) && !self.is_reserved(name) {
            name.to_string()
        } else {
            quote_ident(name)
        }
    }

    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Placeholder syntax the driver for this dialect binds
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// What "skip conflicting rows" looks like in this dialect
    fn ignore_conflicts(&self) -> ConflictStrategy;

    /// Statement shape of the bulk path
    fn bulk_append_form(&self) -> BulkAppendForm;

    /// Conflict strategy for the configured option
    fn conflict_strategy(&self, on_conflict: OnConflict) -> ConflictStrategy {
        match on_conflict {
            OnConflict::Error => ConflictStrategy::Error,
            OnConflict::Ignore => self.ignore_conflicts(),
        }
    }
}

/// Extract "Line: N, Column: M" from a sqlparser error message.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx]
        .trim()
        .parse::<usize>()
    else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (line, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let column = msg[col_start..col_end].trim().parse::<usize>().unwrap_or(0);
    (line, column)
}

/// DuckDB SQL dialect
pub struct DuckDbDialect {
    dialect: SqlParserDuckDb,
}

impl DuckDbDialect {
    pub fn new() -> Self {
        Self {
            dialect: SqlParserDuckDb {},
        }
    }
}

impl Default for DuckDbDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for DuckDbDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn ignore_conflicts(&self) -> ConflictStrategy {
        ConflictStrategy::OrIgnore
    }

    fn bulk_append_form(&self) -> BulkAppendForm {
        BulkAppendForm::MultiRowValues
    }
}

/// SQLite SQL dialect, named `:column` parameters
pub struct SqliteDialect {
    dialect: SqlParserSqlite,
}

impl SqliteDialect {
    pub fn new() -> Self {
        Self {
            dialect: SqlParserSqlite {},
        }
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for SqliteDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Colon
    }

    fn ignore_conflicts(&self) -> ConflictStrategy {
        ConflictStrategy::OrIgnore
    }

    fn bulk_append_form(&self) -> BulkAppendForm {
        BulkAppendForm::MultiRowValues
    }
}

/// PostgreSQL SQL dialect, `%(column)s` parameters and `COPY` bulk loads
pub struct PostgresDialect {
    dialect: SqlParserPostgres,
}

impl PostgresDialect {
    pub fn new() -> Self {
        Self {
            dialect: SqlParserPostgres {},
        }
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for PostgresDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Pyformat
    }

    fn ignore_conflicts(&self) -> ConflictStrategy {
        ConflictStrategy::DoNothing
    }

    fn bulk_append_form(&self) -> BulkAppendForm {
        BulkAppendForm::CopyFromStdin
    }
}

/// Create a dialect from its name
pub fn dialect_from_name(name: &str) -> SqlResult<Box<dyn SqlDialect>> {
    match name.to_lowercase().as_str() {
        "duckdb" => Ok(Box::new(DuckDbDialect::new())),
        "sqlite" => Ok(Box::new(SqliteDialect::new())),
        "postgres" | "postgresql" => Ok(Box::new(PostgresDialect::new())),
        _ => Err(SqlError::UnknownDialect(name.to_string())),
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
