//! Query synthesis: INSERT, RETRIEVE and COMPARE statements for a load
//!
//! Every statement is rendered on a single line with columns in the
//! mapping's order, so the same mapping and dialect always produce the same
//! text.

use crate::dialect::{BulkAppendForm, ConflictStrategy, SqlDialect};
use crate::error::{SqlError, SqlResult};
use fk_core::{ColumnMapping, MappingSource, SchemaGraph, Table, TableName};
use sqlparser::ast::Statement;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// A parameterized row-by-row INSERT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertQuery {
    pub table: TableName,
    pub sql: String,
    /// Dataset columns bound to the placeholders, in order
    pub dataset_columns: Vec<String>,
}

/// Header of a bulk append; rows are supplied separately.
///
/// Append-only: unlike [`InsertQuery`] it never carries conflict handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAppendQuery {
    pub table: TableName,
    pub sql: String,
    pub form: BulkAppendForm,
    /// Db columns in row order
    pub db_columns: Vec<String>,
    /// Dataset columns supplying each db column
    pub dataset_columns: Vec<String>,
}

/// A SELECT reading a table's primary keys next to its mapped columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveQuery {
    pub table: TableName,
    pub sql: String,
    pub key_alias: String,
    /// Output columns other than the key, named as in the dataset
    pub dataset_columns: Vec<String>,
}

/// A SELECT reading loaded data back in dataset shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareQuery {
    pub sql: String,
    /// Output column names in select order
    pub columns: Vec<String>,
    /// Dataset column behind each output column
    pub sources: Vec<String>,
}

/// Renders load statements for one dialect.
pub struct QuerySynthesizer<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> QuerySynthesizer<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect
    }

    /// `INSERT INTO <table> (<db_col>, ...) VALUES (<placeholder>, ...)`
    pub fn insert(
        &self,
        mapping: &ColumnMapping,
        conflict: ConflictStrategy,
    ) -> SqlResult<InsertQuery> {
        self.require_columns(mapping, "insert")?;
        let style = self.dialect.placeholder_style();

        let columns = self.column_list(mapping);
        let placeholders = mapping
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| style.render(&c.dataset_column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        let table = self.dialect.ident(&mapping.table);
        let sql = match conflict {
            ConflictStrategy::Error => {
                format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
            }
            ConflictStrategy::OrIgnore => {
                format!("INSERT OR IGNORE INTO {table} ({columns}) VALUES ({placeholders})")
            }
            ConflictStrategy::DoNothing => format!(
                "INSERT INTO {table} ({columns}) VALUES ({placeholders}) ON CONFLICT DO NOTHING"
            ),
        };
        log::debug!("Insert query for {}: {sql}", mapping.table);

        Ok(InsertQuery {
            table: mapping.table.clone(),
            sql,
            dataset_columns: mapping
                .dataset_columns()
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }

    /// Bulk append header for the dialect's bulk path.
    pub fn bulk_append(&self, mapping: &ColumnMapping) -> SqlResult<BulkAppendQuery> {
        self.require_columns(mapping, "append")?;
        let form = self.dialect.bulk_append_form();
        let table = self.dialect.ident(&mapping.table);
        let columns = self.column_list(mapping);
        let sql = match form {
            BulkAppendForm::MultiRowValues => format!("INSERT INTO {table} ({columns}) VALUES"),
            BulkAppendForm::CopyFromStdin => format!("COPY {table} ({columns}) FROM STDIN"),
        };
        log::debug!("Bulk append for {}: {sql}", mapping.table);

        Ok(BulkAppendQuery {
            table: mapping.table.clone(),
            sql,
            form,
            db_columns: mapping.db_columns().into_iter().map(String::from).collect(),
            dataset_columns: mapping
                .dataset_columns()
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }

    /// `SELECT <pk> AS <alias>, <db_col> AS <dataset_col>, ... FROM <table>`
    ///
    /// The alias defaults to `<table>_id`.
    pub fn retrieve(
        &self,
        table: &Table,
        mapping: &ColumnMapping,
        alias: Option<&str>,
    ) -> SqlResult<RetrieveQuery> {
        let Some(primary_key) = &table.primary_key else {
            return Err(fk_core::CoreError::NoPrimaryKey {
                table: table.name.to_string(),
            }
            .into());
        };
        self.require_columns(mapping, "retrieve")?;
        let key_alias = alias
            .map(String::from)
            .unwrap_or_else(|| format!("{}_id", table.name));

        let mut select = vec![format!(
            "{} AS {}",
            self.dialect.ident(primary_key),
            self.dialect.ident(&key_alias)
        )];
        select.extend(mapping.columns().iter().map(|c| {
            format!(
                "{} AS {}",
                self.dialect.ident(&c.db_column),
                self.dialect.ident(&c.dataset_column)
            )
        }));
        let sql = format!(
            "SELECT {} FROM {}",
            select.join(", "),
            self.dialect.ident(&table.name)
        );
        log::debug!("Retrieve query for {}: {sql}", table.name);

        Ok(RetrieveQuery {
            table: table.name.clone(),
            sql,
            key_alias,
            dataset_columns: mapping
                .dataset_columns()
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }

    /// SELECT joining every table in `mappings` back into dataset shape.
    ///
    /// Joins are found by a breadth-first walk over the foreign keys among
    /// the mapped tables, starting at `anchor` (default: the first mapping)
    /// and visiting neighbours by name. A table joins on every foreign key
    /// linking it to tables already joined. Only dataset-sourced columns are
    /// selected; a repeated output name is prefixed with its table.
    pub fn compare(
        &self,
        schema: &SchemaGraph,
        mappings: &[&ColumnMapping],
        anchor: Option<&str>,
        where_clause: Option<&str>,
    ) -> SqlResult<CompareQuery> {
        let touched: BTreeSet<TableName> = mappings.iter().map(|m| m.table.clone()).collect();
        let anchor = match anchor {
            Some(name) => touched
                .get(name)
                .ok_or_else(|| SqlError::InvalidAnchor {
                    anchor: name.to_string(),
                    tables: touched
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })?,
            None => match mappings.first() {
                Some(first) => &first.table,
                None => {
                    return Err(SqlError::NoColumns {
                        operation: "compare".to_string(),
                        table: String::new(),
                    })
                }
            },
        };
        schema.ensure_joinable(&touched)?;

        let dataset_names: HashSet<&str> = mappings
            .iter()
            .flat_map(|m| m.columns())
            .filter(|c| c.source == MappingSource::Dataset)
            .map(|c| c.dataset_column.as_str())
            .collect();
        let mut used = HashSet::new();
        let mut select = Vec::new();
        let mut columns = Vec::new();
        let mut sources = Vec::new();
        for mapping in mappings {
            for column in mapping.columns() {
                if column.source != MappingSource::Dataset {
                    continue;
                }
                let alias = if used.contains(column.dataset_column.as_str()) {
                    unique_alias(
                        &format!("{}_{}", mapping.table, column.dataset_column),
                        &used,
                        &dataset_names,
                    )
                } else {
                    column.dataset_column.clone()
                };
                used.insert(alias.clone());
                select.push(format!(
                    "{}.{} AS {}",
                    self.dialect.ident(&mapping.table),
                    self.dialect.ident(&column.db_column),
                    self.dialect.ident(&alias)
                ));
                columns.push(alias);
                sources.push(column.dataset_column.clone());
            }
        }
        if select.is_empty() {
            return Err(SqlError::NoColumns {
                operation: "compare".to_string(),
                table: anchor.to_string(),
            });
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            select.join(", "),
            self.dialect.ident(anchor)
        );
        for join in self.join_clauses(schema, &touched, anchor) {
            sql.push(' ');
            sql.push_str(&join);
        }
        if let Some(fragment) = where_clause.map(str::trim).filter(|w| !w.is_empty()) {
            let starts_with_where = fragment
                .get(..6)
                .is_some_and(|head| head.eq_ignore_ascii_case("where "));
            if starts_with_where {
                sql.push(' ');
            } else {
                sql.push_str(" WHERE ");
            }
            sql.push_str(fragment);
        }
        log::debug!("Compare query: {sql}");

        Ok(CompareQuery {
            sql,
            columns,
            sources,
        })
    }

    fn join_clauses(
        &self,
        schema: &SchemaGraph,
        touched: &BTreeSet<TableName>,
        anchor: &TableName,
    ) -> Vec<String> {
        let edges = schema.edges_within(touched);
        let mut joined: HashSet<&TableName> = HashSet::from([anchor]);
        let mut queue = VecDeque::from([anchor]);
        let mut clauses = Vec::new();

        while let Some(current) = queue.pop_front() {
            let neighbours: BTreeSet<&TableName> = edges
                .iter()
                .filter_map(|e| {
                    if &e.child == current {
                        Some(&e.parent)
                    } else if &e.parent == current {
                        Some(&e.child)
                    } else {
                        None
                    }
                })
                .collect();

            for next in neighbours {
                if joined.contains(next) {
                    continue;
                }
                let conditions: Vec<String> = edges
                    .iter()
                    .filter(|e| {
                        (&e.child == next && joined.contains(&e.parent))
                            || (&e.parent == next && joined.contains(&e.child))
                    })
                    .map(|e| {
                        format!(
                            "{}.{} = {}.{}",
                            self.dialect.ident(&e.child),
                            self.dialect.ident(&e.column),
                            self.dialect.ident(&e.parent),
                            self.dialect.ident(&e.referenced_key)
                        )
                    })
                    .collect();
                clauses.push(format!(
                    "JOIN {} ON {}",
                    self.dialect.ident(next),
                    conditions.join(" AND ")
                ));
                joined.insert(next);
                queue.push_back(next);
            }
        }
        clauses
    }

    fn column_list(&self, mapping: &ColumnMapping) -> String {
        mapping
            .columns()
            .iter()
            .map(|c| self.dialect.ident(&c.db_column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn require_columns(&self, mapping: &ColumnMapping, operation: &str) -> SqlResult<()> {
        if mapping.is_empty() {
            return Err(SqlError::NoColumns {
                operation: operation.to_string(),
                table: mapping.table.to_string(),
            });
        }
        Ok(())
    }
}

/// `base`, or `base_2`, `base_3`, ... when taken by an output column or a dataset column.
fn unique_alias(base: &str, used: &HashSet<String>, dataset_names: &HashSet<&str>) -> String {
    let free = |name: &str| !used.contains(name) && !dataset_names.contains(name);
    if free(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|name| free(name))
        .unwrap_or_else(|| base.to_string())
}

/// Check a caller-supplied compare query is exactly one SELECT.
pub fn validate_custom_query(dialect: &dyn SqlDialect, sql: &str) -> SqlResult<()> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(SqlError::EmptySql);
    }
    let statements = dialect.parse(sql)?;
    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        [other] => {
            let rendered = other.to_string();
            let keyword = rendered.split_whitespace().next().unwrap_or_default();
            Err(SqlError::UnsupportedStatement(keyword.to_uppercase()))
        }
        _ => Err(SqlError::ValidationError(format!(
            "expected a single SELECT statement, found {}",
            statements.len()
        ))),
    }
}

#[cfg(test)]
#[path = "synth_test.rs"]
mod tests;
