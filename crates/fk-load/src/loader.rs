//! Load orchestration
//!
//! A [`Loader`] owns an executor and the schema graph read from it. A full
//! [`load`](Loader::load) resolves and renders every statement first, then
//! runs insert, retrieve and merge per table in dependency order inside one
//! transaction, validates, and commits. Any failure rolls the whole call
//! back.

use crate::error::{LoadError, LoadResult};
use crate::merge::merge_keys;
use crate::prepared::{PreparedLoad, PreparedStep, WriteStatement};
use crate::validator::{CompareMode, CompareStatement, ValidationReport, Validator};
use fk_core::{
    ColumnMapping, ColumnMatcher, CoreError, Dataset, InsertMode, LoadOptions, LoadPlan,
    SchemaGraph, TableName, Value,
};
use fk_db::{in_transaction, Executor};
use fk_sql::{validate_custom_query, QuerySynthesizer};
use std::collections::HashSet;

/// Result of a committed load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// The input with retrieved keys merged in
    pub data: Dataset,
    pub plan: LoadPlan,
    /// Rows written per table, in load order
    pub inserted: Vec<(TableName, usize)>,
    /// Absent when validation was disabled
    pub validation: Option<ValidationReport>,
}

/// Loads datasets into the database behind an executor.
pub struct Loader<E: Executor> {
    executor: E,
    schema: SchemaGraph,
}

impl<E: Executor> Loader<E> {
    /// Introspect the database and build its schema graph.
    pub fn new(executor: E) -> LoadResult<Self> {
        let schema = read_schema(&executor)?;
        Ok(Self { executor, schema })
    }

    /// Re-read the schema after it changed outside this loader.
    pub fn refresh_schema(&mut self) -> LoadResult<()> {
        self.schema = read_schema(&self.executor)?;
        Ok(())
    }

    pub fn schema(&self) -> &SchemaGraph {
        &self.schema
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Resolve the plan and render every statement a load would run,
    /// without touching the database.
    pub fn plan(&self, columns: &[String], options: &LoadOptions) -> LoadResult<PreparedLoad> {
        let plan = self.build_plan(columns, options)?;
        let synth = QuerySynthesizer::new(self.executor.dialect());

        let mut steps = Vec::with_capacity(plan.len());
        for (i, step) in plan.steps().iter().enumerate() {
            let write = self.write_statement(&synth, &step.mapping, options)?;
            let retrieve = match &step.key_alias {
                Some(alias) => Some(synth.retrieve(
                    self.schema.table(&step.table)?,
                    &step.mapping,
                    Some(alias.as_str()),
                )?),
                None => None,
            };

            let needed_later: HashSet<&str> = plan.steps()[i + 1..]
                .iter()
                .flat_map(|later| later.mapping.dataset_columns())
                .collect();
            let replaced_columns = if options.replace && retrieve.is_some() {
                step.mapping
                    .data_dataset_columns()
                    .into_iter()
                    .filter(|c| !needed_later.contains(c))
                    .map(String::from)
                    .collect()
            } else {
                Vec::new()
            };

            steps.push(PreparedStep {
                table: step.table.clone(),
                write,
                retrieve,
                replaced_columns,
            });
        }

        let compare = if options.validate {
            Some(self.compare_statement(&plan, options)?)
        } else {
            None
        };

        Ok(PreparedLoad {
            plan,
            steps,
            compare,
        })
    }

    /// Insert the distinct rows of `data` into one table.
    ///
    /// Foreign keys must be present in `data` under their column names or
    /// through overrides. Transaction scope is left to the caller.
    pub fn insert(&self, data: &Dataset, table: &str, options: &LoadOptions) -> LoadResult<usize> {
        let mapping = self.table_mapping(data, table, options)?;
        let synth = QuerySynthesizer::new(self.executor.dialect());
        let write = self.write_statement(&synth, &mapping, options)?;
        write_rows(&self.executor, &write, data)
    }

    /// Fetch the primary keys of the rows of `data` from one table and merge
    /// them in as `alias` (default `<table>_id`).
    pub fn retrieve_ids(
        &self,
        data: &Dataset,
        table: &str,
        alias: Option<&str>,
        options: &LoadOptions,
    ) -> LoadResult<Dataset> {
        let mapping = self.table_mapping(data, table, options)?;
        let synth = QuerySynthesizer::new(self.executor.dialect());
        let query = synth.retrieve(self.schema.table(table)?, &mapping, alias)?;

        let retrieved = self.executor.query(&query.sql, &[])?;
        let merged = merge_keys(data, retrieved, &query, options.allow_duplication)?;
        if options.replace {
            Ok(merged.drop_columns(&mapping.data_dataset_columns()))
        } else {
            Ok(merged)
        }
    }

    /// [`insert`](Self::insert) followed by [`retrieve_ids`](Self::retrieve_ids).
    pub fn insert_and_retrieve_ids(
        &self,
        data: &Dataset,
        table: &str,
        alias: Option<&str>,
        options: &LoadOptions,
    ) -> LoadResult<Dataset> {
        self.insert(data, table, options)?;
        self.retrieve_ids(data, table, alias, options)
    }

    /// Check that `data` is stored, without writing anything.
    pub fn compare(&self, data: &Dataset, options: &LoadOptions) -> LoadResult<ValidationReport> {
        let plan = self.build_plan(data.columns(), options)?;
        let statement = self.compare_statement(&plan, options)?;
        Validator::new(&self.executor).check_loaded(
            &statement,
            data,
            CompareMode::from_exact(options.exact),
        )
    }

    /// Load `data` into every table it touches, all or nothing.
    pub fn load(&self, data: &Dataset, options: &LoadOptions) -> LoadResult<LoadOutcome> {
        let prepared = self.plan(data.columns(), options)?;
        let mode = CompareMode::from_exact(options.exact);
        log::info!(
            "Loading {} rows into {}",
            data.row_count(),
            prepared
                .plan
                .tables()
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let (data, inserted, validation) = in_transaction(&self.executor, |executor| {
            let mut working = data.clone();
            let mut inserted = Vec::with_capacity(prepared.steps.len());

            for step in &prepared.steps {
                let written = write_rows(executor, &step.write, &working)?;
                inserted.push((step.table.clone(), written));

                if let Some(retrieve) = &step.retrieve {
                    let retrieved = executor.query(&retrieve.sql, &[])?;
                    working = merge_keys(&working, retrieved, retrieve, options.allow_duplication)?;
                    if !step.replaced_columns.is_empty() {
                        working = working.drop_columns(&step.replaced_columns);
                    }
                }
            }

            let validation = match &prepared.compare {
                Some(statement) => Some(Validator::new(executor).check_loaded(statement, data, mode)?),
                None => None,
            };
            Ok::<_, LoadError>((working, inserted, validation))
        })?;

        log::info!("Load committed");
        Ok(LoadOutcome {
            data,
            plan: prepared.plan,
            inserted,
            validation,
        })
    }

    fn build_plan(&self, columns: &[String], options: &LoadOptions) -> LoadResult<LoadPlan> {
        self.schema.ensure_not_empty()?;
        options.validate()?;
        let overrides = options.column_overrides()?;
        let plan = LoadPlan::build(&self.schema, columns, &overrides, options.targets())?;
        log::debug!("Load plan:\n{plan}");
        Ok(plan)
    }

    fn table_mapping(
        &self,
        data: &Dataset,
        table: &str,
        options: &LoadOptions,
    ) -> LoadResult<ColumnMapping> {
        self.schema.ensure_not_empty()?;
        let overrides = options.column_overrides()?;
        let matcher = ColumnMatcher::new(&self.schema, &overrides);
        Ok(matcher.resolve_table(data.columns(), table)?)
    }

    fn write_statement(
        &self,
        synth: &QuerySynthesizer<'_>,
        mapping: &ColumnMapping,
        options: &LoadOptions,
    ) -> LoadResult<WriteStatement> {
        Ok(match options.insert_mode {
            InsertMode::RowByRow => {
                let conflict = synth.dialect().conflict_strategy(options.on_conflict);
                WriteStatement::Insert(synth.insert(mapping, conflict)?)
            }
            InsertMode::BulkAppend => WriteStatement::BulkAppend(synth.bulk_append(mapping)?),
        })
    }

    fn compare_statement(
        &self,
        plan: &LoadPlan,
        options: &LoadOptions,
    ) -> LoadResult<CompareStatement> {
        if let Some(sql) = &options.compare_query {
            validate_custom_query(self.executor.dialect(), sql)?;
            return Ok(CompareStatement::Custom(sql.trim().to_string()));
        }
        let mappings: Vec<&ColumnMapping> = plan.steps().iter().map(|s| &s.mapping).collect();
        let query = QuerySynthesizer::new(self.executor.dialect()).compare(
            &self.schema,
            &mappings,
            options.anchor.as_deref(),
            options.where_clause.as_deref(),
        )?;
        Ok(CompareStatement::Synthesized(query))
    }
}

fn read_schema<E: Executor + ?Sized>(executor: &E) -> LoadResult<SchemaGraph> {
    let raw = executor.introspect_schema()?;
    let schema = SchemaGraph::build(raw)?;
    log::info!(
        "Read {} tables from {}",
        schema.table_names().count(),
        executor.db_type()
    );
    Ok(schema)
}

/// Write the distinct projections of `working` with `write`.
fn write_rows<E: Executor + ?Sized>(
    executor: &E,
    write: &WriteStatement,
    working: &Dataset,
) -> LoadResult<usize> {
    let indices = write
        .dataset_columns()
        .iter()
        .map(|c| {
            working
                .column_index(c)
                .ok_or_else(|| CoreError::DatasetColumnNotFound { column: c.clone() })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    let rows: Vec<Vec<Value>> = working
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect::<Vec<_>>())
        .filter(|row| seen.insert(row.clone()))
        .collect();

    let written = match write {
        WriteStatement::Insert(query) => executor.execute_many(&query.sql, &rows)?,
        WriteStatement::BulkAppend(query) => executor.bulk_append(query, &rows)?,
    };
    log::debug!("Wrote {} distinct rows: {}", rows.len(), write.sql());
    Ok(written)
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
