//! Shared utilities for CLI commands

use anyhow::{bail, Context, Result};
use fk_core::{Dataset, LoadOptions, Value};
use fk_db::DuckDbExecutor;
use fk_load::Loader;
use std::collections::BTreeMap;
use std::path::Path;

use crate::cli::{GlobalArgs, LoadOptionArgs};

/// Open the database named by `--db`, refusing to create a new file.
pub(crate) fn open_database(global: &GlobalArgs) -> Result<DuckDbExecutor> {
    let Some(path) = &global.db else {
        bail!("No database given, pass --db <file> or set FKLOAD_DB");
    };
    if !path.exists() {
        bail!("Database file not found: {}", path.display());
    }
    DuckDbExecutor::from_path(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))
}

/// Open the database and read its schema.
pub(crate) fn open_loader(global: &GlobalArgs) -> Result<Loader<DuckDbExecutor>> {
    let executor = open_database(global)?;
    Loader::new(executor).context("Failed to read the database schema")
}

/// Read a CSV file with a header row, typing each cell by inference.
pub(crate) fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read row {} of {}", i + 1, path.display()))?;
        rows.push(record.iter().map(Value::infer).collect());
    }

    log::debug!("Read {} rows from {}", rows.len(), path.display());
    Dataset::new(columns, rows).with_context(|| format!("Invalid CSV file: {}", path.display()))
}

/// Write a dataset as CSV; nulls become empty cells.
pub(crate) fn write_csv(data: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    writer.write_record(data.columns())?;
    for row in data.rows() {
        writer.write_record(row.iter().map(|v| match v {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}

/// Options from `--config` with command-line flags applied on top.
pub(crate) fn load_options(args: &LoadOptionArgs) -> Result<LoadOptions> {
    let mut options = match &args.config {
        Some(path) => LoadOptions::load(path)?,
        None => LoadOptions::default(),
    };

    if !args.tables.is_empty() {
        options.tables = args.tables.clone();
    }
    options.overrides.extend(parse_overrides(&args.overrides)?);
    if args.no_validate {
        options.validate = false;
    }
    if args.inexact {
        options.exact = false;
    }
    if args.keep_columns {
        options.replace = false;
    }
    if args.allow_duplication {
        options.allow_duplication = true;
    }
    if args.bulk {
        options.insert_mode = fk_core::InsertMode::BulkAppend;
    }
    if args.where_clause.is_some() {
        options.where_clause = args.where_clause.clone();
    }
    if args.anchor.is_some() {
        options.anchor = args.anchor.clone();
    }

    options.validate()?;
    Ok(options)
}

/// Parse `table.column=dataset_column` pairs.
fn parse_overrides(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => bail!("Invalid override '{pair}', expected table.column=dataset_column"),
        })
        .collect()
}
