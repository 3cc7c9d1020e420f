//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// fkload - load tabular data into a foreign-key-linked schema
#[derive(Parser, Debug)]
#[command(name = "fkload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the DuckDB database file
    #[arg(short, long, global = true, env = "FKLOAD_DB")]
    pub db: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a CSV file into every table its columns match
    Load(LoadArgs),

    /// Print the schema read from the database
    Schema(SchemaArgs),

    /// Print the load plan and statements for a CSV file without writing
    Plan(PlanArgs),
}

/// Options shared by load and plan
#[derive(Args, Debug, Clone)]
pub struct LoadOptionArgs {
    /// CSV file with a header row
    #[arg(long)]
    pub csv: PathBuf,

    /// YAML file with load options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target table (repeatable, default: inferred from the columns)
    #[arg(short, long = "table")]
    pub tables: Vec<String>,

    /// Column override of the form table.column=dataset_column (repeatable)
    #[arg(short = 'o', long = "override")]
    pub overrides: Vec<String>,

    /// Skip the round-trip comparison
    #[arg(long)]
    pub no_validate: bool,

    /// Accept extra rows in the database when comparing
    #[arg(long)]
    pub inexact: bool,

    /// Keep matched columns next to the retrieved keys
    #[arg(long)]
    pub keep_columns: bool,

    /// Accept key merges that repeat input rows
    #[arg(long)]
    pub allow_duplication: bool,

    /// Write rows through the bulk append path
    #[arg(long)]
    pub bulk: bool,

    /// WHERE fragment applied to the compare query
    #[arg(long = "where")]
    pub where_clause: Option<String>,

    /// Table the compare query starts from
    #[arg(long)]
    pub anchor: Option<String>,
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub options: LoadOptionArgs,

    /// Write the input with retrieved keys to this CSV file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the schema command
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: SchemaFormat,
}

/// Schema output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// Human-readable table listing
    Text,
    /// Raw introspection records as YAML
    Yaml,
    /// Raw introspection records as JSON
    Json,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub options: LoadOptionArgs,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
