//! Schema command implementation

use anyhow::{Context, Result};
use fk_core::SchemaGraph;
use fk_db::Executor;

use crate::cli::{GlobalArgs, SchemaArgs, SchemaFormat};
use crate::commands::common::open_database;

/// Execute the schema command
pub fn execute(args: &SchemaArgs, global: &GlobalArgs) -> Result<()> {
    let executor = open_database(global)?;
    let raw = executor
        .introspect_schema()
        .context("Failed to read the database schema")?;

    match args.format {
        SchemaFormat::Text => {
            let schema = SchemaGraph::build(raw)?;
            if schema.is_empty() {
                println!("No tables found");
            } else {
                println!("{schema}");
            }
        }
        SchemaFormat::Yaml => print!("{}", serde_yaml::to_string(&raw)?),
        SchemaFormat::Json => println!("{}", serde_json::to_string_pretty(&raw)?),
    }
    Ok(())
}
