//! Load command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, LoadArgs};
use crate::commands::common::{load_options, open_loader, read_csv, write_csv};

/// Execute the load command
pub fn execute(args: &LoadArgs, global: &GlobalArgs) -> Result<()> {
    let options = load_options(&args.options)?;
    let data = read_csv(&args.options.csv)?;
    let loader = open_loader(global)?;

    let outcome = loader.load(&data, &options).with_context(|| {
        format!(
            "Failed to load {}, no changes were committed",
            args.options.csv.display()
        )
    })?;

    println!(
        "Loaded {} rows from {}",
        data.row_count(),
        args.options.csv.display()
    );
    for (table, rows) in &outcome.inserted {
        println!("  {table}: {rows} rows written");
    }
    match &outcome.validation {
        Some(report) => println!(
            "Validation passed ({} comparison, {} rows)",
            report.mode, report.expected_rows
        ),
        None => println!("Validation skipped"),
    }

    if let Some(path) = &args.output {
        write_csv(&outcome.data, path)?;
        println!("Wrote {} to {}", outcome.data.columns().join(", "), path.display());
    }
    Ok(())
}
