//! Plan command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, PlanArgs};
use crate::commands::common::{load_options, open_loader, read_csv};

/// Execute the plan command
pub fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let options = load_options(&args.options)?;
    let data = read_csv(&args.options.csv)?;
    let loader = open_loader(global)?;

    let prepared = loader
        .plan(data.columns(), &options)
        .with_context(|| format!("Failed to plan a load of {}", args.options.csv.display()))?;
    print!("{prepared}");
    Ok(())
}
