//! fkload - load CSV files into foreign-key-linked DuckDB schemas

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{load, plan, schema};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match &cli.command {
        cli::Commands::Load(args) => load::execute(args, &cli.global),
        cli::Commands::Schema(args) => schema::execute(args, &cli.global),
        cli::Commands::Plan(args) => plan::execute(args, &cli.global),
    }
}
