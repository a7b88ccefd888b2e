//! Store Check - row counts and data-quality indicators for a data set
//!
//! Useful before running analyses on a fresh export: reports duplicate
//! project ids, bids pointing at unknown projects, missing TINs and amounts.

use anyhow::{Context, Result};
use bid_intel_toolkit::report::{status_table, to_json};
use bid_intel_toolkit::{CsvStore, DataStore, Engine};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "store-check")]
#[command(about = "Summarize a projects/bids data set and flag data-quality problems")]
struct Args {
    /// Projects CSV export
    #[arg(long, env = "BID_INTEL_PROJECTS", default_value = "projects.csv")]
    projects: PathBuf,

    /// Bids CSV export
    #[arg(long, env = "BID_INTEL_BIDS", default_value = "bids.csv")]
    bids: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let store = CsvStore::new(&args.projects, &args.bids);
    log::info!("Checking {}", store.describe());

    let status = Engine::new(&store)
        .status()
        .context("Failed to read data set")?;

    if args.json {
        println!("{}", to_json(&status)?);
    } else {
        print!("{}", status_table(&status)?);
    }

    if status.orphan_bids > 0 || status.duplicate_project_ids > 0 {
        log::warn!(
            "{} orphan bids, {} duplicate project ids",
            status.orphan_bids,
            status.duplicate_project_ids
        );
    }

    Ok(())
}
