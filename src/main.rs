//! House Rocket - King County Housing Market Overview
//!
//! Loads the King County sales file and zipcode boundaries, applies the
//! zipcode/column selection and prints the dashboard tables.

mod config;
mod data;
mod report;
mod stats;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufWriter, Write};

use config::Cli;
use data::{apply_filter, available_regions, DataLoader};
use report::Report;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut loader = DataLoader::new();
    let listings = loader
        .load_listings(&cli.data)
        .context("Could not load the listing data")?;

    let boundaries = if cli.skip_boundaries {
        None
    } else {
        Some(
            loader
                .load_region_boundaries(&cli.boundaries)
                .context("Could not load the zipcode boundaries")?,
        )
    };

    let selection = cli.selection();
    let known = available_regions(&listings);
    for region in selection.regions.iter().filter(|r| !known.contains(r)) {
        log::warn!("Zipcode {region} has no listings");
    }

    let filtered = apply_filter(&listings, &selection).context("Invalid selection")?;
    let report = Report::build(&listings, filtered, boundaries.as_deref())?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    report.write(cli.format, cli.rows, &mut out)?;
    out.flush()?;

    Ok(())
}
