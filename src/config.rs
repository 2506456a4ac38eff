//! Command Line Settings
//! Source locations and the region/column selection of one render pass.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::data::FilterSelection;

pub const DEFAULT_DATA_PATH: &str = "data/kc_house_data.csv";
pub const DEFAULT_BOUNDARIES_URL: &str =
    "https://opendata.arcgis.com/datasets/83fc2e72903343aabff6de8cb445b81c_2.geojson";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text tables
    #[default]
    Table,
    /// One JSON document
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "house-rocket",
    about = "King County housing market overview: average values by zipcode and descriptive statistics"
)]
pub struct Cli {
    /// Listing CSV file
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Zipcode boundary GeoJSON (path or http(s) URL)
    #[arg(long, default_value = DEFAULT_BOUNDARIES_URL)]
    pub boundaries: String,

    /// Do not load boundaries; the price heatmap layer is left empty
    #[arg(long)]
    pub skip_boundaries: bool,

    /// Only show listings in this zipcode (repeatable)
    #[arg(short = 'z', long = "zipcode", value_name = "CODE")]
    pub zipcodes: Vec<i64>,

    /// Only show this column in the data navigator (repeatable)
    #[arg(short = 'c', long = "column", value_name = "NAME")]
    pub columns: Vec<String>,

    /// Rows shown in the data navigator
    #[arg(long, default_value = "10")]
    pub rows: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl Cli {
    /// Selection chosen on the command line.
    pub fn selection(&self) -> FilterSelection {
        FilterSelection::new(self.zipcodes.iter().copied(), self.columns.iter().cloned())
    }
}
