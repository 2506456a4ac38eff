//! Stats module - Region aggregates and descriptive statistics

mod calculator;
mod regions;

use polars::prelude::*;
use thiserror::Error;

use crate::data::schema;

pub use calculator::{describe_numeric, DescriptiveStats};
pub use regions::{
    map_center, price_by_year_built, price_by_year_renovated, region_price_layer,
    summarize_by_region, MapCenter, RegionPriceArea, RegionSummary, YearlyPrice,
};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{column}' is required for the {operation} but is not selected")]
    SchemaMismatch {
        column: String,
        operation: &'static str,
    },
}

impl PipelineError {
    /// Fail with [`PipelineError::SchemaMismatch`] unless `df` has every column.
    pub(crate) fn require(
        df: &DataFrame,
        columns: &[&str],
        operation: &'static str,
    ) -> Result<(), PipelineError> {
        match schema::first_missing(df, columns) {
            Some(column) => Err(PipelineError::SchemaMismatch {
                column: column.to_string(),
                operation,
            }),
            None => Ok(()),
        }
    }
}
