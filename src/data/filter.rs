//! Listing Filter Module
//! Row selection by postal region and column projection.

use polars::prelude::*;
use std::collections::BTreeSet;

use super::schema::{self, ZIPCODE};
use crate::stats::PipelineError;

/// Regions and columns chosen for one render pass. Empty means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub regions: BTreeSet<i64>,
    /// Projection in display order, without duplicates.
    pub columns: Vec<String>,
}

impl FilterSelection {
    pub fn new<I, C, S>(regions: I, columns: C) -> Self
    where
        I: IntoIterator<Item = i64>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection: Vec<String> = Vec::new();
        for column in columns {
            let column = column.into();
            if !projection.contains(&column) {
                projection.push(column);
            }
        }

        Self {
            regions: regions.into_iter().collect(),
            columns: projection,
        }
    }

    /// No region and no column restriction.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.columns.is_empty()
    }
}

/// Apply a [`FilterSelection`] to the listing frame.
///
/// Rows are restricted before columns, so a projection may drop the region
/// column. Both empty returns the frame as is.
pub fn apply_filter(
    listings: &DataFrame,
    selection: &FilterSelection,
) -> Result<DataFrame, PipelineError> {
    match (selection.regions.is_empty(), selection.columns.is_empty()) {
        (false, false) => {
            let rows = filter_regions(listings, &selection.regions)?;
            project(&rows, &selection.columns)
        }
        (false, true) => filter_regions(listings, &selection.regions),
        (true, false) => project(listings, &selection.columns),
        (true, true) => Ok(listings.clone()),
    }
}

fn filter_regions(df: &DataFrame, regions: &BTreeSet<i64>) -> Result<DataFrame, PipelineError> {
    PipelineError::require(df, &[ZIPCODE], "region filter")?;

    let codes = Series::new("regions".into(), regions.iter().copied().collect::<Vec<i64>>());
    let predicate = col(ZIPCODE).cast(DataType::Int64).is_in(lit(codes));

    let filtered = df.clone().lazy().filter(predicate).collect()?;
    log::debug!(
        "Region filter kept {} of {} listings across {} regions",
        filtered.height(),
        df.height(),
        regions.len()
    );
    Ok(filtered)
}

fn project(df: &DataFrame, columns: &[String]) -> Result<DataFrame, PipelineError> {
    let wanted: Vec<&str> = columns.iter().map(String::as_str).collect();
    if let Some(column) = schema::first_missing(df, &wanted) {
        return Err(PipelineError::SchemaMismatch {
            column: column.to_string(),
            operation: "column selection",
        });
    }

    Ok(df.select(wanted)?)
}
