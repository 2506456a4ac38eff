//! Statistics Calculator Module
//! Descriptive statistics over the numeric columns of a listing frame.

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::fmt;

use super::PipelineError;
use crate::data::schema::{is_integer, is_numeric};

/// A column value kept in its stored numeric kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumericValue {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Integer(i) => write!(f, "{i}"),
            NumericValue::Unsigned(u) => write!(f, "{u}"),
            NumericValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Descriptive statistics of one numeric attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub attribute: String,
    pub max: NumericValue,
    pub min: NumericValue,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
}

/// Max, min, mean, median and population std of every numeric column.
///
/// Text, date and boolean columns are skipped, as are nulls and NaNs.
/// An empty frame, or a column with no values left, yields no row.
pub fn describe_numeric(listings: &DataFrame) -> Result<Vec<DescriptiveStats>, PipelineError> {
    if listings.height() == 0 {
        return Ok(Vec::new());
    }

    let numeric: Vec<&Column> = listings
        .get_columns()
        .iter()
        .filter(|col| is_numeric(col.dtype()))
        .collect();

    let stats: Vec<Option<DescriptiveStats>> = numeric
        .par_iter()
        .map(|col| describe_column(col))
        .collect::<PolarsResult<_>>()?;

    let stats: Vec<DescriptiveStats> = stats.into_iter().flatten().collect();
    log::debug!("Described {} numeric attributes", stats.len());
    Ok(stats)
}

fn describe_column(column: &Column) -> PolarsResult<Option<DescriptiveStats>> {
    let as_f64 = column.cast(&DataType::Float64)?;
    let values: Vec<f64> = as_f64
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();

    if values.is_empty() {
        return Ok(None);
    }

    let (max, min) = if column.dtype() == &DataType::UInt64 {
        // Values above i64::MAX would turn null in a cast to Int64.
        let unsigned = column.u64()?;
        match (
            Iterator::max(unsigned.into_iter().flatten()),
            Iterator::min(unsigned.into_iter().flatten()),
        ) {
            (Some(max), Some(min)) => (NumericValue::Unsigned(max), NumericValue::Unsigned(min)),
            _ => return Ok(None),
        }
    } else if is_integer(column.dtype()) {
        let as_i64 = column.cast(&DataType::Int64)?;
        let ints = as_i64.i64()?;
        match (
            Iterator::max(ints.into_iter().flatten()),
            Iterator::min(ints.into_iter().flatten()),
        ) {
            (Some(max), Some(min)) => (NumericValue::Integer(max), NumericValue::Integer(min)),
            _ => return Ok(None),
        }
    } else {
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        (NumericValue::Float(max), NumericValue::Float(min))
    };

    Ok(Some(DescriptiveStats {
        attribute: column.name().to_string(),
        max,
        min,
        mean: Statistics::mean(values.iter()),
        median: median(&values),
        std: Statistics::population_std_dev(values.iter()),
    }))
}

fn median(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
