//! Region Aggregates Module
//! Per-region averages, yearly price series and choropleth map data.

use geo::{Centroid, MultiPolygon};
use polars::prelude::*;
use serde::Serialize;

use super::PipelineError;
use crate::data::boundaries::RegionBoundaries;
use crate::data::schema::{ID, LAT, LONG, M2_LIVING, PRICE, PRICE_M2, YR_BUILT, YR_RENOVATED, ZIPCODE};

const LISTINGS: &str = "listings";
const MEAN_PRICE: &str = "mean_price";
const MEAN_LIVING_M2: &str = "mean_living_m2";
const MEAN_PRICE_M2: &str = "mean_price_m2";

/// Renovation years before this are not plotted; `0` means never renovated.
pub const FIRST_RENOVATION_YEAR: i64 = 1930;

/// Averages of one postal region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: i64,
    pub listings: u64,
    pub mean_price: f64,
    pub mean_living_m2: f64,
    pub mean_price_m2: f64,
}

/// Mean sale price for one construction or renovation year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyPrice {
    pub year: i64,
    pub mean_price: f64,
}

/// Mean price of a region together with its boundary, for the price heatmap.
#[derive(Debug, Clone, Serialize)]
pub struct RegionPriceArea {
    pub region: i64,
    pub mean_price: f64,
    /// `(longitude, latitude)` of the boundary centroid.
    pub centroid: Option<(f64, f64)>,
    #[serde(serialize_with = "serialize_boundary")]
    pub boundary: MultiPolygon<f64>,
}

/// Boundaries go out as GeoJSON geometries.
fn serialize_boundary<S: serde::Serializer>(
    boundary: &MultiPolygon<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    geojson::Geometry::new(geojson::Value::from(boundary)).serialize(serializer)
}

/// Initial viewport of the listing maps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub long: f64,
}

fn per_region(lf: &LazyFrame, aggregate: Expr) -> LazyFrame {
    lf.clone().group_by([col(ZIPCODE)]).agg([aggregate])
}

/// Listing count and mean price, living area and price per m² of each region.
///
/// The four aggregates are computed separately and inner-joined on the
/// region code. Regions without listings do not appear; an empty frame
/// gives an empty summary.
pub fn summarize_by_region(listings: &DataFrame) -> Result<Vec<RegionSummary>, PipelineError> {
    PipelineError::require(
        listings,
        &[ZIPCODE, ID, PRICE, M2_LIVING, PRICE_M2],
        "region summary",
    )?;
    if listings.height() == 0 {
        return Ok(Vec::new());
    }

    let unassigned = listings.column(ZIPCODE)?.null_count();
    if unassigned > 0 {
        log::warn!("Ignoring {unassigned} listings without a region code");
    }

    let lf = listings.clone().lazy().filter(col(ZIPCODE).is_not_null());
    let merged = per_region(&lf, col(ID).count().alias(LISTINGS))
        .inner_join(
            per_region(&lf, col(PRICE).mean().alias(MEAN_PRICE)),
            col(ZIPCODE),
            col(ZIPCODE),
        )
        .inner_join(
            per_region(&lf, col(M2_LIVING).mean().alias(MEAN_LIVING_M2)),
            col(ZIPCODE),
            col(ZIPCODE),
        )
        .inner_join(
            per_region(&lf, col(PRICE_M2).mean().alias(MEAN_PRICE_M2)),
            col(ZIPCODE),
            col(ZIPCODE),
        )
        .sort([ZIPCODE], Default::default())
        .collect()?;

    let regions = merged.column(ZIPCODE)?.cast(&DataType::Int64)?;
    let regions = regions.i64()?;
    let counts = merged.column(LISTINGS)?.cast(&DataType::UInt64)?;
    let counts = counts.u64()?;
    let prices = merged.column(MEAN_PRICE)?.cast(&DataType::Float64)?;
    let prices = prices.f64()?;
    let living = merged.column(MEAN_LIVING_M2)?.cast(&DataType::Float64)?;
    let living = living.f64()?;
    let price_m2 = merged.column(MEAN_PRICE_M2)?.cast(&DataType::Float64)?;
    let price_m2 = price_m2.f64()?;

    let summaries: Vec<RegionSummary> = (0..merged.height())
        .filter_map(|i| {
            Some(RegionSummary {
                region: regions.get(i)?,
                listings: counts.get(i).unwrap_or(0),
                mean_price: prices.get(i).unwrap_or(f64::NAN),
                mean_living_m2: living.get(i).unwrap_or(f64::NAN),
                mean_price_m2: price_m2.get(i).unwrap_or(f64::NAN),
            })
        })
        .collect();

    log::debug!(
        "Summarized {} listings into {} regions",
        listings.height(),
        summaries.len()
    );
    Ok(summaries)
}

fn mean_price_by_year(
    listings: &DataFrame,
    year_column: &str,
    first_year: Option<i64>,
) -> Result<Vec<YearlyPrice>, PipelineError> {
    PipelineError::require(listings, &[year_column, PRICE], "yearly price series")?;
    if listings.height() == 0 {
        return Ok(Vec::new());
    }

    let mut lf = listings
        .clone()
        .lazy()
        .filter(col(year_column).is_not_null());
    if let Some(first_year) = first_year {
        lf = lf.filter(col(year_column).gt_eq(lit(first_year)));
    }

    let grouped = lf
        .group_by([col(year_column)])
        .agg([col(PRICE).mean().alias(MEAN_PRICE)])
        .sort([year_column], Default::default())
        .collect()?;

    let years = grouped.column(year_column)?.cast(&DataType::Int64)?;
    let years = years.i64()?;
    let prices = grouped.column(MEAN_PRICE)?.cast(&DataType::Float64)?;
    let prices = prices.f64()?;

    Ok(years
        .into_iter()
        .zip(prices)
        .filter_map(|(year, mean_price)| {
            Some(YearlyPrice {
                year: year?,
                mean_price: mean_price?,
            })
        })
        .collect())
}

/// Mean price by year of construction.
pub fn price_by_year_built(listings: &DataFrame) -> Result<Vec<YearlyPrice>, PipelineError> {
    mean_price_by_year(listings, YR_BUILT, None)
}

/// Mean price by year of renovation, from [`FIRST_RENOVATION_YEAR`] on.
pub fn price_by_year_renovated(listings: &DataFrame) -> Result<Vec<YearlyPrice>, PipelineError> {
    mean_price_by_year(listings, YR_RENOVATED, Some(FIRST_RENOVATION_YEAR))
}

/// Mean price per region, limited to regions that have a boundary.
pub fn region_price_layer(
    listings: &DataFrame,
    boundaries: &RegionBoundaries,
) -> Result<Vec<RegionPriceArea>, PipelineError> {
    PipelineError::require(listings, &[ZIPCODE, PRICE], "price heatmap")?;
    if listings.height() == 0 || boundaries.is_empty() {
        return Ok(Vec::new());
    }

    let lf = listings.clone().lazy().filter(col(ZIPCODE).is_not_null());
    let prices = per_region(&lf, col(PRICE).mean().alias(MEAN_PRICE))
        .sort([ZIPCODE], Default::default())
        .collect()?;

    let regions = prices.column(ZIPCODE)?.cast(&DataType::Int64)?;
    let regions = regions.i64()?;
    let means = prices.column(MEAN_PRICE)?.cast(&DataType::Float64)?;
    let means = means.f64()?;

    let layer: Vec<RegionPriceArea> = regions
        .into_iter()
        .zip(means)
        .filter_map(|(region, mean_price)| {
            let region = region?;
            let boundary = boundaries.get(region)?;
            Some(RegionPriceArea {
                region,
                mean_price: mean_price?,
                centroid: boundary.centroid().map(|p| (p.x(), p.y())),
                boundary: boundary.clone(),
            })
        })
        .collect();

    let unmapped = prices.height() - layer.len();
    if unmapped > 0 {
        log::debug!("{unmapped} regions have no boundary and are left off the price heatmap");
    }
    Ok(layer)
}

/// Mean coordinates of the listings, or `None` when there are none.
pub fn map_center(listings: &DataFrame) -> Result<Option<MapCenter>, PipelineError> {
    PipelineError::require(listings, &[LAT, LONG], "map viewport")?;

    let lat = listings.column(LAT)?.cast(&DataType::Float64)?;
    let long = listings.column(LONG)?.cast(&DataType::Float64)?;

    Ok(match (lat.f64()?.mean(), long.f64()?.mean()) {
        (Some(lat), Some(long)) => Some(MapCenter { lat, long }),
        _ => None,
    })
}
