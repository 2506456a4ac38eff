//! Listing Schema Module
//! Column names of the King County sales file and the derived attributes.

use polars::prelude::*;

pub const ID: &str = "id";
pub const DATE: &str = "date";
pub const PRICE: &str = "price";
pub const BEDROOMS: &str = "bedrooms";
pub const BATHROOMS: &str = "bathrooms";
pub const SQFT_LIVING: &str = "sqft_living";
pub const SQFT_LOT: &str = "sqft_lot";
pub const CONDITION: &str = "condition";
pub const YR_BUILT: &str = "yr_built";
pub const YR_RENOVATED: &str = "yr_renovated";
pub const ZIPCODE: &str = "zipcode";
pub const LAT: &str = "lat";
pub const LONG: &str = "long";

// Derived
pub const M2_LIVING: &str = "m2_living";
pub const M2_LOT: &str = "m2_lot";
pub const PRICE_M2: &str = "price_m2";

/// Square feet to square metres (1 ft = 0.3048 m, exactly).
pub const SQFT_TO_M2: f64 = 0.09290304;

/// Sale timestamps look like `20141013T000000`.
const DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Columns every loaded listing file must carry.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    ID,
    DATE,
    PRICE,
    BEDROOMS,
    BATHROOMS,
    SQFT_LIVING,
    SQFT_LOT,
    YR_BUILT,
    YR_RENOVATED,
    LAT,
    LONG,
    ZIPCODE,
    CONDITION,
];

/// Return the first of `columns` that `df` does not have.
pub fn first_missing<'a>(df: &DataFrame, columns: &[&'a str]) -> Option<&'a str> {
    columns
        .iter()
        .copied()
        .find(|name| df.get_column_index(name).is_none())
}

/// Attach `m2_living`, `m2_lot` and `price_m2`, and parse `date` into a date column.
///
/// Price per area divides by the living area. Listings with no living area
/// get a null `price_m2` instead of an infinite one.
pub fn with_attributes(df: DataFrame) -> PolarsResult<DataFrame> {
    let parse_dates = matches!(df.column(DATE)?.dtype(), DataType::String);

    let mut lf = df
        .lazy()
        .with_columns([
            (col(SQFT_LIVING).cast(DataType::Float64) * lit(SQFT_TO_M2)).alias(M2_LIVING),
            (col(SQFT_LOT).cast(DataType::Float64) * lit(SQFT_TO_M2)).alias(M2_LOT),
        ])
        .with_column(
            when(col(M2_LIVING).gt(lit(0.0)))
                .then(col(PRICE).cast(DataType::Float64) / col(M2_LIVING))
                .otherwise(lit(NULL).cast(DataType::Float64))
                .alias(PRICE_M2),
        );

    if parse_dates {
        lf = lf.with_column(col(DATE).str().to_date(StrptimeOptions {
            format: Some(DATE_FORMAT.into()),
            strict: false,
            ..Default::default()
        }));
    }

    lf.collect()
}

/// Whether a column holds plain integers.
pub fn is_integer(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Whether a column is purely numeric (integer or floating point).
pub fn is_numeric(dtype: &DataType) -> bool {
    is_integer(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}
