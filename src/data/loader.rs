//! Listing Loader Module
//! Reads the sales CSV and the region boundaries once per location.

use polars::prelude::*;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::boundaries::RegionBoundaries;
use super::schema::{self, REQUIRED_COLUMNS, ZIPCODE};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Data unavailable at {location}: {reason}")]
    DataUnavailable { location: String, reason: String },
    #[error("Listing file is missing the '{column}' column")]
    SchemaMismatch { column: String },
}

impl LoaderError {
    pub fn unavailable(location: impl Display, reason: impl Display) -> Self {
        LoaderError::DataUnavailable {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Raw access to the listing file and the boundary document.
pub trait SourceReader {
    /// Read the listing table as stored, before validation.
    fn read_listings(&self, path: &Path) -> Result<DataFrame, LoaderError>;

    /// Read the boundary document text from a path or an `http(s)` URL.
    fn read_boundaries(&self, location: &str) -> Result<String, LoaderError>;
}

/// Reads from the local filesystem and, for boundaries, over HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileReader;

impl SourceReader for FileReader {
    fn read_listings(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::unavailable(path.display(), "no such file"));
        }

        LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|e| LoaderError::unavailable(path.display(), e))
    }

    fn read_boundaries(&self, location: &str) -> Result<String, LoaderError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            log::info!("Downloading region boundaries from {location}");
            reqwest::blocking::get(location)
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.text())
                .map_err(|e| LoaderError::unavailable(location, e))
        } else {
            std::fs::read_to_string(location).map_err(|e| LoaderError::unavailable(location, e))
        }
    }
}

/// Read-through cache over a [`SourceReader`].
///
/// Each distinct path or location is read and parsed at most once; later
/// calls return the shared result. Failed loads are not remembered.
pub struct DataLoader<R: SourceReader = FileReader> {
    reader: R,
    listings: HashMap<PathBuf, Arc<DataFrame>>,
    boundaries: HashMap<String, Arc<RegionBoundaries>>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self::with_reader(FileReader)
    }
}

impl<R: SourceReader> DataLoader<R> {
    pub fn with_reader(reader: R) -> Self {
        Self {
            reader,
            listings: HashMap::new(),
            boundaries: HashMap::new(),
        }
    }

    /// Load the listing file, validate its columns and attach derived attributes.
    pub fn load_listings(&mut self, path: impl AsRef<Path>) -> Result<Arc<DataFrame>, LoaderError> {
        let path = path.as_ref();
        if let Some(df) = self.listings.get(path) {
            log::debug!("Reusing listings loaded from {}", path.display());
            return Ok(Arc::clone(df));
        }

        let raw = self.reader.read_listings(path)?;
        if let Some(column) = schema::first_missing(&raw, &REQUIRED_COLUMNS) {
            return Err(LoaderError::SchemaMismatch {
                column: column.to_string(),
            });
        }

        let df = schema::with_attributes(raw)
            .map_err(|e| LoaderError::unavailable(path.display(), e))?;
        log::info!(
            "Loaded {} listings ({} columns) from {}",
            df.height(),
            df.width(),
            path.display()
        );

        let df = Arc::new(df);
        self.listings.insert(path.to_path_buf(), Arc::clone(&df));
        Ok(df)
    }

    /// Load and parse the region boundary collection.
    pub fn load_region_boundaries(
        &mut self,
        location: &str,
    ) -> Result<Arc<RegionBoundaries>, LoaderError> {
        if let Some(boundaries) = self.boundaries.get(location) {
            log::debug!("Reusing region boundaries from {location}");
            return Ok(Arc::clone(boundaries));
        }

        let text = self.reader.read_boundaries(location)?;
        let boundaries = Arc::new(RegionBoundaries::from_geojson(location, &text)?);
        log::info!("Loaded {} region boundaries from {location}", boundaries.len());

        self.boundaries
            .insert(location.to_string(), Arc::clone(&boundaries));
        Ok(boundaries)
    }
}

/// Distinct region codes in ascending order, as offered by the region selector.
pub fn available_regions(df: &DataFrame) -> Vec<i64> {
    df.column(ZIPCODE)
        .ok()
        .and_then(|col| col.cast(&DataType::Int64).ok())
        .map(|col| {
            let mut regions: Vec<i64> = col
                .i64()
                .map(|ca| ca.into_iter().flatten().collect())
                .unwrap_or_default();
            regions.sort_unstable();
            regions.dedup();
            regions
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{M2_LIVING, PRICE_M2};
    use std::cell::Cell;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    /// Serves fixture files and counts how often the source is touched.
    #[derive(Default)]
    struct CountingReader {
        listing_reads: Cell<usize>,
        boundary_reads: Cell<usize>,
    }

    impl SourceReader for CountingReader {
        fn read_listings(&self, path: &Path) -> Result<DataFrame, LoaderError> {
            self.listing_reads.set(self.listing_reads.get() + 1);
            FileReader.read_listings(path)
        }

        fn read_boundaries(&self, location: &str) -> Result<String, LoaderError> {
            self.boundary_reads.set(self.boundary_reads.get() + 1);
            FileReader.read_boundaries(location)
        }
    }

    #[test]
    fn loads_sample_file_with_derived_columns() {
        let mut loader = DataLoader::new();
        let df = loader.load_listings(fixture("kc_house_sample.csv")).unwrap();

        assert_eq!(df.height(), 6);
        assert!(df.column(M2_LIVING).is_ok());
        assert!(df.column(PRICE_M2).is_ok());
        assert_eq!(df.column(schema::DATE).unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn memoizes_listings_per_path() {
        let mut loader = DataLoader::with_reader(CountingReader::default());
        let path = fixture("kc_house_sample.csv");

        let first = loader.load_listings(&path).unwrap();
        let second = loader.load_listings(&path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.reader.listing_reads.get(), 1);
    }

    #[test]
    fn memoizes_boundaries_per_location() {
        let mut loader = DataLoader::with_reader(CountingReader::default());
        let location = fixture("zip_boundaries.geojson");
        let location = location.to_str().unwrap();

        let first = loader.load_region_boundaries(location).unwrap();
        let second = loader.load_region_boundaries(location).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.reader.boundary_reads.get(), 1);
        assert_eq!(first.regions().collect::<Vec<_>>(), vec![98001, 98002, 98103]);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let mut loader = DataLoader::with_reader(CountingReader::default());
        let missing = fixture("does_not_exist.csv");

        let err = loader.load_listings(&missing).unwrap_err();
        assert!(matches!(err, LoaderError::DataUnavailable { .. }));
        assert!(loader.load_listings(&missing).is_err());
        assert_eq!(loader.reader.listing_reads.get(), 2);
    }

    #[test]
    fn missing_required_column_is_a_schema_mismatch() {
        struct NoZipcode;

        impl SourceReader for NoZipcode {
            fn read_listings(&self, _path: &Path) -> Result<DataFrame, LoaderError> {
                Ok(df!(schema::ID => [1i64], schema::PRICE => [1.0]).unwrap())
            }

            fn read_boundaries(&self, location: &str) -> Result<String, LoaderError> {
                Err(LoaderError::unavailable(location, "offline"))
            }
        }

        let mut loader = DataLoader::with_reader(NoZipcode);
        let err = loader.load_listings("listings.csv").unwrap_err();
        assert!(matches!(err, LoaderError::SchemaMismatch { ref column } if column == "date"));

        let err = loader.load_region_boundaries("https://example.invalid/zip.geojson");
        assert!(matches!(err, Err(LoaderError::DataUnavailable { .. })));
    }

    #[test]
    fn lists_distinct_regions_sorted() {
        let df = df!(ZIPCODE => [98103i64, 98001, 98103, 98002]).unwrap();
        assert_eq!(available_regions(&df), vec![98001, 98002, 98103]);
        assert!(available_regions(&DataFrame::empty()).is_empty());
    }
}
