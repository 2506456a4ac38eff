//! Report Module
//! Collects the tables of one render pass and writes them as text or JSON.

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use std::io::Write;

use crate::config::OutputFormat;
use crate::data::RegionBoundaries;
use crate::stats::{
    describe_numeric, map_center, price_by_year_built, price_by_year_renovated,
    region_price_layer, summarize_by_region, DescriptiveStats, MapCenter, PipelineError,
    RegionPriceArea, RegionSummary, YearlyPrice,
};

/// Everything the dashboard shows for one selection.
#[derive(Debug, Serialize)]
pub struct Report {
    pub listings: usize,
    pub columns: Vec<String>,
    /// Filtered listings shown in the data navigator.
    #[serde(skip)]
    pub navigator: DataFrame,
    /// `None` when the selection lacks a column the averages need.
    pub average_values: Option<Vec<RegionSummary>>,
    pub descriptive_analysis: Vec<DescriptiveStats>,
    pub price_by_year_built: Vec<YearlyPrice>,
    pub price_by_year_renovated: Vec<YearlyPrice>,
    pub map_center: Option<MapCenter>,
    pub price_heatmap: Vec<RegionPriceArea>,
    pub diagnostics: Vec<String>,
}

impl Report {
    /// Build the report.
    ///
    /// The overview tables use the filtered listings. Maps and yearly series
    /// use the full dataset, so narrowing the navigator does not change them.
    pub fn build(
        all: &DataFrame,
        filtered: DataFrame,
        boundaries: Option<&RegionBoundaries>,
    ) -> Result<Self, PipelineError> {
        let mut diagnostics = Vec::new();

        let average_values = match summarize_by_region(&filtered) {
            Ok(summaries) => Some(summaries),
            Err(err @ PipelineError::SchemaMismatch { .. }) => {
                log::warn!("{err}");
                diagnostics.push(format!("Average values unavailable: {err}"));
                None
            }
            Err(err) => return Err(err),
        };

        let price_heatmap = match boundaries {
            Some(boundaries) => region_price_layer(all, boundaries)?,
            None => Vec::new(),
        };

        Ok(Self {
            listings: filtered.height(),
            columns: filtered
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            average_values,
            descriptive_analysis: describe_numeric(&filtered)?,
            price_by_year_built: price_by_year_built(all)?,
            price_by_year_renovated: price_by_year_renovated(all)?,
            map_center: map_center(all)?,
            price_heatmap,
            diagnostics,
            navigator: filtered,
        })
    }

    pub fn write(&self, format: OutputFormat, rows: usize, out: &mut impl Write) -> Result<()> {
        match format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, self)?;
                writeln!(out)?;
            }
            OutputFormat::Table => self.write_tables(rows, out)?,
        }
        Ok(())
    }

    fn write_tables(&self, rows: usize, out: &mut impl Write) -> Result<()> {
        writeln!(out, "== General Market Data ==")?;
        writeln!(out, "-- Data Navigator ({} listings) --", self.listings)?;
        writeln!(out, "{}", self.navigator.head(Some(rows)))?;

        writeln!(out, "-- Average Values by Zipcode --")?;
        match &self.average_values {
            Some(summaries) => writeln!(out, "{}", average_values_table(summaries)?)?,
            None => {
                for diagnostic in &self.diagnostics {
                    writeln!(out, "{diagnostic}")?;
                }
            }
        }

        writeln!(out, "-- Descriptive Analysis --")?;
        writeln!(out, "{}", descriptive_table(&self.descriptive_analysis)?)?;

        writeln!(out, "== Commercial Attributes ==")?;
        writeln!(out, "-- Average prices by the year of building --")?;
        writeln!(out, "{}", yearly_table("Year Built", &self.price_by_year_built)?)?;
        writeln!(out, "-- Average prices by the year of renovation --")?;
        writeln!(out, "{}", yearly_table("Year Renovated", &self.price_by_year_renovated)?)?;

        writeln!(out, "== Reference Maps ==")?;
        match self.map_center {
            Some(center) => writeln!(out, "Map center: {:.4}, {:.4}", center.lat, center.long)?,
            None => writeln!(out, "Map center: no listings")?,
        }
        writeln!(out, "-- Price Heatmap --")?;
        writeln!(out, "{}", heatmap_table(&self.price_heatmap)?)?;

        Ok(())
    }
}

fn average_values_table(summaries: &[RegionSummary]) -> PolarsResult<DataFrame> {
    df!(
        "Zipcode" => summaries.iter().map(|s| s.region).collect::<Vec<_>>(),
        "Number of Houses" => summaries.iter().map(|s| s.listings).collect::<Vec<_>>(),
        "Price" => summaries.iter().map(|s| s.mean_price).collect::<Vec<_>>(),
        "m2 Living" => summaries.iter().map(|s| s.mean_living_m2).collect::<Vec<_>>(),
        "USD/m2" => summaries.iter().map(|s| s.mean_price_m2).collect::<Vec<_>>(),
    )
}

fn descriptive_table(stats: &[DescriptiveStats]) -> PolarsResult<DataFrame> {
    df!(
        "Variable" => stats.iter().map(|s| s.attribute.clone()).collect::<Vec<_>>(),
        "Max" => stats.iter().map(|s| s.max.to_string()).collect::<Vec<_>>(),
        "Min" => stats.iter().map(|s| s.min.to_string()).collect::<Vec<_>>(),
        "Mean" => stats.iter().map(|s| s.mean).collect::<Vec<_>>(),
        "Median" => stats.iter().map(|s| s.median).collect::<Vec<_>>(),
        "Std Dev" => stats.iter().map(|s| s.std).collect::<Vec<_>>(),
    )
}

fn yearly_table(year_caption: &str, series: &[YearlyPrice]) -> PolarsResult<DataFrame> {
    df!(
        year_caption => series.iter().map(|y| y.year).collect::<Vec<_>>(),
        "Price" => series.iter().map(|y| y.mean_price).collect::<Vec<_>>(),
    )
}

fn heatmap_table(layer: &[RegionPriceArea]) -> PolarsResult<DataFrame> {
    df!(
        "ZIP" => layer.iter().map(|a| a.region).collect::<Vec<_>>(),
        "PRICE" => layer.iter().map(|a| a.mean_price).collect::<Vec<_>>(),
        "Longitude" => layer.iter().map(|a| a.centroid.map(|c| c.0)).collect::<Vec<_>>(),
        "Latitude" => layer.iter().map(|a| a.centroid.map(|c| c.1)).collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{self, PRICE, ZIPCODE};
    use crate::data::{apply_filter, DataLoader, FilterSelection};
    use std::path::Path;
    use std::sync::Arc;

    fn fixtures() -> (Arc<DataFrame>, Arc<RegionBoundaries>) {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");
        let mut loader = DataLoader::new();
        let listings = loader.load_listings(dir.join("kc_house_sample.csv")).unwrap();
        let boundaries = loader
            .load_region_boundaries(dir.join("zip_boundaries.geojson").to_str().unwrap())
            .unwrap();
        (listings, boundaries)
    }

    #[test]
    fn full_selection_report() {
        let (listings, boundaries) = fixtures();
        let filtered = apply_filter(&listings, &FilterSelection::default()).unwrap();
        let report = Report::build(&listings, filtered, Some(&boundaries)).unwrap();

        assert_eq!(report.listings, 6);
        let regions: Vec<i64> = report
            .average_values
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.region)
            .collect();
        assert_eq!(regions, vec![98001, 98002, 98103]);
        assert_eq!(report.price_heatmap.len(), 3);
        assert!(report.map_center.is_some());
        assert!(report.diagnostics.is_empty());

        // 1991 is the only renovation year in the sample.
        assert_eq!(report.price_by_year_renovated.len(), 1);
        assert_eq!(report.price_by_year_renovated[0].mean_price, 538000.0);

        let attributes: Vec<&str> = report
            .descriptive_analysis
            .iter()
            .map(|s| s.attribute.as_str())
            .collect();
        assert!(attributes.contains(&PRICE));
        assert!(!attributes.contains(&schema::DATE));
    }

    #[test]
    fn narrowed_columns_report_a_diagnostic() {
        let (listings, boundaries) = fixtures();
        let selection = FilterSelection::new([98103], [ZIPCODE, PRICE]);
        let filtered = apply_filter(&listings, &selection).unwrap();
        let report = Report::build(&listings, filtered, Some(&boundaries)).unwrap();

        assert!(report.average_values.is_none());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.descriptive_analysis.len(), 2);
        // Maps still cover the whole dataset.
        assert_eq!(report.price_heatmap.len(), 3);

        let mut out = Vec::new();
        report.write(OutputFormat::Table, 5, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Average values unavailable"));
        assert!(text.contains("Descriptive Analysis"));
    }

    #[test]
    fn empty_selection_renders_empty_tables() {
        let (listings, _) = fixtures();
        let selection = FilterSelection::new([10001], Vec::<String>::new());
        let filtered = apply_filter(&listings, &selection).unwrap();
        let report = Report::build(&listings, filtered, None).unwrap();

        assert_eq!(report.listings, 0);
        assert_eq!(report.average_values.as_deref(), Some(&[][..]));
        assert!(report.descriptive_analysis.is_empty());
        assert!(report.price_heatmap.is_empty());

        let mut out = Vec::new();
        report.write(OutputFormat::Json, 10, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["listings"], 0);
        assert_eq!(json["average_values"], serde_json::json!([]));
    }
}
