//! Region Boundaries Module
//! Postal-region polygons parsed from a GeoJSON feature collection.

use geo::{Geometry, MultiPolygon};
use geojson::{Feature, GeoJson};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::loader::LoaderError;

/// Feature property holding the postal code.
pub const REGION_PROPERTY: &str = "ZIP";

/// Boundary polygons keyed by postal region code.
#[derive(Debug, Clone, Default)]
pub struct RegionBoundaries {
    regions: BTreeMap<i64, MultiPolygon<f64>>,
}

impl RegionBoundaries {
    /// Parse a GeoJSON `FeatureCollection`.
    ///
    /// Features sharing a code are merged into one multipolygon. Features
    /// without a usable code or a polygonal geometry are skipped.
    pub fn from_geojson(location: &str, text: &str) -> Result<Self, LoaderError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| LoaderError::unavailable(location, e))?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(LoaderError::unavailable(
                location,
                "expected a GeoJSON FeatureCollection",
            ));
        };

        let mut regions: BTreeMap<i64, MultiPolygon<f64>> = BTreeMap::new();
        let mut skipped = 0usize;

        for feature in collection.features {
            match Self::parse_feature(feature) {
                Some((code, polygons)) => {
                    regions
                        .entry(code)
                        .or_insert_with(|| MultiPolygon(Vec::new()))
                        .0
                        .extend(polygons.0);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("{location}: skipped {skipped} features without a region code or polygon");
        }

        Ok(Self { regions })
    }

    fn parse_feature(feature: Feature) -> Option<(i64, MultiPolygon<f64>)> {
        let code = feature
            .property(REGION_PROPERTY)
            .and_then(region_code)?;

        let geometry: Geometry<f64> = feature.geometry?.try_into().ok()?;
        let polygons = match geometry {
            Geometry::MultiPolygon(mp) => mp,
            Geometry::Polygon(p) => MultiPolygon(vec![p]),
            _ => return None,
        };

        Some((code, polygons))
    }

    /// Boundary of a single region.
    pub fn get(&self, region: i64) -> Option<&MultiPolygon<f64>> {
        self.regions.get(&region)
    }

    /// Region codes in ascending order.
    pub fn regions(&self) -> impl Iterator<Item = i64> + '_ {
        self.regions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Postal codes appear both as numbers and as numeric strings.
fn region_code(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "ZIP": 98001 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-122.3, 47.3], [-122.2, 47.3], [-122.2, 47.4], [-122.3, 47.3]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "ZIP": "98001" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-122.1, 47.3], [-122.0, 47.3], [-122.0, 47.4], [-122.1, 47.3]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "ZIP": "98002" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[-122.2, 47.2], [-122.1, 47.2], [-122.1, 47.3], [-122.2, 47.2]]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "no code" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "ZIP": 98003 },
                "geometry": { "type": "Point", "coordinates": [-122.3, 47.3] }
            }
        ]
    }"#;

    #[test]
    fn keys_polygons_by_zip_property() {
        let boundaries = RegionBoundaries::from_geojson("inline", COLLECTION).unwrap();

        assert_eq!(boundaries.regions().collect::<Vec<_>>(), vec![98001, 98002]);
        assert_eq!(boundaries.get(98001).unwrap().0.len(), 2);
        assert_eq!(boundaries.get(98002).unwrap().0.len(), 1);
        assert!(boundaries.get(98003).is_none());
    }

    #[test]
    fn rejects_non_collections() {
        let point = r#"{ "type": "Point", "coordinates": [0.0, 0.0] }"#;
        let err = RegionBoundaries::from_geojson("point.json", point).unwrap_err();
        assert!(matches!(err, LoaderError::DataUnavailable { .. }));
    }

    #[test]
    fn rejects_malformed_documents() {
        let err = RegionBoundaries::from_geojson("broken.json", "{ not json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
