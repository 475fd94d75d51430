//! Core data models for hazard-aware routing.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::geometry::{HazardGeometry, RouteGeometry};

/// Default property carrying the severity class in hazard datasets.
pub const DEFAULT_SEVERITY_PROPERTY: &str = "gridcode";

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 5;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// `[lon, lat]`, the order used by GeoJSON and the directions service.
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn to_point(&self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid coordinate {0:?}, expected \"lat,lon\" in decimal degrees")]
pub struct ParseCoordinateError(pub String);

impl FromStr for Coordinate {
    type Err = ParseCoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCoordinateError(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(err)?;
        let lat: f64 = lat.trim().parse().map_err(|_| err())?;
        let lon: f64 = lon.trim().parse().map_err(|_| err())?;
        let coordinate = Coordinate::new(lat, lon);
        if !coordinate.is_valid() {
            return Err(err());
        }
        Ok(coordinate)
    }
}

/// One hazard polygon (or multi-polygon) with its risk class.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardFeature {
    /// Severity class 1-5. `None` when the attribute is missing or invalid.
    pub severity: Option<u8>,
    pub geometry: HazardGeometry,
}

impl HazardFeature {
    pub fn new(severity: Option<u8>, geometry: HazardGeometry) -> Self {
        Self { severity, geometry }
    }

    /// Missing or invalid severities never meet a threshold.
    pub fn meets_threshold(&self, threshold: u8) -> bool {
        matches!(self.severity, Some(severity) if severity >= threshold)
    }
}

/// Parse a severity attribute. Accepts integral numbers and numeric strings in 1..=5.
pub fn parse_severity(value: &JsonValue) -> Option<u8> {
    let raw = match value {
        JsonValue::Number(number) => number.as_f64()?,
        JsonValue::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() || raw.fract() != 0.0 {
        return None;
    }
    if raw < MIN_SEVERITY as f64 || raw > MAX_SEVERITY as f64 {
        return None;
    }
    Some(raw as u8)
}

#[derive(Debug, Error)]
pub enum HazardLoadError {
    #[error("failed to read hazard dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("hazard dataset is not valid GeoJSON: {0}")]
    Parse(String),
    #[error("hazard dataset must be a FeatureCollection")]
    NotFeatureCollection,
}

/// Ordered, read-only set of hazard features loaded once per session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardCollection {
    features: Vec<HazardFeature>,
}

impl HazardCollection {
    pub fn new(features: Vec<HazardFeature>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[HazardFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn from_geojson_str(text: &str) -> Result<Self, HazardLoadError> {
        Self::from_geojson_str_with_property(text, DEFAULT_SEVERITY_PROPERTY)
    }

    pub fn from_geojson_str_with_property(
        text: &str,
        severity_property: &str,
    ) -> Result<Self, HazardLoadError> {
        let parsed: GeoJson = text
            .parse()
            .map_err(|err: geojson::Error| HazardLoadError::Parse(err.to_string()))?;
        let GeoJson::FeatureCollection(collection) = parsed else {
            return Err(HazardLoadError::NotFeatureCollection);
        };

        let features: Vec<HazardFeature> = collection
            .features
            .iter()
            .map(|feature| {
                let severity = feature
                    .property(severity_property)
                    .and_then(parse_severity);
                let geometry = feature
                    .geometry
                    .as_ref()
                    .map(|geometry| HazardGeometry::from_geojson(&geometry.value))
                    .unwrap_or(HazardGeometry::Unsupported);
                HazardFeature::new(severity, geometry)
            })
            .collect();

        let invalid = features.iter().filter(|f| f.severity.is_none()).count();
        if invalid > 0 {
            tracing::warn!(
                "{} of {} hazard features have a missing or invalid '{}' value",
                invalid,
                features.len(),
                severity_property
            );
        }
        tracing::debug!("Loaded {} hazard features", features.len());

        Ok(Self { features })
    }

    /// Load a hazard file, reading severity from `severity_property`.
    pub fn from_path(
        path: impl AsRef<Path>,
        severity_property: &str,
    ) -> Result<Self, HazardLoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_geojson_str_with_property(&text, severity_property)
    }
}

/// A computed route and its hazard classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub geometry: Option<RouteGeometry>,
    /// Route length reported by the directions service
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
    /// Whether the route touches or crosses the high-risk areas
    pub crosses_hazard: bool,
    /// False when the intersection check could not run (malformed geometry)
    pub risk_verified: bool,
}

impl RouteResult {
    /// A freshly fetched route, not yet classified against hazards.
    pub fn new(geometry: Option<RouteGeometry>, distance_m: Option<f64>) -> Self {
        Self {
            geometry,
            distance_m,
            duration_s: None,
            crosses_hazard: false,
            risk_verified: false,
        }
    }

    pub fn with_duration(mut self, duration_s: Option<f64>) -> Self {
        self.duration_s = duration_s;
        self
    }

    pub fn distance_km(&self) -> Option<f64> {
        self.distance_m.map(|m| m / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_severity(&json!(4)), Some(4));
        assert_eq!(parse_severity(&json!(5.0)), Some(5));
        assert_eq!(parse_severity(&json!(" 3 ")), Some(3));
    }

    #[test]
    fn severity_rejects_invalid_values() {
        assert_eq!(parse_severity(&json!(null)), None);
        assert_eq!(parse_severity(&json!("high")), None);
        assert_eq!(parse_severity(&json!(4.5)), None);
        assert_eq!(parse_severity(&json!(0)), None);
        assert_eq!(parse_severity(&json!(9)), None);
        assert_eq!(parse_severity(&json!([4])), None);
    }

    #[test]
    fn coordinate_parses_lat_lon() {
        let coordinate: Coordinate = "31.90, 35.20".parse().unwrap();
        assert_eq!(coordinate, Coordinate::new(31.90, 35.20));
        assert_eq!(coordinate.lon_lat(), [35.20, 31.90]);
        assert!("91,0".parse::<Coordinate>().is_err());
        assert!("31.9".parse::<Coordinate>().is_err());
    }

    #[test]
    fn loads_feature_collection_with_mixed_features() {
        let text = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"gridcode": 5},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[35.2, 31.9], [35.21, 31.9], [35.21, 31.91], [35.2, 31.9]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"gridcode": "bad"},
                    "geometry": null
                }
            ]
        })
        .to_string();

        let hazards = HazardCollection::from_geojson_str(&text).unwrap();
        assert_eq!(hazards.len(), 2);
        assert_eq!(hazards.features()[0].severity, Some(5));
        assert_eq!(hazards.features()[1].severity, None);
        assert_eq!(hazards.features()[1].geometry, HazardGeometry::Unsupported);
    }

    #[test]
    fn rejects_non_collection_geojson() {
        let text = r#"{"type": "Point", "coordinates": [35.2, 31.9]}"#;
        assert!(matches!(
            HazardCollection::from_geojson_str(text),
            Err(HazardLoadError::NotFeatureCollection)
        ));
    }

    #[test]
    fn loads_from_file_with_custom_property() {
        let path = std::env::temp_dir().join(format!("floodroute-hazards-{}.geojson", std::process::id()));
        let text = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"risk": 4},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[35.0, 31.0], [35.1, 31.0], [35.1, 31.1], [35.0, 31.0]]]
                }
            }]
        });
        std::fs::write(&path, text.to_string()).unwrap();

        let hazards = HazardCollection::from_path(&path, "risk");
        std::fs::remove_file(&path).unwrap();
        assert_eq!(hazards.unwrap().features()[0].severity, Some(4));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = HazardCollection::from_path("/nonexistent/hazards.geojson", DEFAULT_SEVERITY_PROPERTY);
        assert!(matches!(result, Err(HazardLoadError::Io(_))));
    }
}
