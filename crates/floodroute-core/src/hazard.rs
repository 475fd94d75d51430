//! High-risk area extraction.
//!
//! Turns a hazard collection into the single multi-polygon handed to the directions
//! service as an avoidance constraint and reused by the risk and proximity checks.

use geo::{MultiPolygon, Polygon};
use geojson::Value;

use crate::geometry::polygon_to_rings;
use crate::models::HazardCollection;

/// Flat collection of every polygon at or above the risk threshold.
///
/// The polygons are listed, not geometrically unioned, in dataset order.
#[derive(Debug, Clone, PartialEq)]
pub struct AvoidanceGeometry {
    polygons: MultiPolygon<f64>,
}

impl AvoidanceGeometry {
    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.polygons.0
    }

    pub fn len(&self) -> usize {
        self.polygons.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    /// GeoJSON `MultiPolygon` geometry, the shape the directions service accepts for
    /// `avoid_polygons`.
    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(Value::MultiPolygon(
            self.polygons.0.iter().map(polygon_to_rings).collect(),
        ))
    }
}

/// Build the avoidance geometry from every feature with severity >= `threshold`.
///
/// Returns `None` when no feature qualifies, meaning no constraint is needed.
/// Features with missing or invalid severity are treated as below threshold.
pub fn build_avoidance_geometry(
    hazards: &HazardCollection,
    threshold: u8,
) -> Option<AvoidanceGeometry> {
    let mut qualifying = 0usize;
    let polygons: Vec<Polygon<f64>> = hazards
        .features()
        .iter()
        .filter(|feature| feature.meets_threshold(threshold))
        .inspect(|_| qualifying += 1)
        .flat_map(|feature| feature.geometry.polygons())
        .collect();

    if polygons.is_empty() {
        if qualifying > 0 {
            tracing::warn!(
                "{} hazard features meet threshold {} but none has usable polygon geometry",
                qualifying,
                threshold
            );
        }
        return None;
    }

    tracing::debug!(
        "Avoidance geometry: {} polygons from {} features (threshold {})",
        polygons.len(),
        qualifying,
        threshold
    );

    Some(AvoidanceGeometry {
        polygons: MultiPolygon::new(polygons),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HazardGeometry;
    use crate::models::HazardFeature;
    use geo::polygon;

    fn square(lon: f64, lat: f64) -> Polygon<f64> {
        polygon![
            (x: lon, y: lat),
            (x: lon + 0.01, y: lat),
            (x: lon + 0.01, y: lat + 0.01),
            (x: lon, y: lat + 0.01),
        ]
    }

    fn feature(severity: Option<u8>, geometry: HazardGeometry) -> HazardFeature {
        HazardFeature::new(severity, geometry)
    }

    #[test]
    fn filters_by_threshold_and_flattens_multipolygons() {
        let hazards = HazardCollection::new(vec![
            feature(Some(5), HazardGeometry::Polygon(square(35.0, 31.0))),
            feature(Some(2), HazardGeometry::Polygon(square(35.1, 31.0))),
            feature(
                Some(4),
                HazardGeometry::MultiPolygon(MultiPolygon::new(vec![
                    square(35.2, 31.0),
                    square(35.3, 31.0),
                ])),
            ),
        ]);

        let avoidance = build_avoidance_geometry(&hazards, 4).unwrap();
        assert_eq!(avoidance.len(), 3);
        assert_eq!(avoidance.polygons()[0], square(35.0, 31.0));
        assert_eq!(avoidance.polygons()[2], square(35.3, 31.0));
    }

    #[test]
    fn none_when_nothing_meets_threshold() {
        let hazards = HazardCollection::new(vec![
            feature(Some(3), HazardGeometry::Polygon(square(35.0, 31.0))),
            feature(None, HazardGeometry::Polygon(square(35.1, 31.0))),
        ]);
        assert!(build_avoidance_geometry(&hazards, 4).is_none());
        assert!(build_avoidance_geometry(&HazardCollection::default(), 4).is_none());
    }

    #[test]
    fn invalid_severity_is_excluded_even_at_lowest_threshold() {
        let hazards = HazardCollection::new(vec![feature(
            None,
            HazardGeometry::Polygon(square(35.0, 31.0)),
        )]);
        assert!(build_avoidance_geometry(&hazards, 1).is_none());
    }

    #[test]
    fn qualifying_feature_without_polygons_yields_none() {
        let hazards = HazardCollection::new(vec![feature(Some(5), HazardGeometry::Unsupported)]);
        assert!(build_avoidance_geometry(&hazards, 4).is_none());
    }

    #[test]
    fn repeated_builds_are_identical() {
        let hazards = HazardCollection::new(vec![
            feature(Some(4), HazardGeometry::Polygon(square(35.0, 31.0))),
            feature(Some(5), HazardGeometry::Polygon(square(35.5, 31.5))),
        ]);
        for threshold in 1..=5 {
            assert_eq!(
                build_avoidance_geometry(&hazards, threshold),
                build_avoidance_geometry(&hazards, threshold)
            );
        }
    }

    #[test]
    fn geojson_output_is_a_multipolygon() {
        let hazards = HazardCollection::new(vec![feature(
            Some(5),
            HazardGeometry::Polygon(square(35.0, 31.0)),
        )]);
        let geometry = build_avoidance_geometry(&hazards, 4).unwrap().to_geojson();
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["type"], "MultiPolygon");
        assert_eq!(json["coordinates"][0][0][0][0], 35.0);
        assert_eq!(json["coordinates"][0][0][0][1], 31.0);
    }
}
