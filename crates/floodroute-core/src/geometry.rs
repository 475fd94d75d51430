//! Conversions between GeoJSON values and `geo` geometries.
//!
//! GeoJSON positions are `[lon, lat]`; `geo` coordinates use `x = lon`, `y = lat`.
//! Everything crossing the boundary to the hazard dataset or the directions service
//! goes through these functions so the rest of the crate only sees typed geometries.

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use geojson::{PolygonType, Position, Value};

use crate::error::PlannerError;

/// Typed geometry of a hazard feature.
#[derive(Debug, Clone, PartialEq)]
pub enum HazardGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    /// Absent, non-areal or malformed geometry. Never contributes to avoidance.
    Unsupported,
}

/// Typed geometry of a computed route.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteGeometry {
    Line(LineString<f64>),
    MultiLine(MultiLineString<f64>),
}

impl HazardGeometry {
    /// Convert a GeoJSON geometry value. Malformed members of a multi-polygon are
    /// dropped individually; a malformed single polygon becomes `Unsupported`.
    pub fn from_geojson(value: &Value) -> Self {
        match value {
            Value::Polygon(rings) => match polygon_from_rings(rings) {
                Ok(polygon) => Self::Polygon(polygon),
                Err(err) => {
                    tracing::warn!("Skipping malformed hazard polygon: {}", err);
                    Self::Unsupported
                }
            },
            Value::MultiPolygon(polygons) => {
                let members: Vec<Polygon<f64>> = polygons
                    .iter()
                    .filter_map(|rings| match polygon_from_rings(rings) {
                        Ok(polygon) => Some(polygon),
                        Err(err) => {
                            tracing::warn!("Skipping malformed hazard multipolygon member: {}", err);
                            None
                        }
                    })
                    .collect();
                if members.is_empty() {
                    Self::Unsupported
                } else {
                    Self::MultiPolygon(MultiPolygon::new(members))
                }
            }
            _ => Self::Unsupported,
        }
    }

    /// Flatten to the list of polygons this geometry covers.
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        match self {
            Self::Polygon(polygon) => vec![polygon.clone()],
            Self::MultiPolygon(multi) => multi.0.clone(),
            Self::Unsupported => Vec::new(),
        }
    }
}

impl RouteGeometry {
    pub fn from_geojson(value: &Value) -> Result<Self, PlannerError> {
        match value {
            Value::LineString(positions) => Ok(Self::Line(line_from_positions(positions)?)),
            Value::MultiLineString(lines) => {
                let parts = lines
                    .iter()
                    .map(|positions| line_from_positions(positions))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::MultiLine(MultiLineString::new(parts)))
            }
            other => Err(PlannerError::GeometryComputation(format!(
                "expected LineString or MultiLineString route geometry, got {}",
                geojson_type_name(other)
            ))),
        }
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        let value = match self {
            Self::Line(line) => Value::LineString(positions_from_line(line)),
            Self::MultiLine(multi) => {
                Value::MultiLineString(multi.0.iter().map(positions_from_line).collect())
            }
        };
        geojson::Geometry::new(value)
    }

    /// Coordinates of the first line part (the whole line for single-part routes).
    pub fn first_line(&self) -> &[Coord<f64>] {
        match self {
            Self::Line(line) => &line.0,
            Self::MultiLine(multi) => multi.0.first().map(|line| line.0.as_slice()).unwrap_or(&[]),
        }
    }

    pub fn coord_count(&self) -> usize {
        match self {
            Self::Line(line) => line.0.len(),
            Self::MultiLine(multi) => multi.0.iter().map(|line| line.0.len()).sum(),
        }
    }
}

pub fn polygon_from_rings(rings: &PolygonType) -> Result<Polygon<f64>, PlannerError> {
    let mut rings = rings.iter();
    let exterior = rings
        .next()
        .ok_or_else(|| PlannerError::GeometryComputation("polygon has no rings".to_string()))?;
    let exterior = ring_from_positions(exterior)?;
    let interiors = rings
        .map(|ring| ring_from_positions(ring))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

pub fn polygon_to_rings(polygon: &Polygon<f64>) -> PolygonType {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(positions_from_line)
        .collect()
}

fn ring_from_positions(positions: &[Position]) -> Result<LineString<f64>, PlannerError> {
    let ring = line_from_positions(positions)?;
    // A closed ring needs three distinct vertices plus the closing one; geo closes
    // open rings itself, so three vertices is the floor.
    if ring.0.len() < 3 {
        return Err(PlannerError::GeometryComputation(format!(
            "ring has {} vertices, need at least 3",
            ring.0.len()
        )));
    }
    Ok(ring)
}

fn line_from_positions(positions: &[Position]) -> Result<LineString<f64>, PlannerError> {
    positions
        .iter()
        .map(coord_from_position)
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn coord_from_position(position: &Position) -> Result<Coord<f64>, PlannerError> {
    match position.as_slice() {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Ok(Coord { x: *lon, y: *lat }),
        other => Err(PlannerError::GeometryComputation(format!(
            "invalid position {:?}",
            other
        ))),
    }
}

fn geojson_type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn positions_from_line(line: &LineString<f64>) -> Vec<Position> {
    line.0.iter().map(|c| vec![c.x, c.y]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lon: f64, lat: f64, size: f64) -> Value {
        Value::Polygon(vec![vec![
            vec![lon, lat],
            vec![lon + size, lat],
            vec![lon + size, lat + size],
            vec![lon, lat + size],
            vec![lon, lat],
        ]])
    }

    #[test]
    fn polygon_rings_convert_lon_lat_order() {
        let geometry = HazardGeometry::from_geojson(&square(35.2, 31.9, 0.01));
        let polygons = geometry.polygons();
        assert_eq!(polygons.len(), 1);
        let first = polygons[0].exterior().0[0];
        assert_eq!((first.x, first.y), (35.2, 31.9));
    }

    #[test]
    fn malformed_multipolygon_member_is_dropped() {
        let value = Value::MultiPolygon(vec![
            vec![vec![vec![0.0, 0.0], vec![1.0]]],
            vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ]],
        ]);
        let geometry = HazardGeometry::from_geojson(&value);
        assert_eq!(geometry.polygons().len(), 1);
    }

    #[test]
    fn non_areal_geometry_is_unsupported() {
        let value = Value::Point(vec![35.0, 31.0]);
        assert_eq!(HazardGeometry::from_geojson(&value), HazardGeometry::Unsupported);
    }

    #[test]
    fn route_geometry_rejects_polygons() {
        let err = RouteGeometry::from_geojson(&square(0.0, 0.0, 1.0)).unwrap_err();
        assert!(matches!(err, PlannerError::GeometryComputation(_)));
    }

    #[test]
    fn multiline_route_reports_first_part() {
        let value = Value::MultiLineString(vec![
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            vec![vec![5.0, 6.0], vec![7.0, 8.0], vec![9.0, 10.0]],
        ]);
        let route = RouteGeometry::from_geojson(&value).unwrap();
        assert_eq!(route.first_line().len(), 2);
        assert_eq!(route.coord_count(), 5);
    }
}
