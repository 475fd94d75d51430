//! Route / hazard intersection checks.

use geo::{Intersects, LineString, Point, Polygon};

use crate::error::PlannerError;
use crate::geometry::RouteGeometry;
use crate::hazard::AvoidanceGeometry;
use crate::models::RouteResult;

/// Check whether a route touches or crosses the high-risk areas.
///
/// Never fails: a missing route geometry or avoidance geometry means `false`, and a
/// geometry that cannot be checked is logged and also reported as `false`. Use
/// [`try_intersects_hazard`] when the caller needs to tell the two apart.
pub fn intersects_hazard(route: &RouteResult, avoidance: Option<&AvoidanceGeometry>) -> bool {
    match try_intersects_hazard(route, avoidance) {
        Ok(hit) => hit,
        Err(err) => {
            tracing::warn!("Route hazard check failed, treating as no intersection: {}", err);
            false
        }
    }
}

/// Like [`intersects_hazard`] but surfaces geometry failures.
pub fn try_intersects_hazard(
    route: &RouteResult,
    avoidance: Option<&AvoidanceGeometry>,
) -> Result<bool, PlannerError> {
    let Some(avoidance) = avoidance else {
        return Ok(false);
    };
    let Some(geometry) = route.geometry.as_ref() else {
        return Ok(false);
    };

    let lines = validate_route(geometry)?;
    Ok(lines.iter().any(|line| {
        avoidance
            .polygons()
            .iter()
            .any(|polygon| part_intersects(line, polygon))
    }))
}

/// A one-vertex part has no segments, so it is tested as a point.
fn part_intersects(line: &LineString<f64>, polygon: &Polygon<f64>) -> bool {
    match line.0.as_slice() {
        [single] => polygon.intersects(&Point::from(*single)),
        _ => line.intersects(polygon),
    }
}

/// Stamp a route with its hazard classification against the given snapshot.
pub fn classify_route(mut route: RouteResult, avoidance: Option<&AvoidanceGeometry>) -> RouteResult {
    match try_intersects_hazard(&route, avoidance) {
        Ok(hit) => {
            route.crosses_hazard = hit;
            route.risk_verified = true;
        }
        Err(err) => {
            tracing::warn!("Route left unclassified: {}", err);
            route.crosses_hazard = false;
            route.risk_verified = false;
        }
    }
    route
}

fn validate_route(geometry: &RouteGeometry) -> Result<Vec<&LineString<f64>>, PlannerError> {
    let lines: Vec<&LineString<f64>> = match geometry {
        RouteGeometry::Line(line) => vec![line],
        RouteGeometry::MultiLine(multi) => multi.0.iter().collect(),
    };
    if lines.iter().all(|line| line.0.is_empty()) {
        return Err(PlannerError::GeometryComputation(
            "route geometry has no coordinates".to_string(),
        ));
    }
    let finite = lines
        .iter()
        .flat_map(|line| line.0.iter())
        .all(|c| c.x.is_finite() && c.y.is_finite());
    if !finite {
        return Err(PlannerError::GeometryComputation(
            "route geometry has non-finite coordinates".to_string(),
        ));
    }
    Ok(lines)
}
