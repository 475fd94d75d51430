//! Spatial math for proximity checks and distance calculations.

use geo::{Contains, Coord, LineString, Polygon};

use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using the Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

// ==== Local metric scaling ====

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lat(ref_lat_deg).max(1e-9)
}

/// Minimum distance from a point to a line segment, in meters.
///
/// Projects both onto a local east/north plane anchored at the segment start, which is
/// accurate for the sub-kilometre distances the proximity warning deals with.
pub fn distance_to_segment_m(point: Coord<f64>, seg_start: Coord<f64>, seg_end: Coord<f64>) -> f64 {
    let ref_lat = seg_start.y;
    let m_lat = meters_per_deg_lat(ref_lat);
    let m_lon = meters_per_deg_lon(ref_lat);

    let px = (point.x - seg_start.x) * m_lon;
    let py = (point.y - seg_start.y) * m_lat;
    let sx = (seg_end.x - seg_start.x) * m_lon;
    let sy = (seg_end.y - seg_start.y) * m_lat;

    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < 0.0001 {
        return (px * px + py * py).sqrt();
    }

    // t = ((P-A) . (B-A)) / |B-A|^2
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);
    let dx = px - t * sx;
    let dy = py - t * sy;
    (dx * dx + dy * dy).sqrt()
}

/// Minimum distance from a point to any edge of a ring, in meters.
pub fn distance_to_ring_m(point: Coord<f64>, ring: &LineString<f64>) -> f64 {
    ring.lines()
        .map(|line| distance_to_segment_m(point, line.start, line.end))
        .fold(f64::INFINITY, f64::min)
}

/// Distance from a point to a polygon in meters: zero inside, otherwise the distance
/// to the nearest edge of the exterior or any hole.
pub fn distance_to_polygon_m(position: &Coordinate, polygon: &Polygon<f64>) -> f64 {
    let point = position.to_point();
    if polygon.contains(&point) {
        return 0.0;
    }
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(|ring| distance_to_ring_m(point.0, ring))
        .fold(f64::INFINITY, f64::min)
}

/// Whether a point lies inside the `buffer_m` buffer of a polygon.
pub fn within_buffer(position: &Coordinate, polygon: &Polygon<f64>, buffer_m: f64) -> bool {
    distance_to_polygon_m(position, polygon) <= buffer_m.max(0.0)
}
