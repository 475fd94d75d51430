//! Shared pieces of the `floodroute` command line tool.

pub mod config;
pub mod positions;

pub use config::Config;
pub use positions::{parse_position_line, PositionFeed};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use floodroute_core::{
    watch_positions, Coordinate, PlannerError, PlanningSession, ProximityMonitor, RouteGeometry,
};
use futures_util::{Stream, StreamExt};

/// Follow a live position stream: each fix moves a tracked start point and feeds the
/// proximity monitor against the session's current avoidance geometry.
pub async fn track_positions<S, F>(
    positions: S,
    session: &mut PlanningSession,
    monitor: &mut ProximityMonitor,
    on_warning: F,
) -> Result<usize, PlannerError>
where
    S: Stream<Item = Result<Coordinate, PlannerError>> + Unpin,
    F: FnMut(&Coordinate, DateTime<Utc>),
{
    let avoidance = session.avoidance_snapshot();
    let positions = positions.inspect(|update| {
        if let Ok(position) = update {
            if let Err(err) = session.position_update(*position) {
                tracing::debug!("Start not moved to {}: {}", position, err);
            }
        }
    });
    watch_positions(positions, avoidance.as_ref(), monitor, on_warning).await
}

/// Pull the first route geometry out of a GeoJSON document (a bare geometry, a
/// feature, or the first feature of a collection).
pub fn route_geometry_from_geojson(text: &str) -> Result<RouteGeometry> {
    let document: geojson::GeoJson = text.parse().context("Failed to parse route GeoJSON")?;
    let geometry = match document {
        geojson::GeoJson::Geometry(geometry) => Some(geometry),
        geojson::GeoJson::Feature(feature) => feature.geometry,
        geojson::GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .next()
            .and_then(|feature| feature.geometry),
    }
    .context("Route GeoJSON contains no geometry")?;

    Ok(RouteGeometry::from_geojson(&geometry.value)?)
}
