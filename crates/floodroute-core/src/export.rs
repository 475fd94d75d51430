//! Hand-off links to external navigation apps.

use url::Url;

use crate::models::{Coordinate, RouteResult};

const GOOGLE_MAPS_DIR_URL: &str = "https://www.google.com/maps/dir/";
/// Google Maps accepts at most this many intermediate waypoints in a link.
const MAX_WAYPOINTS: usize = 10;

/// Build a Google Maps driving-directions link that follows the computed route.
///
/// Up to ten waypoints are sampled evenly from the route's first line so the
/// external app stays close to the hazard-aware path.
pub fn google_maps_directions_url(
    route: Option<&RouteResult>,
    start: Coordinate,
    end: Coordinate,
) -> String {
    let coords = route
        .and_then(|route| route.geometry.as_ref())
        .map(|geometry| geometry.first_line())
        .unwrap_or(&[]);

    let mut waypoints = Vec::new();
    if coords.len() >= 2 {
        let step = (coords.len() / (MAX_WAYPOINTS + 1)).max(1);
        let mut i = step;
        while i < coords.len() - 1 && waypoints.len() < MAX_WAYPOINTS {
            let c = coords[i];
            waypoints.push(format!("{},{}", c.y, c.x));
            i += step;
        }
    }

    let mut url = match Url::parse(GOOGLE_MAPS_DIR_URL) {
        Ok(url) => url,
        Err(err) => {
            tracing::error!("Invalid directions base URL: {}", err);
            return GOOGLE_MAPS_DIR_URL.to_string();
        }
    };
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("api", "1")
            .append_pair("origin", &start.to_string())
            .append_pair("destination", &end.to_string())
            .append_pair("travelmode", "driving");
        if !waypoints.is_empty() {
            query.append_pair("waypoints", &waypoints.join("|"));
        }
    }
    url.into()
}
