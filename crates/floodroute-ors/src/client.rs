//! Directions HTTP client.

use std::future::Future;
use std::time::Duration;

use floodroute_core::{
    AvoidanceGeometry, Coordinate, DirectionsProvider, PlannerError, RouteGeometry, RouteResult,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";

/// Directions service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Routing profile, e.g. `driving-car`
    pub profile: String,
    /// How far the service may move each endpoint to reach the road network
    pub snap_radius_m: u32,
    pub timeout_secs: u64,
}

impl Default for OrsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            profile: "driving-car".to_string(),
            snap_radius_m: 6_000,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
    radiuses: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<DirectionsOptions>,
}

#[derive(Debug, Serialize)]
struct DirectionsOptions {
    avoid_polygons: geojson::Geometry,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<RouteFeature>,
}

#[derive(Debug, Deserialize)]
struct RouteFeature {
    geometry: geojson::Geometry,
    #[serde(default)]
    properties: RouteProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RouteProperties {
    #[serde(default)]
    summary: RouteSummary,
}

#[derive(Debug, Default, Deserialize)]
struct RouteSummary {
    distance: Option<f64>,
    duration: Option<f64>,
}

/// HTTP client for the OpenRouteService directions API.
pub struct OrsClient {
    client: Client,
    config: OrsConfig,
}

impl OrsClient {
    pub fn new(config: OrsConfig) -> Result<Self, PlannerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| PlannerError::Unknown(format!("failed to create HTTP client: {}", err)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OrsConfig {
        &self.config
    }

    fn directions_url(&self) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        )
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn request_body(
        &self,
        start: Coordinate,
        end: Coordinate,
        avoidance: Option<&AvoidanceGeometry>,
    ) -> DirectionsRequest {
        let snap = self.config.snap_radius_m;
        DirectionsRequest {
            coordinates: [start.lon_lat(), end.lon_lat()],
            radiuses: [snap, snap],
            options: avoidance.map(|geometry| DirectionsOptions {
                avoid_polygons: geometry.to_geojson(),
            }),
        }
    }

    /// Request a driving route between two points.
    pub async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        avoidance: Option<&AvoidanceGeometry>,
    ) -> Result<RouteResult, PlannerError> {
        let body = self.request_body(start, end, avoidance);
        self.post_directions(&body).await
    }

    async fn post_directions(&self, body: &DirectionsRequest) -> Result<RouteResult, PlannerError> {
        let Some(api_key) = self.api_key() else {
            tracing::warn!("Directions request skipped: no API key configured");
            return Err(PlannerError::MissingCredential);
        };

        let url = self.directions_url();
        tracing::debug!(
            "POST {} (avoid_polygons: {})",
            url,
            body.options.is_some()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", api_key)
            .header("Accept", "application/json, application/geo+json")
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        if let Some(err) = PlannerError::from_status(status, text.clone()) {
            tracing::warn!("Directions request failed: {} {}", status, text);
            return Err(err);
        }

        parse_route(&text)
    }
}

impl DirectionsProvider for OrsClient {
    fn request_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        avoidance: Option<&AvoidanceGeometry>,
    ) -> impl Future<Output = Result<RouteResult, PlannerError>> + Send {
        let body = self.request_body(start, end, avoidance);
        async move { self.post_directions(&body).await }
    }
}

fn transport_error(err: reqwest::Error) -> PlannerError {
    if err.is_timeout() {
        tracing::warn!("Directions request timed out: {}", err);
        PlannerError::ServiceUnavailable {
            status: None,
            body: err.to_string(),
        }
    } else {
        tracing::warn!("Directions request failed to send: {}", err);
        PlannerError::Unknown(err.to_string())
    }
}

fn parse_route(text: &str) -> Result<RouteResult, PlannerError> {
    let payload: DirectionsResponse = serde_json::from_str(text).map_err(|err| {
        tracing::warn!("Malformed directions response: {}", err);
        PlannerError::Unknown(format!("malformed directions response: {}", err))
    })?;

    let Some(feature) = payload.features.into_iter().next() else {
        return Err(PlannerError::RouteNotFound {
            body: "response contained no route features".to_string(),
        });
    };

    let geometry = RouteGeometry::from_geojson(&feature.geometry.value)?;
    let summary = feature.properties.summary;
    tracing::debug!(
        "Route received: {} coordinates, {:?} m",
        geometry.coord_count(),
        summary.distance
    );

    Ok(RouteResult::new(Some(geometry), summary.distance).with_duration(summary.duration))
}
