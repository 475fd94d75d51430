//! Directions client against an in-process mock service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use floodroute_core::{
    build_avoidance_geometry, Coordinate, DirectionsProvider, FailureKind, HazardCollection,
    PlannerError,
};
use floodroute_ors::{OrsClient, OrsConfig};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct RecordedRequest {
    profile: String,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    response: Value,
    delay: Duration,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn directions(
    State(state): State<MockState>,
    Path(profile): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().unwrap().push(RecordedRequest {
        profile,
        authorization: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, Json(state.response.clone()))
}

struct MockOrs {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockOrs {
    async fn start(status: StatusCode, response: Value) -> Self {
        Self::start_with_delay(status, response, Duration::ZERO).await
    }

    async fn start_with_delay(status: StatusCode, response: Value, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            response,
            delay,
            requests: requests.clone(),
        };
        let app = Router::new()
            .route("/v2/directions/:profile/geojson", post(directions))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    fn client(&self) -> OrsClient {
        OrsClient::new(OrsConfig {
            api_key: Some("secret-key".to_string()),
            base_url: self.base_url.clone(),
            ..OrsConfig::default()
        })
        .unwrap()
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn route_body() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"summary": {"distance": 3120.4, "duration": 290.1}},
            "geometry": {
                "type": "LineString",
                "coordinates": [[35.20, 31.90], [35.21, 31.95], [35.22, 31.92]]
            }
        }]
    })
}

fn start() -> Coordinate {
    Coordinate::new(31.90, 35.20)
}

fn end() -> Coordinate {
    Coordinate::new(31.92, 35.22)
}

#[tokio::test]
async fn successful_request_sends_expected_shape() {
    let server = MockOrs::start(StatusCode::OK, route_body()).await;
    let hazards = HazardCollection::from_geojson_str(
        &json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"gridcode": 4},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[35.205, 31.905], [35.215, 31.905], [35.215, 31.915], [35.205, 31.915], [35.205, 31.905]]]
                }
            }]
        })
        .to_string(),
    )
    .unwrap();
    let avoidance = build_avoidance_geometry(&hazards, 4).unwrap();

    let route = server
        .client()
        .request_route(start(), end(), Some(&avoidance))
        .await
        .unwrap();
    assert_eq!(route.distance_m, Some(3120.4));
    assert_eq!(route.geometry.unwrap().coord_count(), 3);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.profile, "driving-car");
    assert_eq!(request.authorization.as_deref(), Some("secret-key"));
    assert_eq!(request.body["coordinates"], json!([[35.20, 31.90], [35.22, 31.92]]));
    assert_eq!(request.body["radiuses"], json!([6000, 6000]));
    assert_eq!(request.body["options"]["avoid_polygons"]["type"], "MultiPolygon");
}

#[tokio::test]
async fn unconstrained_request_omits_options() {
    let server = MockOrs::start(StatusCode::OK, route_body()).await;
    server.client().request_route(start(), end(), None).await.unwrap();
    assert!(server.requests()[0].body.get("options").is_none());
}

#[tokio::test]
async fn status_codes_map_to_failure_kinds() {
    let cases = [
        (StatusCode::UNAUTHORIZED, FailureKind::AuthFailure),
        (StatusCode::FORBIDDEN, FailureKind::AuthFailure),
        (StatusCode::NOT_FOUND, FailureKind::NotFound),
        (StatusCode::TOO_MANY_REQUESTS, FailureKind::RateLimited),
        (StatusCode::INTERNAL_SERVER_ERROR, FailureKind::ServiceUnavailable),
        (StatusCode::BAD_GATEWAY, FailureKind::ServiceUnavailable),
        (StatusCode::BAD_REQUEST, FailureKind::Unknown),
    ];
    for (status, expected) in cases {
        let server = MockOrs::start(status, json!({"error": {"code": 2010}})).await;
        let err = server
            .client()
            .request_route(start(), end(), None)
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), expected, "status {}", status);
    }
}

#[tokio::test]
async fn error_body_is_kept_for_diagnostics_only() {
    let server = MockOrs::start(
        StatusCode::NOT_FOUND,
        json!({"error": {"code": 2010, "message": "Could not find routable point"}}),
    )
    .await;
    let err = server
        .client()
        .request_route(start(), end(), None)
        .await
        .unwrap_err();

    match &err {
        PlannerError::RouteNotFound { body } => assert!(body.contains("routable point")),
        other => panic!("expected RouteNotFound, got {:?}", other),
    }
    assert!(!err.user_message().contains("routable point"));
}

#[tokio::test]
async fn empty_features_is_route_not_found() {
    let server = MockOrs::start(
        StatusCode::OK,
        json!({"type": "FeatureCollection", "features": []}),
    )
    .await;
    let err = server
        .client()
        .request_route(start(), end(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PlannerError::RouteNotFound { .. }));
}

#[tokio::test]
async fn missing_key_makes_no_request() {
    let server = MockOrs::start(StatusCode::OK, route_body()).await;
    let client = OrsClient::new(OrsConfig {
        api_key: None,
        base_url: server.base_url.clone(),
        ..OrsConfig::default()
    })
    .unwrap();

    let err = client.request_route(start(), end(), None).await.unwrap_err();
    assert_eq!(err, PlannerError::MissingCredential);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn slow_service_times_out_as_unavailable() {
    let server =
        MockOrs::start_with_delay(StatusCode::OK, route_body(), Duration::from_secs(3)).await;
    let client = OrsClient::new(OrsConfig {
        api_key: Some("secret-key".to_string()),
        base_url: server.base_url.clone(),
        timeout_secs: 1,
        ..OrsConfig::default()
    })
    .unwrap();

    let err = client.request_route(start(), end(), None).await.unwrap_err();
    assert!(matches!(
        err,
        PlannerError::ServiceUnavailable { status: None, .. }
    ));
}
