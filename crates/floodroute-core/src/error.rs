//! Error taxonomy shared by the routing, location and geometry layers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by external collaborators (directions service, location provider)
/// or by the geometry layer.
///
/// HTTP-derived variants keep the raw status and body for diagnostics. The body is part
/// of `Display` (which is what gets logged) but never of [`PlannerError::user_message`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlannerError {
    #[error("directions service credential is missing")]
    MissingCredential,

    #[error("directions service rejected the credential ({status}): {body}")]
    AuthRejected { status: u16, body: String },

    #[error("no route found between the requested points: {body}")]
    RouteNotFound { body: String },

    #[error("directions service rate limit exceeded: {body}")]
    RateLimited { body: String },

    #[error("directions service unavailable ({}): {}", status_label(.status), .body)]
    ServiceUnavailable { status: Option<u16>, body: String },

    #[error("location permission denied")]
    LocationDenied,

    #[error("location unavailable")]
    LocationUnavailable,

    #[error("timed out waiting for a location fix")]
    LocationTimeout,

    #[error("geometry computation failed: {0}")]
    GeometryComputation(String),

    #[error("unexpected failure: {0}")]
    Unknown(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no status".to_string(),
    }
}

/// Coarse failure classes used for routing outcomes and user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AuthFailure,
    NotFound,
    RateLimited,
    ServiceUnavailable,
    Location,
    Geometry,
    Unknown,
}

impl PlannerError {
    /// Classify an HTTP status from the directions service.
    ///
    /// Returns `None` for success statuses.
    pub fn from_status(status: u16, body: impl Into<String>) -> Option<Self> {
        let body = body.into();
        match status {
            200..=299 => None,
            401 | 403 => Some(Self::AuthRejected { status, body }),
            404 => Some(Self::RouteNotFound { body }),
            429 => Some(Self::RateLimited { body }),
            500.. => Some(Self::ServiceUnavailable {
                status: Some(status),
                body,
            }),
            _ => Some(Self::Unknown(format!("status {}: {}", status, body))),
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::MissingCredential | Self::AuthRejected { .. } => FailureKind::AuthFailure,
            Self::RouteNotFound { .. } => FailureKind::NotFound,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::ServiceUnavailable { .. } => FailureKind::ServiceUnavailable,
            Self::LocationDenied | Self::LocationUnavailable | Self::LocationTimeout => {
                FailureKind::Location
            }
            Self::GeometryComputation(_) => FailureKind::Geometry,
            Self::Unknown(_) => FailureKind::Unknown,
        }
    }

    /// Message suitable for an end user. Never includes the raw service body.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCredential => {
                "The routing service key is not configured. Set ORS_API_KEY and try again."
            }
            Self::AuthRejected { .. } => {
                "The routing service could not be used because of a problem with the API key."
            }
            Self::RouteNotFound { .. } => {
                "No road route was found between the two points. Pick a point closer to a clear road and try again."
            }
            Self::RateLimited { .. } => {
                "The routing service usage limit was exceeded. Try again in a little while."
            }
            Self::ServiceUnavailable { .. } => {
                "The routing service is temporarily unavailable. Try again later."
            }
            Self::LocationDenied => {
                "Location permission was denied. Allow location access or pick the start point manually."
            }
            Self::LocationUnavailable => {
                "Your location is unavailable. Enable location services or pick the start point manually."
            }
            Self::LocationTimeout => {
                "Locating you took too long. Retry or pick the start point manually."
            }
            Self::GeometryComputation(_) => "The hazard check could not be completed for this route.",
            Self::Unknown(_) => "The route could not be calculated. Please try again.",
        }
    }
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthFailure => "auth_failure",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Location => "location",
            Self::Geometry => "geometry",
            Self::Unknown => "unknown",
        }
    }
}

/// Rejected session transitions. These never mutate session state.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a route computation is already in flight")]
    Busy,
    #[error("start point is not set")]
    StartMissing,
    #[error("end point is not set")]
    EndMissing,
    #[error("waiting for the device location before accepting an end point")]
    AwaitingLocation,
    #[error("hazard layer has not been loaded")]
    HazardsNotLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_service_codes() {
        assert!(PlannerError::from_status(200, "").is_none());
        assert_eq!(
            PlannerError::from_status(403, "bad key").map(|e| e.failure_kind()),
            Some(FailureKind::AuthFailure)
        );
        assert_eq!(
            PlannerError::from_status(404, "").map(|e| e.failure_kind()),
            Some(FailureKind::NotFound)
        );
        assert_eq!(
            PlannerError::from_status(429, "").map(|e| e.failure_kind()),
            Some(FailureKind::RateLimited)
        );
        assert_eq!(
            PlannerError::from_status(503, "").map(|e| e.failure_kind()),
            Some(FailureKind::ServiceUnavailable)
        );
        assert_eq!(
            PlannerError::from_status(400, "").map(|e| e.failure_kind()),
            Some(FailureKind::Unknown)
        );
    }

    #[test]
    fn any_status_from_500_up_is_unavailable() {
        for status in [500, 599, 600, 999] {
            let err = PlannerError::from_status(status, "").unwrap();
            assert_eq!(err.failure_kind(), FailureKind::ServiceUnavailable, "status {}", status);
            assert_eq!(err.failure_kind().as_str(), "service_unavailable");
        }
    }

    #[test]
    fn user_message_hides_raw_body() {
        let err = PlannerError::from_status(404, "{\"error\":\"secret internals\"}").unwrap();
        assert!(!err.user_message().contains("secret"));
        assert!(err.to_string().contains("secret internals"));
    }

    #[test]
    fn each_routing_kind_has_distinct_message() {
        let errors = [
            PlannerError::AuthRejected { status: 401, body: String::new() },
            PlannerError::RouteNotFound { body: String::new() },
            PlannerError::RateLimited { body: String::new() },
            PlannerError::ServiceUnavailable { status: Some(502), body: String::new() },
            PlannerError::Unknown(String::new()),
        ];
        let messages: std::collections::HashSet<_> =
            errors.iter().map(|e| e.user_message()).collect();
        assert_eq!(messages.len(), errors.len());
    }
}
