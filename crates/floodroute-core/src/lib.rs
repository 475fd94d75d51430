//! Core logic for flood-hazard-aware route planning.
//!
//! Builds avoidance geometry from a hazard layer, classifies routes from an
//! external directions service against it, and raises proximity warnings for
//! live positions.

pub mod error;
pub mod export;
pub mod geometry;
pub mod hazard;
pub mod location;
pub mod models;
pub mod planner;
pub mod proximity;
pub mod risk;
pub mod rules;
pub mod session;
pub mod spatial;

pub use error::{FailureKind, PlannerError, SessionError};
pub use export::google_maps_directions_url;
pub use geometry::{HazardGeometry, RouteGeometry};
pub use hazard::{build_avoidance_geometry, AvoidanceGeometry};
pub use location::{acquire_start_fix, LocationProvider};
pub use models::{Coordinate, HazardCollection, HazardFeature, HazardLoadError, RouteResult};
pub use planner::{DirectionsProvider, RoutePlanner, RoutingAttemptOutcome};
pub use proximity::{check_proximity, watch_positions, ProximityMonitor, WarnDecision};
pub use risk::{classify_route, intersects_hazard, try_intersects_hazard};
pub use rules::RiskRules;
pub use session::{
    Classification, ComputeTicket, LocationMode, PlanOutcome, PlanningSession, SessionState,
};
pub use spatial::haversine_distance;
