//! Route planning orchestration.
//!
//! Tries a hazard-avoiding route first, falls back to an unconstrained one, and
//! classifies whichever succeeds against the same avoidance snapshot it was
//! requested with.

use std::future::Future;

use crate::error::{PlannerError, SessionError};
use crate::hazard::AvoidanceGeometry;
use crate::models::{Coordinate, RouteResult};
use crate::risk::classify_route;
use crate::rules::RiskRules;
use crate::session::{Classification, ComputeTicket, PlanOutcome, PlanningSession, SessionState};

/// External directions service.
///
/// `avoidance` is a best-effort constraint; implementations must not assume the
/// service honoured it, which is why results are always re-checked.
pub trait DirectionsProvider {
    fn request_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        avoidance: Option<&AvoidanceGeometry>,
    ) -> impl Future<Output = Result<RouteResult, PlannerError>> + Send;
}

/// Outcome of a single directions request.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingAttemptOutcome {
    Success {
        route: RouteResult,
        attempted_with_avoidance: bool,
    },
    Failure(PlannerError),
}

pub struct RoutePlanner<D> {
    directions: D,
    rules: RiskRules,
}

impl<D: DirectionsProvider> RoutePlanner<D> {
    pub fn new(directions: D, rules: RiskRules) -> Self {
        Self { directions, rules }
    }

    pub fn directions(&self) -> &D {
        &self.directions
    }

    /// One directions request, bounded by `route_timeout_ms`.
    pub async fn attempt(
        &self,
        start: Coordinate,
        end: Coordinate,
        avoidance: Option<&AvoidanceGeometry>,
    ) -> RoutingAttemptOutcome {
        let request = self.directions.request_route(start, end, avoidance);
        let result = match tokio::time::timeout(self.rules.route_timeout(), request).await {
            Ok(result) => result,
            Err(_) => Err(PlannerError::ServiceUnavailable {
                status: None,
                body: format!("no response within {} ms", self.rules.route_timeout_ms),
            }),
        };

        match result {
            Ok(route) => RoutingAttemptOutcome::Success {
                route,
                attempted_with_avoidance: avoidance.is_some(),
            },
            Err(err) => RoutingAttemptOutcome::Failure(err),
        }
    }

    /// Resolve a ticket: avoidance-constrained attempt, then one unconstrained retry.
    pub async fn compute(&self, ticket: &ComputeTicket) -> PlanOutcome {
        let avoidance = ticket.avoidance.as_ref();
        tracing::info!(
            "Calculating route {} -> {} ({} avoidance polygons)",
            ticket.start,
            ticket.end,
            avoidance.map(|a| a.len()).unwrap_or(0)
        );

        let constrained_error = match self.attempt(ticket.start, ticket.end, avoidance).await {
            RoutingAttemptOutcome::Success {
                route,
                attempted_with_avoidance,
            } => {
                let route = classify_route(route, avoidance);
                let classification = if route.crosses_hazard {
                    Classification::SafeTouching
                } else {
                    Classification::Safe
                };
                tracing::info!("Route resolved as {:?}", classification);
                return PlanOutcome::Resolved {
                    route,
                    classification,
                    attempted_with_avoidance,
                };
            }
            RoutingAttemptOutcome::Failure(err) => {
                tracing::warn!("Hazard-avoiding route failed, retrying unconstrained: {}", err);
                err
            }
        };

        match self.attempt(ticket.start, ticket.end, None).await {
            RoutingAttemptOutcome::Success { route, .. } => {
                let route = classify_route(route, avoidance);
                let classification = if route.crosses_hazard {
                    Classification::Unsafe
                } else {
                    Classification::UnconstrainedSafe
                };
                tracing::info!("Fallback route resolved as {:?}", classification);
                PlanOutcome::Resolved {
                    route,
                    classification,
                    attempted_with_avoidance: false,
                }
            }
            RoutingAttemptOutcome::Failure(err) => {
                tracing::error!("Unconstrained route failed too: {}", err);
                PlanOutcome::Failed {
                    constrained: avoidance.map(|_| constrained_error),
                    error: err,
                }
            }
        }
    }

    /// Run a full calculation on a session and return the state it ends in.
    pub async fn plan(&self, session: &mut PlanningSession) -> Result<SessionState, SessionError> {
        let ticket = session.begin_computation()?;
        let outcome = self.compute(&ticket).await;
        session.complete(&ticket, outcome);
        Ok(session.state())
    }
}
