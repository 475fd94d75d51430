//! Planning session state machine.
//!
//! A session owns the start/end points, the current route and the hazard snapshot.
//! Route computation is split in three steps so the network call never borrows the
//! session: [`PlanningSession::begin_computation`] hands out a [`ComputeTicket`], the
//! planner resolves it, and [`PlanningSession::complete`] applies the outcome only if
//! the ticket is still current. A reset in between makes the late result a no-op.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, SessionError};
use crate::hazard::{build_avoidance_geometry, AvoidanceGeometry};
use crate::models::{Coordinate, HazardCollection, RouteResult};
use crate::rules::RiskRules;

/// Hazard classification of a resolved route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Hazard-avoiding request succeeded and the route stays clear
    Safe,
    /// Hazard-avoiding request succeeded but the route still touches a hazard
    SafeTouching,
    /// Only an unconstrained route was found and it crosses a hazard
    Unsafe,
    /// Only an unconstrained route was found; it happens to stay clear
    UnconstrainedSafe,
}

impl Classification {
    /// Whether the route was planned around the high-risk areas.
    pub fn is_constrained(&self) -> bool {
        matches!(self, Self::Safe | Self::SafeTouching)
    }

    /// Short description for the end user.
    pub fn summary(&self, distance_m: Option<f64>) -> String {
        let length = distance_m
            .map(|m| format!(" ({:.0} m, {:.2} km)", m, m / 1000.0))
            .unwrap_or_default();
        match self {
            Self::Safe => format!("Safe route found{}.", length),
            Self::SafeTouching => format!(
                "Relatively safe route found{}. It may touch high-risk flood areas.",
                length
            ),
            Self::Unsafe => format!(
                "Route available{} but it passes through high-risk flood areas.",
                length
            ),
            Self::UnconstrainedSafe => format!(
                "Route available{}. It was not planned around hazards and may not avoid them fully.",
                length
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingStart,
    AwaitingEnd,
    Ready,
    Computing,
    Resolved(Classification),
    Failed,
}

/// Where the start point comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMode {
    /// Waiting for the first device fix
    Locating,
    /// Start follows the device position
    Tracking,
    /// Location failed; the user picks start and end by hand
    Manual,
}

/// Everything a route computation needs, frozen when it starts.
#[derive(Debug, Clone)]
pub struct ComputeTicket {
    generation: u64,
    pub start: Coordinate,
    pub end: Coordinate,
    /// Avoidance snapshot used for both the request and the classification
    pub avoidance: Option<AvoidanceGeometry>,
}

impl ComputeTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of one computation, as applied to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Resolved {
        route: RouteResult,
        classification: Classification,
        attempted_with_avoidance: bool,
    },
    Failed {
        /// Failure of the hazard-avoiding attempt, when one was made and failed
        constrained: Option<PlannerError>,
        /// Failure of the final (unconstrained) attempt
        error: PlannerError,
    },
}

#[derive(Debug, Clone)]
pub struct PlanningSession {
    rules: RiskRules,
    hazards: Option<Arc<HazardCollection>>,
    state: SessionState,
    location_mode: LocationMode,
    start: Option<Coordinate>,
    end: Option<Coordinate>,
    route: Option<RouteResult>,
    last_error: Option<PlannerError>,
    generation: u64,
}

impl PlanningSession {
    pub fn new(rules: RiskRules) -> Self {
        Self {
            rules,
            hazards: None,
            state: SessionState::Idle,
            location_mode: LocationMode::Locating,
            start: None,
            end: None,
            route: None,
            last_error: None,
            generation: 0,
        }
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn location_mode(&self) -> LocationMode {
        self.location_mode
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.start
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.end
    }

    /// The current route, if the last computation resolved and nothing changed since.
    pub fn route(&self) -> Option<&RouteResult> {
        self.route.as_ref()
    }

    pub fn last_error(&self) -> Option<&PlannerError> {
        self.last_error.as_ref()
    }

    pub fn is_computing(&self) -> bool {
        self.state == SessionState::Computing
    }

    /// Replace the hazard snapshot. In-flight computations keep the snapshot they
    /// started with.
    pub fn load_hazards(&mut self, hazards: Arc<HazardCollection>) {
        tracing::info!("Hazard layer loaded ({} features)", hazards.len());
        self.hazards = Some(hazards);
    }

    /// Avoidance geometry for the current snapshot and threshold.
    pub fn avoidance_snapshot(&self) -> Option<AvoidanceGeometry> {
        self.hazards
            .as_deref()
            .and_then(|hazards| build_avoidance_geometry(hazards, self.rules.high_risk_threshold))
    }

    /// Idle -> AwaitingStart.
    pub fn begin(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::AwaitingStart;
        }
    }

    /// Apply a successful device fix as the start point.
    pub fn location_fixed(&mut self, position: Coordinate) -> Result<(), SessionError> {
        self.set_start(position)?;
        self.location_mode = LocationMode::Tracking;
        Ok(())
    }

    /// Switch to manual point selection after a failed fix.
    pub fn location_failed(&mut self, error: &PlannerError) {
        tracing::warn!("Switching to manual start selection: {}", error);
        self.location_mode = LocationMode::Manual;
        self.begin();
    }

    /// Interpret a map click: in manual mode the first click picks the start, every
    /// other click picks the end.
    pub fn handle_map_click(&mut self, position: Coordinate) -> Result<(), SessionError> {
        match (self.location_mode, self.start) {
            (LocationMode::Manual, None) => self.set_start(position),
            (_, None) => Err(SessionError::AwaitingLocation),
            (_, Some(_)) => self.set_end(position),
        }
    }

    /// Live position update. In `Tracking` mode the start point follows the device,
    /// under the same rules as [`PlanningSession::set_start`]. Returns whether the start
    /// moved; other modes, invalid fixes and unchanged positions leave it alone.
    pub fn position_update(&mut self, position: Coordinate) -> Result<bool, SessionError> {
        if self.location_mode != LocationMode::Tracking
            || !position.is_valid()
            || self.start == Some(position)
        {
            return Ok(false);
        }
        self.set_start(position)?;
        Ok(true)
    }

    pub fn set_start(&mut self, position: Coordinate) -> Result<(), SessionError> {
        if self.is_computing() {
            return Err(SessionError::Busy);
        }
        self.start = Some(position);
        self.discard_result();
        self.state = if self.end.is_some() {
            SessionState::Ready
        } else {
            SessionState::AwaitingEnd
        };
        Ok(())
    }

    pub fn set_end(&mut self, position: Coordinate) -> Result<(), SessionError> {
        if self.is_computing() {
            return Err(SessionError::Busy);
        }
        if self.start.is_none() {
            return Err(SessionError::StartMissing);
        }
        self.end = Some(position);
        self.discard_result();
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Clear the end point and any route. Cancels an in-flight computation.
    pub fn reset_end(&mut self) {
        self.generation += 1;
        self.end = None;
        self.discard_result();
        self.state = if self.start.is_some() {
            SessionState::AwaitingEnd
        } else {
            SessionState::AwaitingStart
        };
    }

    /// Start over: clears points and route, returns to locating. Cancels an in-flight
    /// computation. The hazard snapshot is kept.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.start = None;
        self.end = None;
        self.discard_result();
        self.location_mode = LocationMode::Locating;
        self.state = SessionState::AwaitingStart;
    }

    /// Ready (or a previous Resolved/Failed) -> Computing.
    pub fn begin_computation(&mut self) -> Result<ComputeTicket, SessionError> {
        if self.is_computing() {
            tracing::debug!("Ignoring calculate request while a computation is in flight");
            return Err(SessionError::Busy);
        }
        let start = self.start.ok_or(SessionError::StartMissing)?;
        let end = self.end.ok_or(SessionError::EndMissing)?;
        if self.hazards.is_none() {
            return Err(SessionError::HazardsNotLoaded);
        }

        self.generation += 1;
        self.discard_result();
        self.state = SessionState::Computing;

        Ok(ComputeTicket {
            generation: self.generation,
            start,
            end,
            avoidance: self.avoidance_snapshot(),
        })
    }

    /// Apply a computation outcome. Returns false (and changes nothing) when the
    /// ticket was superseded by a reset or a newer computation.
    pub fn complete(&mut self, ticket: &ComputeTicket, outcome: PlanOutcome) -> bool {
        if ticket.generation != self.generation || !self.is_computing() {
            tracing::debug!(
                "Dropping stale route result (ticket {}, session {})",
                ticket.generation,
                self.generation
            );
            return false;
        }

        match outcome {
            PlanOutcome::Resolved {
                route,
                classification,
                ..
            } => {
                self.route = Some(route);
                self.state = SessionState::Resolved(classification);
            }
            PlanOutcome::Failed { error, .. } => {
                self.last_error = Some(error);
                self.state = SessionState::Failed;
            }
        }
        true
    }

    fn discard_result(&mut self) {
        self.route = None;
        self.last_error = None;
    }

    /// One-line description of where the session stands.
    pub fn status_line(&self) -> String {
        match self.state {
            SessionState::Idle => "Not started.".to_string(),
            SessionState::AwaitingStart => match self.location_mode {
                LocationMode::Manual => "Pick the start point, then the end point.".to_string(),
                _ => "Locating you as the start point...".to_string(),
            },
            SessionState::AwaitingEnd => "Pick the end point.".to_string(),
            SessionState::Ready => "Ready. Calculate the route.".to_string(),
            SessionState::Computing => "Calculating the safe route...".to_string(),
            SessionState::Resolved(classification) => {
                classification.summary(self.route.as_ref().and_then(|r| r.distance_m))
            }
            SessionState::Failed => match &self.last_error {
                Some(err) => format!("Route calculation failed. {}", err.user_message()),
                None => "Route calculation failed.".to_string(),
            },
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingStart => write!(f, "awaiting_start"),
            Self::AwaitingEnd => write!(f, "awaiting_end"),
            Self::Ready => write!(f, "ready"),
            Self::Computing => write!(f, "computing"),
            Self::Resolved(classification) => write!(f, "resolved({:?})", classification),
            Self::Failed => write!(f, "failed"),
        }
    }
}
