//! Live proximity warnings near high-risk areas.
//!
//! A warning fires when a position falls inside a `warn_distance_m` buffer around the
//! avoidance geometry, at most once per cooldown window.

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::{Stream, StreamExt};

use crate::error::PlannerError;
use crate::hazard::AvoidanceGeometry;
use crate::models::Coordinate;
use crate::rules::RiskRules;
use crate::spatial::within_buffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnDecision {
    NoWarning,
    /// Carries the timestamp to store as the new last-warned time.
    Warn(DateTime<Utc>),
}

impl WarnDecision {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warn(_))
    }
}

/// Decide whether `position` warrants a warning at time `now`.
///
/// Inside the cooldown window this returns `NoWarning` regardless of position.
pub fn check_proximity(
    position: &Coordinate,
    avoidance: Option<&AvoidanceGeometry>,
    last_warned: Option<DateTime<Utc>>,
    cooldown_ms: u64,
    warn_distance_m: f64,
    now: DateTime<Utc>,
) -> WarnDecision {
    let Some(avoidance) = avoidance else {
        return WarnDecision::NoWarning;
    };

    if let Some(last) = last_warned {
        let cooldown = TimeDelta::milliseconds(i64::try_from(cooldown_ms).unwrap_or(i64::MAX));
        if now - last < cooldown {
            return WarnDecision::NoWarning;
        }
    }

    if !position.is_valid() {
        tracing::warn!("Ignoring invalid position {} for proximity check", position);
        return WarnDecision::NoWarning;
    }

    let near = avoidance
        .polygons()
        .iter()
        .any(|polygon| within_buffer(position, polygon, warn_distance_m));

    if near {
        WarnDecision::Warn(now)
    } else {
        WarnDecision::NoWarning
    }
}

/// Holds the last-warned timestamp between position updates.
#[derive(Debug, Clone)]
pub struct ProximityMonitor {
    cooldown_ms: u64,
    warn_distance_m: f64,
    last_warned: Option<DateTime<Utc>>,
}

impl ProximityMonitor {
    pub fn new(rules: &RiskRules) -> Self {
        Self {
            cooldown_ms: rules.warn_cooldown_ms,
            warn_distance_m: rules.warn_distance_m,
            last_warned: None,
        }
    }

    pub fn warn_distance_m(&self) -> f64 {
        self.warn_distance_m
    }

    pub fn last_warned(&self) -> Option<DateTime<Utc>> {
        self.last_warned
    }

    pub fn observe(
        &mut self,
        position: &Coordinate,
        avoidance: Option<&AvoidanceGeometry>,
        now: DateTime<Utc>,
    ) -> WarnDecision {
        let decision = check_proximity(
            position,
            avoidance,
            self.last_warned,
            self.cooldown_ms,
            self.warn_distance_m,
            now,
        );
        if let WarnDecision::Warn(at) = decision {
            self.last_warned = Some(at);
        }
        decision
    }
}

/// Feed a live position stream into the monitor until the stream ends.
///
/// `on_warning` runs for every `Warn`. A stream error stops tracking and is returned;
/// it has no bearing on route calculation. Returns the number of warnings raised.
pub async fn watch_positions<S, F>(
    mut positions: S,
    avoidance: Option<&AvoidanceGeometry>,
    monitor: &mut ProximityMonitor,
    mut on_warning: F,
) -> Result<usize, PlannerError>
where
    S: Stream<Item = Result<Coordinate, PlannerError>> + Unpin,
    F: FnMut(&Coordinate, DateTime<Utc>),
{
    let mut warnings = 0usize;
    while let Some(update) = positions.next().await {
        let position = match update {
            Ok(position) => position,
            Err(err) => {
                tracing::warn!("Position tracking stopped: {}", err);
                return Err(err);
            }
        };
        if let WarnDecision::Warn(at) = monitor.observe(&position, avoidance, Utc::now()) {
            warnings += 1;
            tracing::info!(
                "Position {} is within {}m of a high-risk area",
                position,
                monitor.warn_distance_m()
            );
            on_warning(&position, at);
        }
    }
    Ok(warnings)
}
