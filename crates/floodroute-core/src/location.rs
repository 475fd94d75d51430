//! One-shot location fixes with bounded waiting.

use std::future::Future;
use std::time::Duration;

use crate::error::PlannerError;
use crate::models::Coordinate;
use crate::rules::RiskRules;

/// Source of device positions.
pub trait LocationProvider {
    /// Resolve a single position fix. Implementations should honour `timeout` but
    /// callers do not rely on it; see [`acquire_start_fix`].
    fn current_position(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Coordinate, PlannerError>> + Send;
}

/// Get a start position from the provider.
///
/// The provider call is bounded by `first_fix_timeout` and, independently, by a
/// `pending_guard` timer that fires even when the provider future never resolves or
/// ignores its own timeout. Either bound elapsing yields `LocationTimeout`.
pub async fn acquire_start_fix<P>(provider: &P, rules: &RiskRules) -> Result<Coordinate, PlannerError>
where
    P: LocationProvider,
{
    let primary = tokio::time::timeout(
        rules.first_fix_timeout(),
        provider.current_position(rules.first_fix_timeout()),
    );

    let result = tokio::select! {
        outcome = primary => match outcome {
            Ok(fix) => fix,
            Err(_) => Err(PlannerError::LocationTimeout),
        },
        _ = tokio::time::sleep(rules.pending_guard()) => {
            tracing::warn!("Location guard timer fired before the provider answered");
            Err(PlannerError::LocationTimeout)
        }
    };

    match &result {
        Ok(position) if !position.is_valid() => {
            tracing::warn!("Provider returned an invalid position {}", position);
            return Err(PlannerError::LocationUnavailable);
        }
        Ok(position) => tracing::info!("Location fix acquired at {}", position),
        Err(err) => tracing::warn!("Location fix failed: {}", err),
    }
    result
}
