//! Risk thresholds and timing rules for hazard-aware routing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for hazard classification, proximity warnings and timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRules {
    /// Minimum severity class (1-5) treated as high risk
    pub high_risk_threshold: u8,
    /// Distance around high-risk areas that triggers a proximity warning
    pub warn_distance_m: f64,
    /// Minimum time between two proximity warnings
    pub warn_cooldown_ms: u64,
    /// Timeout handed to the location provider for the first fix
    pub first_fix_timeout_ms: u64,
    /// Independent guard in case the provider never answers
    pub pending_guard_ms: u64,
    /// Upper bound on a single directions request, on top of the client's own timeout
    pub route_timeout_ms: u64,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            high_risk_threshold: 4,
            warn_distance_m: 120.0,
            warn_cooldown_ms: 15_000,
            first_fix_timeout_ms: 10_000,
            pending_guard_ms: 12_000,
            route_timeout_ms: 20_000,
        }
    }
}

impl RiskRules {
    pub fn first_fix_timeout(&self) -> Duration {
        Duration::from_millis(self.first_fix_timeout_ms)
    }

    pub fn pending_guard(&self) -> Duration {
        Duration::from_millis(self.pending_guard_ms)
    }

    pub fn route_timeout(&self) -> Duration {
        Duration::from_millis(self.route_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let rules: RiskRules = serde_json::from_str(r#"{"high_risk_threshold": 5}"#).unwrap();
        assert_eq!(rules.high_risk_threshold, 5);
        assert_eq!(rules.warn_cooldown_ms, 15_000);
        assert_eq!(rules.pending_guard(), Duration::from_secs(12));
    }
}
