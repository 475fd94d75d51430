//! CLI configuration from environment.

use std::env;

use floodroute_core::RiskRules;
use floodroute_ors::OrsConfig;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub ors: OrsConfig,
    pub rules: RiskRules,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Absent or unparsable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ors_defaults = OrsConfig::default();
        let rule_defaults = RiskRules::default();

        let ors = OrsConfig {
            api_key: lookup("ORS_API_KEY")
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            base_url: lookup("ORS_BASE_URL").unwrap_or(ors_defaults.base_url),
            profile: lookup("ORS_PROFILE").unwrap_or(ors_defaults.profile),
            snap_radius_m: lookup("ORS_SNAP_RADIUS_M")
                .and_then(|s| s.parse().ok())
                .unwrap_or(ors_defaults.snap_radius_m),
            timeout_secs: ors_defaults.timeout_secs,
        };

        let rules = RiskRules {
            high_risk_threshold: lookup("FLOODROUTE_RISK_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(rule_defaults.high_risk_threshold),
            warn_distance_m: lookup("FLOODROUTE_WARN_DISTANCE_M")
                .and_then(|s| s.parse().ok())
                .unwrap_or(rule_defaults.warn_distance_m),
            warn_cooldown_ms: lookup("FLOODROUTE_WARN_COOLDOWN_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(rule_defaults.warn_cooldown_ms),
            ..rule_defaults
        };

        Self { ors, rules }
    }
}
