//! Commune anomaly tagging

use super::{CommuneProfile, StrategyThresholds};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    /// Close to the agency but rarely delivered
    Underused,
    /// Far from the agency and delivered often
    HighCost,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Underused => f.write_str("underused"),
            Anomaly::HighCost => f.write_str("high cost"),
        }
    }
}

/// Tag a commune, strict comparisons on both axes
pub fn tag(profile: &CommuneProfile, thresholds: &StrategyThresholds) -> Option<Anomaly> {
    if profile.distance_km < thresholds.underused_km && profile.shipments < thresholds.underused_max {
        Some(Anomaly::Underused)
    } else if profile.distance_km > thresholds.costly_km && profile.shipments > thresholds.costly_min {
        Some(Anomaly::HighCost)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;
    use rstest::rstest;

    #[rstest]
    #[case(10.0, 2, Some(Anomaly::Underused))]
    #[case(15.0, 2, None)]
    #[case(10.0, 5, None)]
    #[case(50.0, 11, Some(Anomaly::HighCost))]
    #[case(45.0, 11, None)]
    #[case(50.0, 10, None)]
    #[case(30.0, 7, None)]
    fn test_tag(#[case] distance: f64, #[case] shipments: usize, #[case] expected: Option<Anomaly>) {
        let profile = CommuneProfile {
            commune: "Lisieux".into(),
            agency_code: "NT14L".into(),
            distance_km: distance,
            shipments,
            position: Coordinates::new(49.15, 0.23).unwrap(),
        };
        assert_eq!(tag(&profile, &StrategyThresholds::default()), expected);
    }
}
