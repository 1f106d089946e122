//! Tariff configuration
//!
//! Every lookup table the computations depend on lives here: zone
//! thresholds, tranche scales with their base tariffs and reference
//! distributions, policy coefficients and strategy thresholds. The defaults
//! reproduce the reference network tables; a YAML file overrides any part.
//!
//! ```yaml
//! version: 1
//! thresholds: { zone1_max_km: 20, zone2_max_km: 40 }
//! fixed_gap: { gap: 0.38, coef_zone2: 1.5, coef_zone3: 3.0 }
//! weighted: { zone1: 1, zone2: 2, zone3: 3 }
//! scales:
//!   weight:
//!     tranches: [0-10kg, 10-20kg, ...]
//!     base_tariffs: { 0-10kg: 6.5, ... }
//!     distribution: { 0-10kg: { zone1: 51.54, zone2: 34.25, zone3: 14.21 }, ... }
//! ```

use crate::error::{Error, Result};
use crate::model::PerZone;
use crate::strategy::StrategyThresholds;
use crate::tariff::weighted::DEFAULT_AGENCY_COEFFICIENTS;
use crate::tariff::{
    default_agency_coefficients, BaseTariffs, Distribution, FixedGapParams, SolveOptions,
    ZoneCoefficients, DEFAULT_SUM_TOLERANCE,
};
use crate::tranche::{TrancheScale, PALLET_LABELS, WEIGHT_LABELS};
use crate::zone::ZoneThresholds;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported configuration schema version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TariffConfig {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub thresholds: ZoneThresholds,

    /// Global fixed-gap parameters; a scale may override them
    #[serde(default)]
    pub fixed_gap: FixedGapParams,

    /// Zone coefficients of the direct policy
    #[serde(default = "default_direct")]
    pub direct: ZoneCoefficients,

    /// Zone coefficients of the global weighted policy
    #[serde(default = "default_weighted")]
    pub weighted: ZoneCoefficients,

    /// Per-agency coefficient overrides of the weighted policy
    #[serde(default = "default_agency_coefficients")]
    pub agency_coefficients: BTreeMap<String, ZoneCoefficients>,

    /// Coefficients for agencies without an override
    #[serde(default = "default_agency_default")]
    pub agency_default: ZoneCoefficients,

    /// Target average tariff of the weighted policies, in euros
    #[serde(default = "default_target")]
    pub target_tariff: f64,

    /// Allowed deviation of a share row from 100
    #[serde(default = "default_sum_tolerance")]
    pub sum_tolerance: f64,

    /// Fail instead of flagging unusable tranches
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub strategy: StrategyThresholds,

    #[serde(default)]
    pub scales: ScalesConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_direct() -> ZoneCoefficients {
    PerZone::new(1.0, 1.5, 2.0)
}

fn default_weighted() -> ZoneCoefficients {
    PerZone::new(1.0, 2.0, 3.0)
}

fn default_agency_default() -> ZoneCoefficients {
    DEFAULT_AGENCY_COEFFICIENTS
}

fn default_target() -> f64 {
    10.0
}

fn default_sum_tolerance() -> f64 {
    DEFAULT_SUM_TOLERANCE
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            thresholds: ZoneThresholds::default(),
            fixed_gap: FixedGapParams::default(),
            direct: default_direct(),
            weighted: default_weighted(),
            agency_coefficients: default_agency_coefficients(),
            agency_default: default_agency_default(),
            target_tariff: default_target(),
            sum_tolerance: default_sum_tolerance(),
            strict: false,
            strategy: StrategyThresholds::default(),
            scales: ScalesConfig::default(),
        }
    }
}

/// The two tranche axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScalesConfig {
    #[serde(default = "ScaleConfig::weight")]
    pub weight: ScaleConfig,
    #[serde(default = "ScaleConfig::pallets")]
    pub pallets: ScaleConfig,
}

impl Default for ScalesConfig {
    fn default() -> Self {
        Self {
            weight: ScaleConfig::weight(),
            pallets: ScaleConfig::pallets(),
        }
    }
}

/// One tranche scale with its pricing inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScaleConfig {
    /// Tranche labels in ascending order, e.g. `0-10kg`, `>3000kg`, `1 P`
    pub tranches: Vec<String>,

    /// Base tariff per tranche; unlisted tranches are not priced
    #[serde(default)]
    pub base_tariffs: BaseTariffs,

    /// Reference zone shares per tranche, percentages
    #[serde(default)]
    pub distribution: Distribution,

    /// Fixed-gap parameters for this scale, replacing the global ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_gap: Option<FixedGapParams>,
}

const WEIGHT_TARIFFS: [f64; 18] = [
    6.50, 7.00, 7.40, 7.80, 8.30, 8.80, 9.60, 9.90, 10.50, 10.80, 8.80, 8.70, 8.60, 7.25, 6.50,
    5.20, 4.50, 4.00,
];

const WEIGHT_ZONE1: [f64; 18] = [
    51.54, 50.69, 51.2, 50.46, 49.68, 49.28, 49.22, 49.52, 49.39, 49.64, 49.92, 49.19, 49.26,
    49.91, 48.65, 47.55, 51.67, 42.50,
];

const WEIGHT_ZONE2: [f64; 18] = [
    34.25, 36.46, 36.46, 36.97, 37.61, 38.47, 37.62, 37.73, 37.63, 37.05, 36.7, 36.86, 36.25,
    35.24, 36.65, 37.41, 32.59, 36.65,
];

const WEIGHT_ZONE3: [f64; 18] = [
    14.21, 12.85, 12.33, 12.57, 12.71, 12.24, 13.16, 12.74, 12.98, 13.31, 13.39, 13.95, 14.49,
    14.85, 14.7, 15.04, 15.74, 20.86,
];

const PALLET_TARIFFS: [f64; 7] = [34.0, 54.0, 69.0, 83.0, 97.0, 111.0, 9.60];
const PALLET_ZONE1: [f64; 7] = [47.58, 47.96, 48.94, 51.02, 52.20, 56.41, 84.40];
const PALLET_ZONE2: [f64; 7] = [35.91, 34.86, 34.54, 33.15, 27.80, 29.91, 11.35];
const PALLET_ZONE3: [f64; 7] = [16.51, 17.18, 16.52, 15.83, 20.00, 13.68, 4.26];

fn reference_tables(
    labels: &[&str],
    tariffs: &[f64],
    zones: [&[f64]; 3],
) -> (BaseTariffs, Distribution) {
    let mut base_tariffs = BaseTariffs::new();
    let mut distribution = Distribution::new();
    for (i, label) in labels.iter().enumerate().take(tariffs.len()) {
        base_tariffs.insert(label.to_string(), tariffs[i]);
        distribution.insert(
            label.to_string(),
            PerZone::new(zones[0][i], zones[1][i], zones[2][i]),
        );
    }
    (base_tariffs, distribution)
}

impl ScaleConfig {
    /// Reference weight scale; the open `>3000kg` tranche has no base tariff
    pub fn weight() -> Self {
        let (base_tariffs, distribution) = reference_tables(
            &WEIGHT_LABELS,
            &WEIGHT_TARIFFS,
            [&WEIGHT_ZONE1, &WEIGHT_ZONE2, &WEIGHT_ZONE3],
        );
        Self {
            tranches: WEIGHT_LABELS.iter().map(|s| s.to_string()).collect(),
            base_tariffs,
            distribution,
            fixed_gap: None,
        }
    }

    /// Reference pallet scale, priced with a 1.44 gap
    pub fn pallets() -> Self {
        let (base_tariffs, distribution) = reference_tables(
            &PALLET_LABELS,
            &PALLET_TARIFFS,
            [&PALLET_ZONE1, &PALLET_ZONE2, &PALLET_ZONE3],
        );
        Self {
            tranches: PALLET_LABELS.iter().map(|s| s.to_string()).collect(),
            base_tariffs,
            distribution,
            fixed_gap: Some(FixedGapParams::pallets()),
        }
    }

    /// Build and validate the tranche scale
    pub fn scale(&self) -> Result<TrancheScale> {
        TrancheScale::from_labels(&self.tranches)
    }

    /// This scale's fixed-gap parameters, falling back to `global`
    pub fn gap_params(&self, global: &FixedGapParams) -> FixedGapParams {
        self.fixed_gap.unwrap_or(*global)
    }
}

/// Which configured scale to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleKind {
    #[default]
    Weight,
    Pallets,
}

impl FromStr for ScaleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weight" | "poids" | "kg" => Ok(ScaleKind::Weight),
            "pallets" | "pallet" | "um" | "pal" => Ok(ScaleKind::Pallets),
            other => Err(Error::input(format!(
                "unknown scale '{}' (expected weight or pallets)",
                other
            ))),
        }
    }
}

impl fmt::Display for ScaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleKind::Weight => f.write_str("weight"),
            ScaleKind::Pallets => f.write_str("pallets"),
        }
    }
}

impl TariffConfig {
    /// Load a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Yaml(inner) => {
                Error::Config(format!("failed to parse {}: {}", path.display(), inner))
            }
            other => other,
        })
    }

    /// Load from `path` when given, otherwise the reference defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let config = Self::load(p)?;
                tracing::info!(path = %p.display(), "configuration loaded");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: TariffConfig = serde_norway::from_str(content)?;
        if config.version != CONFIG_VERSION {
            return Err(Error::Config(format!(
                "unsupported configuration version: {}",
                config.version
            )));
        }
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_norway::to_string(self)?)
    }

    /// Fingerprint of the effective configuration, stamped in exports
    pub fn fingerprint(&self) -> Result<String> {
        Ok(crate::util::fingerprint(self.to_yaml()?.as_bytes()))
    }

    pub fn scale(&self, kind: ScaleKind) -> &ScaleConfig {
        match kind {
            ScaleKind::Weight => &self.scales.weight,
            ScaleKind::Pallets => &self.scales.pallets,
        }
    }

    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            strict: self.strict,
            sum_tolerance: self.sum_tolerance,
        }
    }

    /// Fail with the first validation error, if any
    pub fn ensure_valid(&self) -> Result<()> {
        let result = crate::config_validate::validate_config(self, "<config>");
        match result.first_error() {
            Some(issue) => Err(Error::Config(format!("[{}] {}", issue.code, issue.message))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_carry_reference_tables() {
        let config = TariffConfig::default();
        let weight = config.scale(ScaleKind::Weight);
        assert_eq!(weight.tranches.len(), 19);
        assert_eq!(weight.base_tariffs.len(), 18);
        assert_eq!(weight.base_tariffs["40-50kg"], 8.30);
        assert_eq!(
            weight.distribution["40-50kg"],
            PerZone::new(49.68, 37.61, 12.71)
        );
        assert!(!weight.base_tariffs.contains_key(">3000kg"));

        let pallets = config.scale(ScaleKind::Pallets);
        assert_eq!(pallets.base_tariffs["P sup"], 9.60);
        assert_eq!(pallets.gap_params(&config.fixed_gap).gap, 1.44);
        assert_eq!(weight.gap_params(&config.fixed_gap).gap, 0.38);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "version: 1\nthresholds:\n  zone1_max_km: 15\nfixed_gap:\n  gap: 0.5\n";
        let config = TariffConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.thresholds.zone1_max_km, 15.0);
        assert_eq!(config.thresholds.zone2_max_km, 40.0);
        assert_eq!(config.fixed_gap.gap, 0.5);
        assert_eq!(config.fixed_gap.coef_zone3, 3.0);
        assert_eq!(config.scales, ScalesConfig::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = TariffConfig::default();
        let parsed = TariffConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.fingerprint().unwrap(), config.fingerprint().unwrap());
    }

    #[test]
    fn test_unsupported_version() {
        let err = TariffConfig::from_yaml("version: 2\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_scale_kind_from_str() {
        assert_eq!("Pallets".parse::<ScaleKind>().unwrap(), ScaleKind::Pallets);
        assert_eq!("weight".parse::<ScaleKind>().unwrap(), ScaleKind::Weight);
        assert!("volume".parse::<ScaleKind>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TariffConfig::default().ensure_valid().is_ok());
    }
}
