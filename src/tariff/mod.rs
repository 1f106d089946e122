//! Tariff computation
//!
//! Three named pricing policies turn per-tranche base tariffs into per-zone
//! prices:
//!
//! - [`PricingPolicy::FixedGap`] (default): solve per tranche so that zone
//!   prices differ by fixed multiples of a gap while the shipment-weighted
//!   blend reproduces the tranche's base tariff. See [`fixed_gap`].
//! - [`PricingPolicy::Direct`]: multiply the base tariff by a zone
//!   coefficient. See [`direct`].
//! - [`PricingPolicy::GlobalWeighted`]: a single set of zone prices whose
//!   share-weighted average equals a target. See [`weighted`].
//!
//! Per-tranche policies produce a [`TariffTable`]. Tranches whose input is
//! unusable are listed in [`TariffTable::flagged`] rather than priced; with
//! [`SolveOptions::strict`] any flag aborts the computation instead.

pub mod direct;
pub mod fixed_gap;
pub mod weighted;

pub use direct::direct;
pub use fixed_gap::{fixed_gap, FixedGapParams};
pub use weighted::{
    aggregate_network_shares, default_agency_coefficients, global_weighted, per_agency_weighted,
    AgencyShares, AgencyTariff, GlobalTariff,
};

use crate::error::{Error, Result};
use crate::model::{PerZone, Zone};
use crate::tranche::TrancheScale;
use crate::util::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Percentage of shipments per zone, 0-100
pub type ZoneShares = PerZone<f64>;

/// Multiplier per zone
pub type ZoneCoefficients = PerZone<f64>;

/// Base tariff (forfait) per tranche label
pub type BaseTariffs = BTreeMap<String, f64>;

/// Zone shares per tranche label
pub type Distribution = BTreeMap<String, ZoneShares>;

/// Default allowed deviation of a share row from 100
pub const DEFAULT_SUM_TOLERANCE: f64 = 0.5;

/// Allowed deviation of a blended total from its base tariff
pub const ROUND_TRIP_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PricingPolicy {
    #[default]
    FixedGap,
    Direct,
    GlobalWeighted,
}

impl PricingPolicy {
    pub fn name(self) -> &'static str {
        match self {
            PricingPolicy::FixedGap => "fixed-gap",
            PricingPolicy::Direct => "direct",
            PricingPolicy::GlobalWeighted => "global-weighted",
        }
    }
}

impl fmt::Display for PricingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PricingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fixed-gap" | "fixed" | "gap" => Ok(PricingPolicy::FixedGap),
            "direct" => Ok(PricingPolicy::Direct),
            "global-weighted" | "global" | "weighted" => Ok(PricingPolicy::GlobalWeighted),
            other => Err(Error::input(format!(
                "unknown pricing policy '{}' (expected fixed-gap, direct or global-weighted)",
                other
            ))),
        }
    }
}

/// Per-zone prices for one tranche plus the distribution-weighted blend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TariffRow {
    pub tranche: String,
    pub z1: f64,
    pub z2: f64,
    pub z3: f64,
    pub total: f64,
}

impl TariffRow {
    pub fn price(&self, zone: Zone) -> f64 {
        match zone {
            Zone::Zone1 => self.z1,
            Zone::Zone2 => self.z2,
            Zone::Zone3 => self.z3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    /// No share row for a priced tranche
    MissingDistribution,
    /// Shares do not sum to 100 within tolerance, or one is negative
    ShareSum,
    /// Base tariff is not a positive number
    InvalidBase,
    /// Blended total drifts from the base tariff; the row is still priced
    RoundTrip,
}

/// A tranche that could not be priced cleanly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlaggedTranche {
    pub tranche: String,
    pub kind: FlagKind,
    pub reason: String,
}

impl fmt::Display for FlaggedTranche {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tranche, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TariffTable {
    pub policy: PricingPolicy,
    /// Priced rows in scale order
    pub rows: Vec<TariffRow>,
    pub flagged: Vec<FlaggedTranche>,
}

impl TariffTable {
    pub(crate) fn new(policy: PricingPolicy) -> Self {
        Self {
            policy,
            rows: Vec::new(),
            flagged: Vec::new(),
        }
    }

    pub fn row(&self, tranche: &str) -> Result<&TariffRow> {
        self.rows
            .iter()
            .find(|r| r.tranche == tranche)
            .ok_or_else(|| Error::Lookup(format!("no priced row for tranche '{}'", tranche)))
    }

    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }

    pub(crate) fn flag(&mut self, tranche: &str, kind: FlagKind, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(tranche, ?kind, %reason, "tranche flagged");
        self.flagged.push(FlaggedTranche {
            tranche: tranche.to_string(),
            kind,
            reason,
        });
    }

    /// Apply strict mode: any flag becomes an error naming every flagged tranche
    pub(crate) fn finish(self, options: &SolveOptions) -> Result<Self> {
        if options.strict && !self.flagged.is_empty() {
            let names: Vec<String> = self.flagged.iter().map(|f| f.to_string()).collect();
            return Err(Error::input(format!(
                "{} tranche(s) flagged: {}",
                names.len(),
                names.join("; ")
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOptions {
    /// Turn flagged tranches into an error
    pub strict: bool,
    /// Allowed deviation of a share row from 100
    pub sum_tolerance: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            strict: false,
            sum_tolerance: DEFAULT_SUM_TOLERANCE,
        }
    }
}

impl SolveOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// Check that a share row is usable: finite, non-negative, summing to ~100
pub fn check_shares(shares: &ZoneShares, tolerance: f64) -> std::result::Result<(), String> {
    if let Some((zone, v)) = shares.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
        return Err(format!("{} share {} is not a percentage", zone, v));
    }
    let sum: f64 = shares.iter().map(|(_, v)| v).sum();
    if (sum - 100.0).abs() > tolerance {
        return Err(format!(
            "shares sum to {} (expected 100 +/- {})",
            round2(sum),
            tolerance
        ));
    }
    Ok(())
}

/// Shares as fractions of 1
pub fn fractions(shares: &ZoneShares) -> PerZone<f64> {
    shares.map(|_, v| v / 100.0)
}

/// Every base tariff and share label must exist in the scale
pub(crate) fn check_labels(
    scale: &TrancheScale,
    base_tariffs: &BaseTariffs,
    distribution: Option<&Distribution>,
) -> Result<()> {
    for label in base_tariffs.keys() {
        scale.get(label)?;
    }
    if let Some(distribution) = distribution {
        for label in distribution.keys() {
            scale.get(label)?;
        }
    }
    Ok(())
}

pub(crate) fn check_coefficients(coefficients: &ZoneCoefficients, what: &str) -> Result<()> {
    for (zone, c) in coefficients.iter() {
        if !c.is_finite() || c <= 0.0 {
            return Err(Error::input(format!(
                "{} coefficient for {} must be > 0, got {}",
                what, zone, c
            )));
        }
    }
    Ok(())
}

/// Share-weighted blend of three zone prices, rounded to the cent
pub(crate) fn blend(shares: &ZoneShares, prices: PerZone<f64>) -> f64 {
    let r = fractions(shares);
    round2(r.zone1 * prices.zone1 + r.zone2 * prices.zone2 + r.zone3 * prices.zone3)
}
