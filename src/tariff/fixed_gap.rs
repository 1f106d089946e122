//! Fixed-gap policy
//!
//! For a tranche with base tariff `f` and zone fractions `r1, r2, r3`:
//!
//! ```text
//! x  = f - a * (coef2 * r2 + coef3 * r3)
//! z1 = round2(x)
//! z2 = round2(x + coef2 * a)
//! z3 = round2(x + coef3 * a)
//! total = round2(r1 * z1 + r2 * z2 + r3 * z3)
//! ```
//!
//! When the fractions sum to 1 the unrounded blend is exactly `f`, so the
//! rounded total stays within a cent of the base tariff.

use super::{
    blend, check_labels, fractions, BaseTariffs, Distribution, FlagKind, PricingPolicy,
    SolveOptions, TariffRow, TariffTable, ZoneShares, ROUND_TRIP_TOLERANCE,
};
use crate::error::{Error, Result};
use crate::model::PerZone;
use crate::tranche::TrancheScale;
use crate::util::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Gap `a` and zone multipliers of the fixed-gap model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FixedGapParams {
    /// Price step `a` between zones, in euros
    #[serde(default = "default_gap")]
    pub gap: f64,
    #[serde(default = "default_coef_zone2")]
    pub coef_zone2: f64,
    #[serde(default = "default_coef_zone3")]
    pub coef_zone3: f64,
}

fn default_gap() -> f64 {
    0.38
}

fn default_coef_zone2() -> f64 {
    1.5
}

fn default_coef_zone3() -> f64 {
    3.0
}

impl Default for FixedGapParams {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            coef_zone2: default_coef_zone2(),
            coef_zone3: default_coef_zone3(),
        }
    }
}

impl FixedGapParams {
    pub fn new(gap: f64, coef_zone2: f64, coef_zone3: f64) -> Result<Self> {
        let params = Self {
            gap,
            coef_zone2,
            coef_zone3,
        };
        params.validate()?;
        Ok(params)
    }

    /// Default parameters of the pallet scale
    pub fn pallets() -> Self {
        Self {
            gap: 1.44,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("gap", self.gap),
            ("coef_zone2", self.coef_zone2),
            ("coef_zone3", self.coef_zone3),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::input(format!(
                    "{} must be a finite number >= 0, got {}",
                    name, value
                )));
            }
        }
        if self.coef_zone2 > self.coef_zone3 {
            return Err(Error::input(format!(
                "coef_zone2 {} exceeds coef_zone3 {}: Zone 2 would cost more than Zone 3",
                self.coef_zone2, self.coef_zone3
            )));
        }
        Ok(())
    }

    /// Solve one tranche
    pub fn solve(&self, base: f64, shares: &ZoneShares) -> PerZone<f64> {
        let r = fractions(shares);
        let a = self.gap;
        let x = base - a * (self.coef_zone2 * r.zone2 + self.coef_zone3 * r.zone3);
        PerZone::new(
            round2(x),
            round2(x + self.coef_zone2 * a),
            round2(x + self.coef_zone3 * a),
        )
    }
}

/// Price every tranche of `scale` that has a base tariff
///
/// Tranches without a base tariff are left out. A priced tranche with no
/// usable share row is flagged and excluded. A row whose blend drifts more
/// than a cent from its base tariff is kept and flagged.
pub fn fixed_gap(
    scale: &TrancheScale,
    base_tariffs: &BaseTariffs,
    distribution: &Distribution,
    params: &FixedGapParams,
    options: &SolveOptions,
) -> Result<TariffTable> {
    params.validate()?;
    check_labels(scale, base_tariffs, Some(distribution))?;

    let mut table = TariffTable::new(PricingPolicy::FixedGap);
    for label in scale.labels() {
        let Some(&base) = base_tariffs.get(label) else {
            tracing::debug!(tranche = label, "no base tariff, tranche not priced");
            continue;
        };
        if !base.is_finite() || base <= 0.0 {
            table.flag(
                label,
                FlagKind::InvalidBase,
                format!("base tariff {} is not > 0", base),
            );
            continue;
        }
        let Some(shares) = distribution.get(label) else {
            table.flag(label, FlagKind::MissingDistribution, "no zone distribution");
            continue;
        };
        if let Err(reason) = super::check_shares(shares, options.sum_tolerance) {
            table.flag(label, FlagKind::ShareSum, reason);
            continue;
        }

        let prices = params.solve(base, shares);
        let total = blend(shares, prices);
        if (total - base).abs() > ROUND_TRIP_TOLERANCE + 1e-9 {
            table.flag(
                label,
                FlagKind::RoundTrip,
                format!("blended total {} drifts from base tariff {}", total, base),
            );
        }
        table.rows.push(TariffRow {
            tranche: label.to_string(),
            z1: prices.zone1,
            z2: prices.zone2,
            z3: prices.zone3,
            total,
        });
    }

    tracing::debug!(
        rows = table.rows.len(),
        flagged = table.flagged.len(),
        gap = params.gap,
        "fixed-gap solve done"
    );
    table.finish(options)
}
