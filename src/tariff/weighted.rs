//! Weighted allocation of a target average tariff across zones
//!
//! `base = target / sum(share_i * coef_i)` with shares as fractions, then
//! `price_i = round2(coef_i * base)`.

use super::{
    check_coefficients, check_shares, fractions, ZoneCoefficients, ZoneShares, DEFAULT_SUM_TOLERANCE,
};
use crate::error::{Error, Result};
use crate::model::{Batch, PerZone};
use crate::util::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Zone prices for one target tariff
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GlobalTariff {
    /// Unrounded price of coefficient 1
    pub base: f64,
    pub prices: PerZone<f64>,
    /// Share-weighted average of `prices`
    pub blended: f64,
}

/// Zone shares of one agency, 0-100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgencyShares {
    pub agency_code: String,
    pub shares: ZoneShares,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgencyTariff {
    pub agency_code: String,
    pub coefficients: ZoneCoefficients,
    pub tariff: GlobalTariff,
}

/// Coefficients used for an agency without an override
pub const DEFAULT_AGENCY_COEFFICIENTS: ZoneCoefficients = PerZone {
    zone1: 1.0,
    zone2: 1.5,
    zone3: 2.0,
};

/// Reference per-agency coefficient overrides
pub fn default_agency_coefficients() -> BTreeMap<String, ZoneCoefficients> {
    [
        ("NT14G", PerZone::new(1.0, 1.5, 2.0)),
        ("NT50S", PerZone::new(1.0, 1.6, 2.1)),
        ("NT50V", PerZone::new(1.0, 1.4, 1.8)),
        ("NT50T", PerZone::new(1.0, 1.7, 2.2)),
        ("NT61L", PerZone::new(1.0, 1.5, 2.0)),
    ]
    .into_iter()
    .map(|(code, c)| (code.to_string(), c))
    .collect()
}

fn check_target(target: f64) -> Result<()> {
    if !target.is_finite() || target <= 0.0 {
        return Err(Error::input(format!(
            "target tariff must be a finite number > 0, got {}",
            target
        )));
    }
    Ok(())
}

fn allocate(shares: &ZoneShares, coefficients: &ZoneCoefficients, target: f64) -> Result<GlobalTariff> {
    if let Some((zone, v)) = shares.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
        return Err(Error::input(format!("{} share {} is not a percentage", zone, v)));
    }
    let r = fractions(shares);
    let denominator = dot(r, *coefficients);
    if denominator == 0.0 {
        return Err(Error::Computation(
            "weighted denominator is zero: every zone share is 0".to_string(),
        ));
    }
    check_shares(shares, DEFAULT_SUM_TOLERANCE).map_err(Error::InputValidation)?;
    let base = target / denominator;
    if !base.is_finite() {
        return Err(Error::Computation(format!(
            "weighted base {} is not finite",
            base
        )));
    }
    let prices = coefficients.map(|_, c| round2(c * base));
    let blended = round2(dot(r, prices));
    Ok(GlobalTariff {
        base,
        prices,
        blended,
    })
}

fn dot(a: PerZone<f64>, b: PerZone<f64>) -> f64 {
    a.zone1 * b.zone1 + a.zone2 * b.zone2 + a.zone3 * b.zone3
}

/// Network-wide zone prices for a target average tariff
///
/// Shares are percentages and must sum to 100 within
/// [`DEFAULT_SUM_TOLERANCE`]; they are never rescaled. All-zero shares give a
/// zero denominator, reported as [`Error::Computation`].
pub fn global_weighted(
    shares: &ZoneShares,
    coefficients: &ZoneCoefficients,
    target: f64,
) -> Result<GlobalTariff> {
    check_target(target)?;
    check_coefficients(coefficients, "weighted")?;
    let tariff = allocate(shares, coefficients, target)?;
    tracing::debug!(target, base = tariff.base, "global weighted allocation");
    Ok(tariff)
}

/// The weighted allocation applied agency by agency
///
/// Each agency uses its entry in `overrides`, or `default` when it has none.
/// An agency whose allocation cannot be computed, or whose shares do not sum
/// to 100, is skipped and recorded; `line` numbers are 1-based positions in `agencies`.
pub fn per_agency_weighted(
    agencies: &[AgencyShares],
    overrides: &BTreeMap<String, ZoneCoefficients>,
    default: &ZoneCoefficients,
    target: f64,
) -> Result<Batch<AgencyTariff>> {
    check_target(target)?;
    check_coefficients(default, "default agency")?;
    for (code, c) in overrides {
        check_coefficients(c, code)?;
    }

    let mut batch = Batch::default();
    for (i, agency) in agencies.iter().enumerate() {
        let coefficients = overrides.get(&agency.agency_code).unwrap_or(default);
        match allocate(&agency.shares, coefficients, target) {
            Ok(tariff) => batch.records.push(AgencyTariff {
                agency_code: agency.agency_code.clone(),
                coefficients: *coefficients,
                tariff,
            }),
            Err(e) => batch.skip(i + 1, format!("{}: {}", agency.agency_code, e)),
        }
    }
    Ok(batch)
}

/// Network zone shares from per-agency shares
///
/// Shares are summed per zone and renormalised so the result sums to 100,
/// each value rounded to 2 decimals.
pub fn aggregate_network_shares(agencies: &[AgencyShares]) -> Result<ZoneShares> {
    if agencies.is_empty() {
        return Err(Error::input("no agency shares to aggregate"));
    }
    let mut sums = PerZone::new(0.0, 0.0, 0.0);
    for agency in agencies {
        for (zone, v) in agency.shares.iter() {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::input(format!(
                    "{}: {} share {} is not a percentage",
                    agency.agency_code, zone, v
                )));
            }
            sums.set(zone, sums.get(zone) + v);
        }
    }
    let total = sums.zone1 + sums.zone2 + sums.zone3;
    if total == 0.0 {
        return Err(Error::Computation(
            "network shares sum to zero".to_string(),
        ));
    }
    Ok(sums.map(|_, v| round2(v / total * 100.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_global_reference_allocation() {
        let tariff = global_weighted(
            &PerZone::new(50.0, 35.0, 15.0),
            &PerZone::new(1.0, 2.0, 3.0),
            10.0,
        )
        .unwrap();
        // denominator 0.5 + 0.7 + 0.45 = 1.65
        assert_eq!(tariff.prices, PerZone::new(6.06, 12.12, 18.18));
        assert_eq!(tariff.blended, 10.0);
    }

    #[test]
    fn test_zero_denominator_is_computation_error() {
        let result = global_weighted(
            &PerZone::new(0.0, 0.0, 0.0),
            &PerZone::new(1.0, 2.0, 3.0),
            10.0,
        );
        assert!(matches!(result, Err(Error::Computation(_))));
    }

    #[test]
    fn test_shares_must_sum_to_hundred() {
        let coefs = PerZone::new(1.0, 2.0, 3.0);
        for shares in [PerZone::new(500.0, 350.0, 150.0), PerZone::new(50.0, 35.0, 5.0)] {
            assert!(matches!(
                global_weighted(&shares, &coefs, 10.0),
                Err(Error::InputValidation(_))
            ));
        }
        // within tolerance
        assert!(global_weighted(&PerZone::new(50.0, 35.0, 15.3), &coefs, 10.0).is_ok());
    }

    #[test]
    fn test_invalid_target_rejected() {
        let shares = PerZone::new(50.0, 35.0, 15.0);
        let coefs = PerZone::new(1.0, 2.0, 3.0);
        assert!(matches!(
            global_weighted(&shares, &coefs, 0.0),
            Err(Error::InputValidation(_))
        ));
        assert!(global_weighted(&shares, &coefs, f64::NAN).is_err());
    }

    #[test]
    fn test_per_agency_uses_overrides() {
        let agencies = vec![
            AgencyShares {
                agency_code: "NT50S".into(),
                shares: PerZone::new(60.0, 30.0, 10.0),
            },
            AgencyShares {
                agency_code: "NT27E".into(),
                shares: PerZone::new(60.0, 30.0, 10.0),
            },
            AgencyShares {
                agency_code: "NT76R".into(),
                shares: PerZone::new(0.0, 0.0, 0.0),
            },
            AgencyShares {
                agency_code: "NT61L".into(),
                shares: PerZone::new(600.0, 300.0, 100.0),
            },
        ];
        let batch = per_agency_weighted(
            &agencies,
            &default_agency_coefficients(),
            &DEFAULT_AGENCY_COEFFICIENTS,
            10.0,
        )
        .unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].coefficients, PerZone::new(1.0, 1.6, 2.1));
        assert_eq!(batch.records[1].coefficients, DEFAULT_AGENCY_COEFFICIENTS);
        // 10 / (0.6 + 0.45 + 0.2) = 8.0
        assert_eq!(batch.records[1].tariff.prices, PerZone::new(8.0, 12.0, 16.0));
        let lines: Vec<usize> = batch.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(batch.skipped[1].message.starts_with("NT61L"));
    }

    #[test]
    fn test_aggregate_renormalises() {
        let agencies = vec![
            AgencyShares {
                agency_code: "NT14G".into(),
                shares: PerZone::new(60.0, 30.0, 10.0),
            },
            AgencyShares {
                agency_code: "NT61L".into(),
                shares: PerZone::new(40.0, 40.0, 20.0),
            },
        ];
        let network = aggregate_network_shares(&agencies).unwrap();
        assert_eq!(network, PerZone::new(50.0, 35.0, 15.0));
        assert!(aggregate_network_shares(&[]).is_err());
    }
}
