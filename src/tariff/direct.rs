//! Direct policy: `price = round2(base[tranche] * coef[zone])`

use super::{
    blend, check_coefficients, check_labels, check_shares, BaseTariffs, Distribution, FlagKind,
    PricingPolicy, SolveOptions, TariffRow, TariffTable, ZoneCoefficients,
};
use crate::error::Result;
use crate::tranche::TrancheScale;
use crate::util::round2;

/// Multiply each base tariff by the zone coefficients
///
/// No solve step is involved. `total` is the blend over the tranche's share
/// row when `distribution` has a usable one, otherwise the rounded base
/// tariff itself. Share rows that fail the sum check are flagged but do not
/// stop the tranche from being priced.
pub fn direct(
    scale: &TrancheScale,
    base_tariffs: &BaseTariffs,
    coefficients: &ZoneCoefficients,
    distribution: Option<&Distribution>,
    options: &SolveOptions,
) -> Result<TariffTable> {
    check_coefficients(coefficients, "direct")?;
    check_labels(scale, base_tariffs, distribution)?;

    let mut table = TariffTable::new(PricingPolicy::Direct);
    for label in scale.labels() {
        let Some(&base) = base_tariffs.get(label) else {
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

        let prices = coefficients.map(|_, c| round2(base * c));
        let shares = distribution.and_then(|d| d.get(label));
        let total = match shares {
            Some(shares) => match check_shares(shares, options.sum_tolerance) {
                Ok(()) => blend(shares, prices),
                Err(reason) => {
                    table.flag(label, FlagKind::ShareSum, reason);
                    round2(base)
                }
            },
            None => round2(base),
        };
        table.rows.push(TariffRow {
            tranche: label.to_string(),
            z1: prices.zone1,
            z2: prices.zone2,
            z3: prices.zone3,
            total,
        });
    }

    tracing::debug!(rows = table.rows.len(), "direct pricing done");
    table.finish(options)
}
