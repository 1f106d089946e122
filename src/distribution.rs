//! Shipment distributions
//!
//! Cross-tabulates historical shipments by tranche and zone. The zone shares
//! per tranche are what the fixed-gap solver consumes; the other views are
//! reporting aids.

use crate::model::{PerZone, RowIssue, Shipment, Zone};
use crate::tariff::{Distribution, ZoneShares};
use crate::tranche::TrancheScale;
use crate::util::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which shipment quantity is binned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Weight in kg
    #[default]
    Weight,
    /// Pallet equivalents
    Um,
}

impl FromStr for Axis {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weight" | "poids" | "kg" => Ok(Axis::Weight),
            "um" | "pallets" | "pal" => Ok(Axis::Um),
            other => Err(crate::error::Error::input(format!(
                "unknown axis '{}' (expected weight or um)",
                other
            ))),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Weight => f.write_str("weight"),
            Axis::Um => f.write_str("um"),
        }
    }
}

/// Shipment counts per tranche and zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTab {
    /// Tranche labels in scale order
    pub tranches: Vec<String>,
    /// Counts aligned with `tranches`
    pub counts: Vec<PerZone<usize>>,
    /// Shipments that fell in no tranche
    pub unmatched: Vec<RowIssue>,
}

impl CrossTab {
    /// Bin every shipment on `axis`
    ///
    /// Unmatched shipments (negative, missing UM, outside the scale) are
    /// dropped and recorded; `line` is the 1-based position in `shipments`.
    pub fn build(shipments: &[Shipment], scale: &TrancheScale, axis: Axis) -> Self {
        let tranches: Vec<String> = scale.labels().map(str::to_string).collect();
        let mut counts = vec![PerZone::<usize>::default(); tranches.len()];
        let mut unmatched = Vec::new();

        for (i, shipment) in shipments.iter().enumerate() {
            let value = match axis {
                Axis::Weight => shipment.weight_kg,
                Axis::Um => shipment.um,
            };
            let Some(value) = value else {
                unmatched.push(RowIssue {
                    line: i + 1,
                    message: format!("no {} value", axis),
                });
                continue;
            };
            match scale
                .bin(value)
                .and_then(|t| tranches.iter().position(|l| *l == t.label))
            {
                Some(idx) => {
                    let c = &mut counts[idx];
                    c.set(shipment.zone, c.get(shipment.zone) + 1);
                }
                None => unmatched.push(RowIssue {
                    line: i + 1,
                    message: format!("{} {} matches no tranche", axis, value),
                }),
            }
        }

        if !unmatched.is_empty() {
            tracing::warn!(count = unmatched.len(), %axis, "shipments left out of the distribution");
        }
        Self {
            tranches,
            counts,
            unmatched,
        }
    }

    /// Number of binned shipments
    pub fn total(&self) -> usize {
        self.counts.iter().map(row_total).sum()
    }

    /// Zone shares per tranche, for tranches with at least one shipment
    pub fn zone_shares(&self) -> Distribution {
        self.tranches
            .iter()
            .zip(&self.counts)
            .filter(|&(_, c)| row_total(c) > 0)
            .map(|(label, c)| {
                let n = row_total(c) as f64;
                let shares: ZoneShares = c.map(|_, v| round2(v as f64 / n * 100.0));
                (label.clone(), shares)
            })
            .collect()
    }

    /// Share of each tranche within one zone's shipments, in scale order
    pub fn tranche_shares(&self, zone: Zone) -> Vec<(String, f64)> {
        let n: usize = self.counts.iter().map(|c| c.get(zone)).sum();
        self.percentages(n, |c| c.get(zone))
    }

    /// Share of each tranche among all shipments, in scale order
    pub fn overall_shares(&self) -> Vec<(String, f64)> {
        self.percentages(self.total(), row_total)
    }

    fn percentages(&self, n: usize, count: impl Fn(&PerZone<usize>) -> usize) -> Vec<(String, f64)> {
        self.tranches
            .iter()
            .zip(&self.counts)
            .map(|(label, c)| {
                let pct = if n == 0 {
                    0.0
                } else {
                    round2(count(c) as f64 / n as f64 * 100.0)
                };
                (label.clone(), pct)
            })
            .collect()
    }
}

fn row_total(c: &PerZone<usize>) -> usize {
    c.zone1 + c.zone2 + c.zone3
}

/// Volume statistics for a group of shipments
///
/// Weight and UM totals are present only when every shipment of the group
/// carries that value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GroupStats {
    pub key: String,
    pub shipments: usize,
    pub total_weight: Option<f64>,
    pub mean_weight: Option<f64>,
    pub total_um: Option<f64>,
    pub mean_um: Option<f64>,
}

#[derive(Default)]
struct Sum {
    value: f64,
    missing: bool,
}

impl Sum {
    fn add(&mut self, v: Option<f64>) {
        match v {
            Some(v) => self.value += v,
            None => self.missing = true,
        }
    }

    fn total_and_mean(&self, n: usize) -> (Option<f64>, Option<f64>) {
        if self.missing || n == 0 {
            (None, None)
        } else {
            (Some(round2(self.value)), Some(round2(self.value / n as f64)))
        }
    }
}

#[derive(Default)]
struct Acc {
    n: usize,
    weight: Sum,
    um: Sum,
}

impl Acc {
    fn add(&mut self, s: &Shipment) {
        self.n += 1;
        self.weight.add(s.weight_kg);
        self.um.add(s.um);
    }

    fn finish(self, key: String) -> GroupStats {
        let (total_weight, mean_weight) = self.weight.total_and_mean(self.n);
        let (total_um, mean_um) = self.um.total_and_mean(self.n);
        GroupStats {
            key,
            shipments: self.n,
            total_weight,
            mean_weight,
            total_um,
            mean_um,
        }
    }
}

/// Statistics per zone, for zones with shipments, in tier order
pub fn zone_stats(shipments: &[Shipment]) -> Vec<GroupStats> {
    let mut acc: BTreeMap<Zone, Acc> = BTreeMap::new();
    for s in shipments {
        acc.entry(s.zone).or_default().add(s);
    }
    acc.into_iter()
        .map(|(zone, a)| a.finish(zone.label().to_string()))
        .collect()
}

/// Statistics per agency code; shipments without an agency are left out
pub fn agency_stats(shipments: &[Shipment]) -> Vec<GroupStats> {
    let mut acc: BTreeMap<&str, Acc> = BTreeMap::new();
    for s in shipments {
        if let Some(code) = s.agency_code.as_deref() {
            acc.entry(code).or_default().add(s);
        }
    }
    acc.into_iter()
        .map(|(code, a)| a.finish(code.to_string()))
        .collect()
}

/// Number of shipments per commune
pub fn commune_counts(shipments: &[Shipment]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for commune in shipments.iter().filter_map(|s| s.commune.as_deref()) {
        *counts.entry(commune.to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shipment(weight: f64, zone: Zone, agency: &str, um: Option<f64>) -> Shipment {
        Shipment {
            weight_kg: Some(weight),
            zone,
            agency_code: Some(agency.to_string()),
            commune: Some(format!("{}-{}", agency, zone.index())),
            um,
        }
    }

    fn sample() -> Vec<Shipment> {
        vec![
            shipment(5.0, Zone::Zone1, "NT14G", Some(1.0)),
            shipment(7.5, Zone::Zone1, "NT14G", Some(1.0)),
            shipment(9.0, Zone::Zone2, "NT14G", Some(2.0)),
            shipment(3.0, Zone::Zone3, "NT50S", Some(1.0)),
            shipment(100.0, Zone::Zone2, "NT50S", Some(3.0)),
            shipment(-1.0, Zone::Zone1, "NT50S", None),
        ]
    }

    #[test]
    fn test_zone_shares_per_tranche() {
        let tab = CrossTab::build(&sample(), &TrancheScale::weight(), Axis::Weight);
        assert_eq!(tab.total(), 5);
        assert_eq!(tab.unmatched.len(), 1);
        assert_eq!(tab.unmatched[0].line, 6);

        let shares = tab.zone_shares();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares["0-10kg"], PerZone::new(50.0, 25.0, 25.0));
        assert_eq!(shares["100-200kg"], PerZone::new(0.0, 100.0, 0.0));
    }

    #[test]
    fn test_tranche_shares_per_zone() {
        let tab = CrossTab::build(&sample(), &TrancheScale::weight(), Axis::Weight);
        let zone2 = tab.tranche_shares(Zone::Zone2);
        assert_eq!(zone2.len(), 19);
        assert_eq!(zone2[0], ("0-10kg".to_string(), 50.0));
        assert_eq!(zone2[10], ("100-200kg".to_string(), 50.0));
        let overall = tab.overall_shares();
        assert_eq!(overall[0].1, 80.0);
    }

    #[test]
    fn test_um_axis_skips_missing_values() {
        let tab = CrossTab::build(&sample(), &TrancheScale::pallets(), Axis::Um);
        assert_eq!(tab.total(), 5);
        assert_eq!(tab.unmatched.len(), 1);
        assert_eq!(tab.zone_shares()["1 P"], PerZone::new(66.67, 0.0, 33.33));
    }

    #[test]
    fn test_group_stats() {
        let stats = agency_stats(&sample());
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].key, "NT14G");
        assert_eq!(stats[0].shipments, 3);
        assert_eq!(stats[0].total_weight, Some(21.5));
        assert_eq!(stats[0].mean_weight, Some(7.17));
        assert_eq!(stats[0].total_um, Some(4.0));
        // one NT50S shipment has no UM
        assert_eq!(stats[1].total_um, None);

        let zones = zone_stats(&sample());
        let keys: Vec<&str> = zones.iter().map(|z| z.key.as_str()).collect();
        assert_eq!(keys, vec!["Zone 1", "Zone 2", "Zone 3"]);
    }

    #[test]
    fn test_commune_counts() {
        let counts = commune_counts(&sample());
        assert_eq!(counts["NT14G-0"], 2);
        assert_eq!(counts.values().sum::<usize>(), 6);
    }
}
