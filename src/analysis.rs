//! Locality coverage summaries per agency

use crate::model::{Locality, PerZone, Zone};
use crate::util::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an agency's localities spread over the zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ZoneSummary {
    pub agency_code: String,
    pub localities: usize,
    pub per_zone: PerZone<usize>,
    /// Mean distance per zone in km, `None` for an empty zone
    pub mean_distance_km: PerZone<Option<f64>>,
    pub overall_mean_km: Option<f64>,
}

#[derive(Default)]
struct Acc {
    count: PerZone<usize>,
    distance: PerZone<f64>,
}

impl Acc {
    fn add(&mut self, zone: Zone, distance: f64) {
        self.count.set(zone, self.count.get(zone) + 1);
        self.distance.set(zone, self.distance.get(zone) + distance);
    }

    fn finish(self, agency_code: String) -> ZoneSummary {
        let localities = self.count.zone1 + self.count.zone2 + self.count.zone3;
        let total_distance = self.distance.zone1 + self.distance.zone2 + self.distance.zone3;
        let count = self.count;
        ZoneSummary {
            agency_code,
            localities,
            per_zone: count,
            mean_distance_km: self.distance.map(|zone, d| {
                let n = count.get(zone);
                (n > 0).then(|| round2(d / n as f64))
            }),
            overall_mean_km: (localities > 0).then(|| round2(total_distance / localities as f64)),
        }
    }
}

/// One summary per agency code, sorted by code
///
/// Localities without a computed zone and distance are ignored.
pub fn zone_summary(localities: &[Locality]) -> Vec<ZoneSummary> {
    let mut by_agency: BTreeMap<&str, Acc> = BTreeMap::new();
    for (zone, distance, code) in located(localities) {
        by_agency.entry(code).or_default().add(zone, distance);
    }
    by_agency
        .into_iter()
        .map(|(code, acc)| acc.finish(code.to_string()))
        .collect()
}

/// Summary over every located locality, labelled `label`
pub fn network_summary(localities: &[Locality], label: &str) -> ZoneSummary {
    let mut acc = Acc::default();
    for (zone, distance, _) in located(localities) {
        acc.add(zone, distance);
    }
    acc.finish(label.to_string())
}

fn located(localities: &[Locality]) -> impl Iterator<Item = (Zone, f64, &str)> {
    localities.iter().filter_map(|l| {
        Some((l.zone?, l.distance_km?, l.agency_code.as_str()))
    })
}
