//! Zone classification by distance to the serving agency
//!
//! Thresholds are inclusive of the lower zone: with the default table a
//! locality exactly 20 km away is still `Zone 1`.

use crate::error::{Error, Result};
use crate::geo::haversine_km;
use crate::model::{Agency, Batch, Locality, Zone};
use crate::util::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper distance bounds of Zone 1 and Zone 2; anything farther is Zone 3
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ZoneThresholds {
    #[serde(default = "default_zone1_max")]
    pub zone1_max_km: f64,
    #[serde(default = "default_zone2_max")]
    pub zone2_max_km: f64,
}

fn default_zone1_max() -> f64 {
    20.0
}

fn default_zone2_max() -> f64 {
    40.0
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            zone1_max_km: default_zone1_max(),
            zone2_max_km: default_zone2_max(),
        }
    }
}

impl ZoneThresholds {
    pub fn new(zone1_max_km: f64, zone2_max_km: f64) -> Result<Self> {
        let thresholds = Self {
            zone1_max_km,
            zone2_max_km,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Require `0 < zone1_max_km < zone2_max_km`, both finite
    pub fn validate(&self) -> Result<()> {
        if !self.zone1_max_km.is_finite() || !self.zone2_max_km.is_finite() {
            return Err(Error::input("zone thresholds must be finite"));
        }
        if self.zone1_max_km <= 0.0 || self.zone1_max_km >= self.zone2_max_km {
            return Err(Error::input(format!(
                "zone thresholds must satisfy 0 < zone1 ({}) < zone2 ({})",
                self.zone1_max_km, self.zone2_max_km
            )));
        }
        Ok(())
    }

    /// Map a distance to its zone
    pub fn classify(&self, distance_km: f64) -> Result<Zone> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(Error::input(format!(
                "distance must be a finite number >= 0, got {}",
                distance_km
            )));
        }
        Ok(if distance_km <= self.zone1_max_km {
            Zone::Zone1
        } else if distance_km <= self.zone2_max_km {
            Zone::Zone2
        } else {
            Zone::Zone3
        })
    }

    /// Distance (rounded to 2 decimals) and zone of a locality served by `agency`
    ///
    /// The zone is derived from the rounded distance, so the stored pair is
    /// always self-consistent.
    pub fn locate(&self, locality: &Locality, agency: &Agency) -> Result<(f64, Zone)> {
        let distance = round2(haversine_km(locality.position, agency.position));
        let zone = self.classify(distance)?;
        Ok((distance, zone))
    }

    /// Recompute distance and zone for every locality
    ///
    /// The agency position comes from `agencies` when the code is known there,
    /// otherwise from the position carried by the locality row. Localities with
    /// neither are skipped and recorded; `line` numbers are 1-based positions
    /// in `localities`.
    pub fn assign_zones(&self, localities: &[Locality], agencies: &[Agency]) -> Batch<Locality> {
        let by_code: HashMap<&str, &Agency> =
            agencies.iter().map(|a| (a.code.as_str(), a)).collect();
        let mut batch = Batch::default();

        for (i, locality) in localities.iter().enumerate() {
            let agency = match by_code.get(locality.agency_code.as_str()) {
                Some(a) => (*a).clone(),
                None => match locality.agency_position {
                    Some(position) => Agency {
                        code: locality.agency_code.clone(),
                        position,
                    },
                    None => {
                        batch.skip(
                            i + 1,
                            format!(
                                "{}: no coordinates for agency '{}'",
                                locality.commune, locality.agency_code
                            ),
                        );
                        continue;
                    }
                },
            };

            match self.locate(locality, &agency) {
                Ok((distance, zone)) => {
                    let mut located = locality.clone();
                    located.distance_km = Some(distance);
                    located.zone = Some(zone);
                    located.agency_position = Some(agency.position);
                    batch.records.push(located);
                }
                Err(e) => batch.skip(i + 1, format!("{}: {}", locality.commune, e)),
            }
        }

        tracing::debug!(
            located = batch.records.len(),
            skipped = batch.skipped.len(),
            "zones assigned"
        );
        batch
    }
}

/// Classify with the default thresholds (Zone 1 <= 20 km, Zone 2 <= 40 km)
pub fn classify(distance_km: f64) -> Result<Zone> {
    ZoneThresholds::default().classify(distance_km)
}
