//! Nearest-agency reassignment of far localities

use super::far_localities;
use crate::geo::haversine_km;
use crate::model::{Agency, Locality};
use crate::util::round2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reassignment {
    pub commune: String,
    pub current_agency: String,
    pub current_distance_km: f64,
    pub suggested_agency: String,
    pub suggested_distance_km: f64,
}

/// Every known agency, sorted by code
///
/// `agencies` wins; codes it lacks are filled from the agency position
/// carried by the first locality row of that code.
pub fn agency_directory(localities: &[Locality], agencies: &[Agency]) -> Vec<Agency> {
    let mut directory: BTreeMap<String, Agency> = agencies
        .iter()
        .map(|a| (a.code.clone(), a.clone()))
        .collect();
    for locality in localities {
        if let Some(position) = locality.agency_position {
            directory
                .entry(locality.agency_code.clone())
                .or_insert_with(|| Agency {
                    code: locality.agency_code.clone(),
                    position,
                });
        }
    }
    directory.into_values().collect()
}

/// Suggest a closer agency for each locality farther than `far_km`
///
/// The nearest agency by great-circle distance is suggested only when it is
/// not the current one and strictly closer than the current distance. On
/// equal distances the lower agency code wins. Output follows the far
/// localities, farthest first.
pub fn suggest_reassignments(
    localities: &[Locality],
    agencies: &[Agency],
    far_km: f64,
) -> Vec<Reassignment> {
    let directory = agency_directory(localities, agencies);
    if directory.is_empty() {
        tracing::warn!("no agency coordinates, reassignment skipped");
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    for locality in far_localities(localities, far_km) {
        let Some(current) = locality.distance_km else {
            continue;
        };
        let mut best: Option<(&Agency, f64)> = None;
        for agency in &directory {
            let d = haversine_km(locality.position, agency.position);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((agency, d));
            }
        }
        if let Some((agency, d)) = best {
            if agency.code != locality.agency_code && d < current {
                suggestions.push(Reassignment {
                    commune: locality.commune.clone(),
                    current_agency: locality.agency_code.clone(),
                    current_distance_km: round2(current),
                    suggested_agency: agency.code.clone(),
                    suggested_distance_km: round2(d),
                });
            }
        }
    }
    tracing::debug!(count = suggestions.len(), "reassignments suggested");
    suggestions
}
