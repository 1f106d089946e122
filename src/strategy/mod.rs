//! Network strategy: commune profiles, clustering, anomalies, reassignment
//!
//! Everything here works on [`CommuneProfile`]s, one per commune, built from
//! locality rows where each row stands for one shipment.
//!
//! ```text
//! localities ──► commune_profiles ──► cluster::kmeans ──► suggest_new_agencies
//!      │                 └──────────► anomaly::tag
//!      └──► far_localities ──► reassign::suggest_reassignments
//! ```

pub mod anomaly;
pub mod cluster;
pub mod reassign;

pub use anomaly::{tag, Anomaly};
pub use cluster::{kmeans, Clustering};
pub use reassign::{agency_directory, suggest_reassignments, Reassignment};

use crate::model::{Coordinates, Locality};
use crate::util::round_to;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Thresholds of the strategy heuristics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategyThresholds {
    /// A locality farther than this is "far"
    #[serde(default = "default_far_km")]
    pub far_km: f64,
    /// A far commune with more shipments than this calls for a new agency
    #[serde(default = "default_min_shipments")]
    pub min_shipments: usize,
    #[serde(default = "default_underused_km")]
    pub underused_km: f64,
    #[serde(default = "default_underused_max")]
    pub underused_max: usize,
    #[serde(default = "default_costly_km")]
    pub costly_km: f64,
    #[serde(default = "default_costly_min")]
    pub costly_min: usize,
}

fn default_far_km() -> f64 {
    40.0
}

fn default_min_shipments() -> usize {
    3
}

fn default_underused_km() -> f64 {
    15.0
}

fn default_underused_max() -> usize {
    5
}

fn default_costly_km() -> f64 {
    45.0
}

fn default_costly_min() -> usize {
    10
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            far_km: default_far_km(),
            min_shipments: default_min_shipments(),
            underused_km: default_underused_km(),
            underused_max: default_underused_max(),
            costly_km: default_costly_km(),
            costly_min: default_costly_min(),
        }
    }
}

/// One commune with its distance and shipment count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommuneProfile {
    pub commune: String,
    pub agency_code: String,
    pub distance_km: f64,
    pub shipments: usize,
    pub position: Coordinates,
}

/// Deduplicate locality rows to one profile per commune
///
/// Every row counts as one shipment of its commune. The first row of a
/// commune supplies its agency, distance and position. Rows without a
/// distance are ignored. When `agency` is set, profiles of other agencies
/// are dropped after counting.
pub fn commune_profiles(localities: &[Locality], agency: Option<&str>) -> Vec<CommuneProfile> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut profiles: Vec<CommuneProfile> = Vec::new();

    for locality in localities {
        let Some(distance_km) = locality.distance_km else {
            continue;
        };
        match index.get(locality.commune.as_str()) {
            Some(&i) => profiles[i].shipments += 1,
            None => {
                index.insert(locality.commune.as_str(), profiles.len());
                profiles.push(CommuneProfile {
                    commune: locality.commune.clone(),
                    agency_code: locality.agency_code.clone(),
                    distance_km,
                    shipments: 1,
                    position: locality.position,
                });
            }
        }
    }

    if let Some(code) = agency {
        profiles.retain(|p| p.agency_code == code);
    }
    profiles
}

/// Localities farther than `far_km`, farthest first
pub fn far_localities(localities: &[Locality], far_km: f64) -> Vec<&Locality> {
    let mut far: Vec<&Locality> = localities
        .iter()
        .filter(|l| l.distance_km.is_some_and(|d| d > far_km))
        .collect();
    far.sort_by(|a, b| {
        let da = a.distance_km.unwrap_or_default();
        let db = b.distance_km.unwrap_or_default();
        db.total_cmp(&da)
    });
    far
}

/// A cluster that would justify studying a new agency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewAgencySuggestion {
    pub cluster: usize,
    pub communes: usize,
    /// Mean distance of the cluster's communes, 1 decimal
    pub mean_distance_km: f64,
    pub total_shipments: usize,
}

/// Clusters holding at least one far, busy commune
///
/// `clustering.assignments` must be aligned with `profiles`.
pub fn suggest_new_agencies(
    profiles: &[CommuneProfile],
    clustering: &Clustering,
    thresholds: &StrategyThresholds,
) -> Vec<NewAgencySuggestion> {
    let flagged: BTreeSet<usize> = profiles
        .iter()
        .zip(&clustering.assignments)
        .filter(|(p, _)| p.distance_km > thresholds.far_km && p.shipments > thresholds.min_shipments)
        .map(|(_, &c)| c)
        .collect();

    flagged
        .into_iter()
        .map(|cluster| {
            let members: Vec<&CommuneProfile> = profiles
                .iter()
                .zip(&clustering.assignments)
                .filter(|&(_, &c)| c == cluster)
                .map(|(p, _)| p)
                .collect();
            let n = members.len();
            let total_distance: f64 = members.iter().map(|p| p.distance_km).sum();
            NewAgencySuggestion {
                cluster,
                communes: n,
                mean_distance_km: round_to(total_distance / n as f64, 1),
                total_shipments: members.iter().map(|p| p.shipments).sum(),
            }
        })
        .collect()
}
