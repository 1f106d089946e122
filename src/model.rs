//! Domain types: the data model shared by every computation
//!
//! Records are validated once at the boundary (see [`crate::source`]) and
//! flow through the core as these typed structs.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A delivery-cost tier assigned by distance from the serving agency
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Zone {
    #[serde(rename = "Zone 1")]
    Zone1,
    #[serde(rename = "Zone 2")]
    Zone2,
    #[serde(rename = "Zone 3")]
    Zone3,
}

impl Zone {
    /// All zones in tier order
    pub const ALL: [Zone; 3] = [Zone::Zone1, Zone::Zone2, Zone::Zone3];

    /// Position in [`Zone::ALL`]
    pub fn index(self) -> usize {
        match self {
            Zone::Zone1 => 0,
            Zone::Zone2 => 1,
            Zone::Zone3 => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Zone::Zone1 => "Zone 1",
            Zone::Zone2 => "Zone 2",
            Zone::Zone3 => "Zone 3",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Zone {
    type Err = Error;

    /// Accepts `Zone 1`, `zone1`, `Z1` or a bare `1`
    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_lowercase();
        let digit = compact
            .strip_prefix("zone")
            .or_else(|| compact.strip_prefix('z'))
            .unwrap_or(compact.as_str());
        match digit {
            "1" => Ok(Zone::Zone1),
            "2" => Ok(Zone::Zone2),
            "3" => Ok(Zone::Zone3),
            _ => Err(Error::Lookup(format!("unknown zone label '{}'", s.trim()))),
        }
    }
}

/// One value per zone, indexed by [`Zone::index`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PerZone<T> {
    pub zone1: T,
    pub zone2: T,
    pub zone3: T,
}

impl<T: Copy> PerZone<T> {
    pub fn new(zone1: T, zone2: T, zone3: T) -> Self {
        Self {
            zone1,
            zone2,
            zone3,
        }
    }

    pub fn get(&self, zone: Zone) -> T {
        match zone {
            Zone::Zone1 => self.zone1,
            Zone::Zone2 => self.zone2,
            Zone::Zone3 => self.zone3,
        }
    }

    pub fn set(&mut self, zone: Zone, value: T) {
        match zone {
            Zone::Zone1 => self.zone1 = value,
            Zone::Zone2 => self.zone2 = value,
            Zone::Zone3 => self.zone3 = value,
        }
    }

    pub fn map<U: Copy>(&self, f: impl Fn(Zone, T) -> U) -> PerZone<U> {
        PerZone::new(
            f(Zone::Zone1, self.zone1),
            f(Zone::Zone2, self.zone2),
            f(Zone::Zone3, self.zone3),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (Zone, T)> + '_ {
        Zone::ALL.into_iter().map(move |z| (z, self.get(z)))
    }
}

/// A (latitude, longitude) pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::input(format!("latitude {} out of range", latitude)));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::input(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A depot serving a set of localities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Agency {
    pub code: String,
    pub position: Coordinates,
}

/// A commune served from one agency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Locality {
    pub commune: String,
    pub agency_code: String,
    pub position: Coordinates,
    /// Straight-line distance to the agency, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    /// Agency position carried by the source row, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_position: Option<Coordinates>,
}

/// A historical shipment, as used for distribution building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Shipment {
    /// Absent in pallet-only extracts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    pub zone: Zone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commune: Option<String>,
    /// Pallet-equivalent count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub um: Option<f64>,
}

/// A row that was skipped during a batch, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RowIssue {
    /// 1-based line number in the source, header included
    pub line: usize,
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Records accepted from a batch plus the rows that were skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch<T> {
    pub records: Vec<T>,
    pub skipped: Vec<RowIssue>,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Batch<T> {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Record a skipped row and log it
    pub fn skip(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(line, %message, "row skipped");
        self.skipped.push(RowIssue { line, message });
    }
}
