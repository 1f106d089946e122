//! Tabular input
//!
//! The core never reads files itself; it is handed records through the
//! [`LocalitySource`] and [`ShipmentSource`] traits. [`CsvSource`] is the
//! implementation used by the CLI.
//!
//! CSV conventions of the operational extracts:
//! - `;` delimiter by default
//! - UTF-8, or Latin-1 for older exports; a BOM is dropped
//! - headers are trimmed and matched case-insensitively against aliases
//!   (`Commune` / `commune`, `Code agence` / `code_agence`, ...)
//! - decimal commas are accepted
//!
//! A missing required column aborts the load. A bad row is skipped and
//! reported in the returned [`Batch`].

use crate::error::{Error, Result};
use crate::model::{Agency, Batch, Coordinates, Locality, PerZone, Shipment, Zone};
use crate::tariff::{AgencyShares, BaseTariffs, Distribution};
use crate::util::{decode_text, parse_decimal};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Source of locality rows
pub trait LocalitySource {
    fn localities(&self) -> Result<Batch<Locality>>;
}

/// Source of historical shipment rows
pub trait ShipmentSource {
    fn shipments(&self) -> Result<Batch<Shipment>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

/// A column and the header spellings it is known under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Commune,
    AgencyCode,
    Latitude,
    Longitude,
    AgencyLatitude,
    AgencyLongitude,
    Distance,
    Zone,
    Weight,
    Um,
    Share,
    Tranche,
    BaseTariff,
}

impl Column {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Commune => &["commune", "nom_commune", "localite"],
            Column::AgencyCode => &["code agence", "code_agence", "agence", "agency_code"],
            Column::Latitude => &["latitude", "lat"],
            Column::Longitude => &["longitude", "lon", "lng"],
            Column::AgencyLatitude => &["latitude_agence", "latitude agence", "agency_latitude"],
            Column::AgencyLongitude => &["longitude_agence", "longitude agence", "agency_longitude"],
            Column::Distance => &["distance (km)", "distance_km", "distance"],
            Column::Zone => &["zone"],
            Column::Weight => &["poids", "poids (kg)", "weight_kg", "weight"],
            Column::Um => &["um", "nb_um"],
            Column::Share => &["% d'expéditions", "% d'expeditions", "pourcentage", "share"],
            Column::Tranche => &["tranche", "tranche de poids"],
            Column::BaseTariff => &["forfait", "forfait (€)", "tarif", "base_tariff"],
        }
    }

    /// Canonical header, as written by the exporters
    pub fn header(self) -> &'static str {
        match self {
            Column::Commune => "Commune",
            Column::AgencyCode => "Code agence",
            Column::Latitude => "Latitude",
            Column::Longitude => "Longitude",
            Column::AgencyLatitude => "Latitude_agence",
            Column::AgencyLongitude => "Longitude_agence",
            Column::Distance => "Distance (km)",
            Column::Zone => "Zone",
            Column::Weight => "Poids",
            Column::Um => "UM",
            Column::Share => "% d'expéditions",
            Column::Tranche => "Tranche",
            Column::BaseTariff => "Forfait",
        }
    }
}

fn normalise(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Parsed header row with column positions
struct Table {
    headers: Vec<String>,
    rows: Vec<(usize, StringRecord)>,
}

impl Table {
    fn parse(text: &str, options: &CsvOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(normalise).collect();
        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(i + 2);
            rows.push((line, record));
        }
        Ok(Self { headers, rows })
    }

    fn position(&self, column: Column) -> Option<usize> {
        column
            .aliases()
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    fn position_of(&self, header: &str) -> Option<usize> {
        let wanted = normalise(header);
        self.headers.iter().position(|h| *h == wanted)
    }

    /// Positions of every required column, or one error naming all missing
    fn require(&self, columns: &[Column]) -> Result<Vec<usize>> {
        let mut found = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for &column in columns {
            match self.position(column) {
                Some(i) => found.push(i),
                None => missing.push(column.header()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::input(format!(
                "missing column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(found)
    }
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).filter(|s| !s.is_empty())
}

fn required(record: &StringRecord, idx: usize, name: &str) -> std::result::Result<String, String> {
    field(record, idx)
        .map(str::to_string)
        .ok_or_else(|| format!("empty {}", name))
}

fn number(record: &StringRecord, idx: usize, name: &str) -> std::result::Result<f64, String> {
    let raw = field(record, idx).ok_or_else(|| format!("empty {}", name))?;
    parse_decimal(raw).ok_or_else(|| format!("{} '{}' is not a number", name, raw))
}

fn optional_number(
    record: &StringRecord,
    idx: Option<usize>,
    name: &str,
) -> std::result::Result<Option<f64>, String> {
    match idx.and_then(|i| field(record, i)) {
        None => Ok(None),
        Some(raw) => parse_decimal(raw)
            .map(Some)
            .ok_or_else(|| format!("{} '{}' is not a number", name, raw)),
    }
}

fn zone(record: &StringRecord, idx: usize) -> std::result::Result<Zone, String> {
    let raw = field(record, idx).ok_or("empty zone")?;
    raw.parse::<Zone>().map_err(|e| e.to_string())
}

fn coordinates(lat: f64, lon: f64) -> std::result::Result<Coordinates, String> {
    Coordinates::new(lat, lon).map_err(|e| e.to_string())
}

struct LocalityColumns {
    commune: usize,
    agency: usize,
    lat: usize,
    lon: usize,
    distance: Option<usize>,
    zone: Option<usize>,
    agency_lat: Option<usize>,
    agency_lon: Option<usize>,
}

impl LocalityColumns {
    fn parse(&self, record: &StringRecord) -> std::result::Result<Locality, String> {
        let position = coordinates(
            number(record, self.lat, "latitude")?,
            number(record, self.lon, "longitude")?,
        )?;
        let distance_km = optional_number(record, self.distance, "distance")?;
        if let Some(d) = distance_km.filter(|d| *d < 0.0) {
            return Err(format!("negative distance {}", d));
        }
        let zone = match self.zone.and_then(|i| field(record, i)) {
            Some(raw) => Some(raw.parse::<Zone>().map_err(|e| e.to_string())?),
            None => None,
        };
        let agency_position = match (
            optional_number(record, self.agency_lat, "agency latitude")?,
            optional_number(record, self.agency_lon, "agency longitude")?,
        ) {
            (Some(lat), Some(lon)) => Some(coordinates(lat, lon)?),
            _ => None,
        };
        Ok(Locality {
            commune: required(record, self.commune, "commune")?,
            agency_code: required(record, self.agency, "agency code")?,
            position,
            distance_km,
            zone,
            agency_position,
        })
    }
}

/// Load localities
///
/// Required: commune, agency code, latitude, longitude. Optional: distance,
/// zone, agency latitude/longitude.
pub fn load_localities(content: &str, options: &CsvOptions) -> Result<Batch<Locality>> {
    let table = Table::parse(content, options)?;
    let cols = table.require(&[
        Column::Commune,
        Column::AgencyCode,
        Column::Latitude,
        Column::Longitude,
    ])?;
    let columns = LocalityColumns {
        commune: cols[0],
        agency: cols[1],
        lat: cols[2],
        lon: cols[3],
        distance: table.position(Column::Distance),
        zone: table.position(Column::Zone),
        agency_lat: table.position(Column::AgencyLatitude),
        agency_lon: table.position(Column::AgencyLongitude),
    };

    let mut batch = Batch::default();
    for (line, record) in &table.rows {
        match columns.parse(record) {
            Ok(locality) => batch.records.push(locality),
            Err(message) => batch.skip(*line, message),
        }
    }
    tracing::info!(
        rows = batch.records.len(),
        skipped = batch.skipped.len(),
        "localities loaded"
    );
    Ok(batch)
}

/// Load agency coordinates; a repeated code keeps its first row
pub fn load_agencies(content: &str, options: &CsvOptions) -> Result<Batch<Agency>> {
    let table = Table::parse(content, options)?;
    let code = table.require(&[Column::AgencyCode])?[0];
    // agency files may use either plain or agency-prefixed coordinate headers
    let lat = table
        .position(Column::AgencyLatitude)
        .or_else(|| table.position(Column::Latitude))
        .ok_or_else(|| Error::input("missing column(s): Latitude"))?;
    let lon = table
        .position(Column::AgencyLongitude)
        .or_else(|| table.position(Column::Longitude))
        .ok_or_else(|| Error::input("missing column(s): Longitude"))?;

    let mut batch: Batch<Agency> = Batch::default();
    for (line, record) in &table.rows {
        let parsed = (|| {
            Ok::<_, String>(Agency {
                code: required(record, code, "agency code")?,
                position: coordinates(
                    number(record, lat, "latitude")?,
                    number(record, lon, "longitude")?,
                )?,
            })
        })();
        match parsed {
            Ok(agency) if batch.records.iter().any(|a| a.code == agency.code) => {
                tracing::debug!(code = %agency.code, line, "duplicate agency row ignored");
            }
            Ok(agency) => batch.records.push(agency),
            Err(message) => batch.skip(*line, message),
        }
    }
    Ok(batch)
}

/// Load shipments
///
/// Required: zone, and weight or UM. Optional: agency code, commune, UM.
/// A weight or UM that is present but not numeric skips the row; negative
/// values are kept and left to the binner to reject.
pub fn load_shipments(content: &str, options: &CsvOptions) -> Result<Batch<Shipment>> {
    let table = Table::parse(content, options)?;
    let zone_col = table.require(&[Column::Zone])?[0];
    let weight = table.position(Column::Weight);
    let um = table.position(Column::Um);
    if weight.is_none() && um.is_none() {
        return Err(Error::input("missing column(s): Poids or UM"));
    }
    let agency = table.position(Column::AgencyCode);
    let commune = table.position(Column::Commune);

    let mut batch = Batch::default();
    for (line, record) in &table.rows {
        let parsed = (|| {
            Ok::<_, String>(Shipment {
                weight_kg: optional_number(record, weight, "weight")?,
                zone: zone(record, zone_col)?,
                agency_code: agency.and_then(|i| field(record, i)).map(str::to_string),
                commune: commune.and_then(|i| field(record, i)).map(str::to_string),
                um: optional_number(record, um, "UM")?,
            })
        })();
        match parsed {
            Ok(shipment) => batch.records.push(shipment),
            Err(message) => batch.skip(*line, message),
        }
    }
    tracing::info!(
        rows = batch.records.len(),
        skipped = batch.skipped.len(),
        "shipments loaded"
    );
    Ok(batch)
}

/// Load a distribution table: tranche label, then `Zone 1`..`Zone 3` percentages
///
/// The tranche column is `Tranche` or, failing that, the first column.
/// `% Zone N` columns win over `Zone N` ones, so an exported shipment
/// distribution loads back as shares rather than counts.
pub fn load_distribution(content: &str, options: &CsvOptions) -> Result<Batch<(String, PerZone<f64>)>> {
    let table = Table::parse(content, options)?;
    let tranche = table.position(Column::Tranche).unwrap_or(0);
    let mut zones = Vec::with_capacity(3);
    let mut missing = Vec::new();
    for z in Zone::ALL {
        let pct = format!("% {}", z.label());
        match table.position_of(&pct).or_else(|| table.position_of(z.label())) {
            Some(i) => zones.push(i),
            None => missing.push(z.label()),
        }
    }
    if !missing.is_empty() {
        return Err(Error::input(format!(
            "missing column(s): {}",
            missing.join(", ")
        )));
    }

    let mut batch = Batch::default();
    for (line, record) in &table.rows {
        let parsed = (|| {
            let label = required(record, tranche, "tranche")?;
            let shares = PerZone::new(
                number(record, zones[0], "Zone 1")?,
                number(record, zones[1], "Zone 2")?,
                number(record, zones[2], "Zone 3")?,
            );
            Ok::<_, String>((label, shares))
        })();
        match parsed {
            Ok(row) => batch.records.push(row),
            Err(message) => batch.skip(*line, message),
        }
    }
    Ok(batch)
}

/// Load base tariffs: `Tranche;Forfait`
pub fn load_base_tariffs(content: &str, options: &CsvOptions) -> Result<Batch<(String, f64)>> {
    let table = Table::parse(content, options)?;
    let cols = table.require(&[Column::Tranche, Column::BaseTariff])?;
    let mut batch = Batch::default();
    for (line, record) in &table.rows {
        let parsed = (|| {
            Ok::<_, String>((
                required(record, cols[0], "tranche")?,
                number(record, cols[1], "base tariff")?,
            ))
        })();
        match parsed {
            Ok(row) => batch.records.push(row),
            Err(message) => batch.skip(*line, message),
        }
    }
    Ok(batch)
}

/// Agency code used when a share file has no agency column
pub const NETWORK_CODE: &str = "ALL";

/// Load per-agency zone shares in long form: `Code agence;Zone;% d'expéditions`
///
/// Rows of the same agency are summed per zone; a zone an agency never lists
/// counts as 0. Agencies come out sorted by code.
pub fn load_agency_shares(content: &str, options: &CsvOptions) -> Result<Batch<AgencyShares>> {
    let table = Table::parse(content, options)?;
    let cols = table.require(&[Column::Zone, Column::Share])?;
    let agency = table.position(Column::AgencyCode);

    let mut by_agency: BTreeMap<String, PerZone<f64>> = BTreeMap::new();
    let mut batch = Batch::default();
    for (line, record) in &table.rows {
        let parsed = (|| {
            let code = match agency {
                Some(i) => required(record, i, "agency code")?,
                None => NETWORK_CODE.to_string(),
            };
            let z = zone(record, cols[0])?;
            let share = number(record, cols[1], "share")?;
            Ok::<_, String>((code, z, share))
        })();
        match parsed {
            Ok((code, z, share)) => {
                let entry = by_agency.entry(code).or_default();
                entry.set(z, entry.get(z) + share);
            }
            Err(message) => batch.skip(*line, message),
        }
    }
    batch.records = by_agency
        .into_iter()
        .map(|(agency_code, shares)| AgencyShares {
            agency_code,
            shares,
        })
        .collect();
    Ok(batch)
}

/// Collect key/value rows into a map, reporting duplicate keys as skipped rows
pub fn into_map<V>(batch: Batch<(String, V)>) -> (BTreeMap<String, V>, Batch<()>) {
    let mut map = BTreeMap::new();
    let mut issues: Batch<()> = Batch {
        records: Vec::new(),
        skipped: batch.skipped,
    };
    for (i, (key, value)) in batch.records.into_iter().enumerate() {
        if map.contains_key(&key) {
            issues.skip(i + 1, format!("duplicate tranche '{}'", key));
            continue;
        }
        map.insert(key, value);
    }
    (map, issues)
}

/// Read a file as text, UTF-8 or Latin-1
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_text(&bytes))
}

/// CSV file source
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub options: CsvOptions,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: CsvOptions::default(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.options.delimiter = delimiter;
        self
    }

    pub fn agencies(&self) -> Result<Batch<Agency>> {
        load_agencies(&read_text(&self.path)?, &self.options)
    }

    pub fn agency_shares(&self) -> Result<Batch<AgencyShares>> {
        load_agency_shares(&read_text(&self.path)?, &self.options)
    }

    pub fn distribution(&self) -> Result<(Distribution, Batch<()>)> {
        Ok(into_map(load_distribution(
            &read_text(&self.path)?,
            &self.options,
        )?))
    }

    pub fn base_tariffs(&self) -> Result<(BaseTariffs, Batch<()>)> {
        Ok(into_map(load_base_tariffs(
            &read_text(&self.path)?,
            &self.options,
        )?))
    }
}

impl LocalitySource for CsvSource {
    fn localities(&self) -> Result<Batch<Locality>> {
        load_localities(&read_text(&self.path)?, &self.options)
    }
}

impl ShipmentSource for CsvSource {
    fn shipments(&self) -> Result<Batch<Shipment>> {
        load_shipments(&read_text(&self.path)?, &self.options)
    }
}
