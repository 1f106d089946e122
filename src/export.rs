//! Export of computed tables
//!
//! Three renderings of the same results:
//!
//! - CSV: UTF-8, `.` decimals, money with 2 decimals, `;` by default. A
//!   leading `# config sha256:...` line stamps the configuration used.
//! - JSON via `serde_json`, for every result type.
//! - Plain-text reports with aligned columns, for the terminal.

use crate::analysis::ZoneSummary;
use crate::distribution::{CrossTab, GroupStats};
use crate::error::{Error, Result};
use crate::model::{Locality, Zone};
use crate::strategy::{tag, Clustering, CommuneProfile, NewAgencySuggestion, Reassignment, StrategyThresholds};
use crate::tariff::{AgencyTariff, GlobalTariff, TariffTable, ZoneCoefficients};
use serde::Serialize;

/// CSV writer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub delimiter: u8,
    /// Written as a leading comment line when set
    pub fingerprint: Option<String>,
}

impl Default for CsvExport {
    fn default() -> Self {
        Self {
            delimiter: b';',
            fingerprint: None,
        }
    }
}

impl CsvExport {
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn write<I>(&self, header: &[&str], rows: I) -> Result<String>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(&row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        let body = String::from_utf8(bytes).map_err(|e| Error::Other(e.to_string()))?;
        Ok(match &self.fingerprint {
            Some(fp) => format!("# config {}\n{}", fp, body),
            None => body,
        })
    }

    pub fn tariff_table(&self, table: &TariffTable) -> Result<String> {
        self.write(
            &["Tranche", "Zone 1", "Zone 2", "Zone 3", "Total"],
            table.rows.iter().map(|r| {
                vec![
                    r.tranche.clone(),
                    money(r.z1),
                    money(r.z2),
                    money(r.z3),
                    money(r.total),
                ]
            }),
        )
    }

    pub fn global_tariff(&self, tariff: &GlobalTariff, coefficients: &ZoneCoefficients) -> Result<String> {
        self.write(
            &["Zone", "Coefficient", "Tarif"],
            Zone::ALL.iter().map(|&z| {
                vec![
                    z.label().to_string(),
                    coefficients.get(z).to_string(),
                    money(tariff.prices.get(z)),
                ]
            }),
        )
    }

    pub fn agency_tariffs(&self, tariffs: &[AgencyTariff]) -> Result<String> {
        self.write(
            &["Code agence", "Zone 1", "Zone 2", "Zone 3", "Moyenne"],
            tariffs.iter().map(|a| {
                vec![
                    a.agency_code.clone(),
                    money(a.tariff.prices.zone1),
                    money(a.tariff.prices.zone2),
                    money(a.tariff.prices.zone3),
                    money(a.tariff.blended),
                ]
            }),
        )
    }

    /// Localities with their computed distance and zone
    pub fn localities(&self, localities: &[Locality]) -> Result<String> {
        self.write(
            &["Commune", "Code agence", "Latitude", "Longitude", "Distance (km)", "Zone"],
            localities.iter().map(|l| {
                vec![
                    l.commune.clone(),
                    l.agency_code.clone(),
                    l.position.latitude.to_string(),
                    l.position.longitude.to_string(),
                    l.distance_km.map(money).unwrap_or_default(),
                    l.zone.map(|z| z.label().to_string()).unwrap_or_default(),
                ]
            }),
        )
    }

    pub fn zone_summaries(&self, summaries: &[ZoneSummary]) -> Result<String> {
        self.write(
            &[
                "Code agence",
                "Localités",
                "Zone 1",
                "Zone 2",
                "Zone 3",
                "Distance moyenne Zone 1",
                "Distance moyenne Zone 2",
                "Distance moyenne Zone 3",
                "Distance moyenne",
            ],
            summaries.iter().map(|s| {
                let mean = |v: Option<f64>| v.map(money).unwrap_or_default();
                vec![
                    s.agency_code.clone(),
                    s.localities.to_string(),
                    s.per_zone.zone1.to_string(),
                    s.per_zone.zone2.to_string(),
                    s.per_zone.zone3.to_string(),
                    mean(s.mean_distance_km.zone1),
                    mean(s.mean_distance_km.zone2),
                    mean(s.mean_distance_km.zone3),
                    mean(s.overall_mean_km),
                ]
            }),
        )
    }

    /// Counts and zone shares per tranche
    pub fn cross_tab(&self, tab: &CrossTab) -> Result<String> {
        let shares = tab.zone_shares();
        self.write(
            &[
                "Tranche", "Zone 1", "Zone 2", "Zone 3", "% Zone 1", "% Zone 2", "% Zone 3",
            ],
            tab.tranches.iter().zip(&tab.counts).map(|(label, c)| {
                let pct = |z: Zone| {
                    shares
                        .get(label)
                        .map(|s| money(s.get(z)))
                        .unwrap_or_default()
                };
                vec![
                    label.clone(),
                    c.zone1.to_string(),
                    c.zone2.to_string(),
                    c.zone3.to_string(),
                    pct(Zone::Zone1),
                    pct(Zone::Zone2),
                    pct(Zone::Zone3),
                ]
            }),
        )
    }

    pub fn group_stats(&self, key: &str, stats: &[GroupStats]) -> Result<String> {
        let opt = |v: Option<f64>| v.map(money).unwrap_or_default();
        self.write(
            &[key, "Expéditions", "Poids total", "Poids moyen", "UM total", "UM moyen"],
            stats.iter().map(|s| {
                vec![
                    s.key.clone(),
                    s.shipments.to_string(),
                    opt(s.total_weight),
                    opt(s.mean_weight),
                    opt(s.total_um),
                    opt(s.mean_um),
                ]
            }),
        )
    }

    /// One row per commune with its cluster and anomaly tag
    pub fn profiles(
        &self,
        profiles: &[CommuneProfile],
        clustering: &Clustering,
        thresholds: &StrategyThresholds,
    ) -> Result<String> {
        self.write(
            &["Commune", "Code agence", "Distance (km)", "Expéditions", "Cluster", "Anomalie"],
            profiles.iter().zip(&clustering.assignments).map(|(p, c)| {
                vec![
                    p.commune.clone(),
                    p.agency_code.clone(),
                    money(p.distance_km),
                    p.shipments.to_string(),
                    c.to_string(),
                    tag(p, thresholds).map(|a| a.to_string()).unwrap_or_default(),
                ]
            }),
        )
    }

    pub fn reassignments(&self, reassignments: &[Reassignment]) -> Result<String> {
        self.write(
            &[
                "Commune",
                "Agence actuelle",
                "Distance actuelle (km)",
                "Agence suggérée",
                "Distance suggérée (km)",
            ],
            reassignments.iter().map(|r| {
                vec![
                    r.commune.clone(),
                    r.current_agency.clone(),
                    money(r.current_distance_km),
                    r.suggested_agency.clone(),
                    money(r.suggested_distance_km),
                ]
            }),
        )
    }
}

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

/// Pretty JSON for any result
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Column-aligned plain text; the first column is left-aligned, the others
/// right-aligned
#[derive(Debug, Default)]
pub struct TextTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) -> &mut Self {
        self.rows.push(cells);
        self
    }

    pub fn render(&self) -> String {
        let columns = self.header.len();
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(columns) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| {
            let parts: Vec<String> = (0..columns)
                .map(|i| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    let pad = widths[i].saturating_sub(cell.chars().count());
                    if i == 0 {
                        format!("{}{}", cell, " ".repeat(pad))
                    } else {
                        format!("{}{}", " ".repeat(pad), cell)
                    }
                })
                .collect();
            parts.join("  ").trim_end().to_string()
        };

        let mut out = line(&self.header);
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

pub fn tariff_report(table: &TariffTable) -> String {
    let mut out = format!("Policy: {}\n\n", table.policy);
    let mut t = TextTable::new(["Tranche", "Zone 1", "Zone 2", "Zone 3", "Total"]);
    for r in &table.rows {
        t.row(vec![
            r.tranche.clone(),
            money(r.z1),
            money(r.z2),
            money(r.z3),
            money(r.total),
        ]);
    }
    out.push_str(&t.render());

    if !table.flagged.is_empty() {
        out.push_str(&format!("\nFlagged ({}):\n", table.flagged.len()));
        for f in &table.flagged {
            out.push_str(&format!("  ⚠ {}\n", f));
        }
    }
    out
}

pub fn global_report(tariff: &GlobalTariff, coefficients: &ZoneCoefficients, target: f64) -> String {
    let mut t = TextTable::new(["Zone", "Coefficient", "Tarif"]);
    for z in Zone::ALL {
        t.row(vec![
            z.label().to_string(),
            coefficients.get(z).to_string(),
            money(tariff.prices.get(z)),
        ]);
    }
    format!(
        "{}\nTarget: {}  Base: {:.4}  Weighted average: {}\n",
        t.render(),
        money(target),
        tariff.base,
        money(tariff.blended)
    )
}

pub fn agency_report(tariffs: &[AgencyTariff]) -> String {
    let mut t = TextTable::new(["Agency", "Coefficients", "Zone 1", "Zone 2", "Zone 3", "Average"]);
    for a in tariffs {
        let c = &a.coefficients;
        t.row(vec![
            a.agency_code.clone(),
            format!("{}/{}/{}", c.zone1, c.zone2, c.zone3),
            money(a.tariff.prices.zone1),
            money(a.tariff.prices.zone2),
            money(a.tariff.prices.zone3),
            money(a.tariff.blended),
        ]);
    }
    t.render()
}

pub fn zone_report(summaries: &[ZoneSummary]) -> String {
    let mut t = TextTable::new([
        "Agency", "Localities", "Zone 1", "Zone 2", "Zone 3", "Mean km",
    ]);
    for s in summaries {
        t.row(vec![
            s.agency_code.clone(),
            s.localities.to_string(),
            s.per_zone.zone1.to_string(),
            s.per_zone.zone2.to_string(),
            s.per_zone.zone3.to_string(),
            s.overall_mean_km.map(money).unwrap_or_else(|| "-".into()),
        ]);
    }
    t.render()
}

pub fn cross_tab_report(tab: &CrossTab) -> String {
    let shares = tab.zone_shares();
    let mut t = TextTable::new(["Tranche", "Count", "% Zone 1", "% Zone 2", "% Zone 3"]);
    for (label, c) in tab.tranches.iter().zip(&tab.counts) {
        let Some(s) = shares.get(label) else {
            continue;
        };
        t.row(vec![
            label.clone(),
            (c.zone1 + c.zone2 + c.zone3).to_string(),
            money(s.zone1),
            money(s.zone2),
            money(s.zone3),
        ]);
    }
    let mut out = t.render();
    out.push_str(&format!("\n{} shipment(s) binned", tab.total()));
    if !tab.unmatched.is_empty() {
        out.push_str(&format!(", {} unmatched", tab.unmatched.len()));
    }
    out.push('\n');
    out
}

pub fn cluster_report(
    profiles: &[CommuneProfile],
    clustering: &Clustering,
    suggestions: &[NewAgencySuggestion],
) -> String {
    let mut t = TextTable::new(["Cluster", "Communes", "Centroid km", "Centroid shipments"]);
    for (i, c) in clustering.centroids.iter().enumerate() {
        t.row(vec![
            i.to_string(),
            clustering.members(i).len().to_string(),
            format!("{:.1}", c[0]),
            format!("{:.1}", c[1]),
        ]);
    }
    let mut out = format!(
        "{} commune(s), k = {}, inertia {:.1}\n\n{}",
        profiles.len(),
        clustering.k(),
        clustering.inertia,
        t.render()
    );
    if suggestions.is_empty() {
        out.push_str("\nNo cluster calls for a new agency\n");
    } else {
        out.push_str("\nNew agency candidates:\n");
        for s in suggestions {
            out.push_str(&format!(
                "  cluster {}: {} commune(s), mean {} km, {} shipment(s)\n",
                s.cluster, s.communes, s.mean_distance_km, s.total_shipments
            ));
        }
    }
    out
}

pub fn reassign_report(reassignments: &[Reassignment]) -> String {
    if reassignments.is_empty() {
        return "No closer agency found for far localities\n".to_string();
    }
    let mut t = TextTable::new(["Commune", "Current", "km", "Suggested", "km"]);
    for r in reassignments {
        t.row(vec![
            r.commune.clone(),
            r.current_agency.clone(),
            money(r.current_distance_km),
            r.suggested_agency.clone(),
            money(r.suggested_distance_km),
        ]);
    }
    t.render()
}
