//! File-based flows: CSV sources, zone assignment, distributions and export

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use zonetarif::config_validate::validate_file;
use zonetarif::source::{load_localities, CsvOptions};
use zonetarif::*;

const LOCALITIES: &str = "\
Commune;Code agence;Latitude;Longitude
Caen;NT14G;49,18;-0,37
Bayeux;NT14G;49,2764;-0,7025
Vire;NT14G;48,84;-0,89
Agneaux;NT14G;49,12;-1,08
Saint-Lô;NT50S;49,115;-1,09
Mars;NT14G;north;-0,37
Atlantis;NT99X;49,0;-1,0
";

const AGENCIES: &str = "\
Code agence;Latitude;Longitude
NT14G;49,18;-0,37
NT50S;49,115;-1,09
";

const SHIPMENTS: &str = "\
Poids;Zone;Code agence;Commune
5;Zone 1;NT14G;Caen
7,5;Zone 1;NT14G;Caen
100;Zone 2;NT14G;Bayeux
100,0;Zone 3;NT14G;Vire
abc;Zone 1;NT14G;Caen
-2;Zone 1;NT14G;Caen
";

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_localities_to_zones() {
    let dir = TempDir::new().unwrap();
    let localities = CsvSource::new(write(&dir, "communes.csv", LOCALITIES))
        .localities()
        .unwrap();
    assert_eq!(localities.records.len(), 6);
    assert_eq!(localities.skipped.len(), 1);
    assert_eq!(localities.skipped[0].line, 7);

    let agencies = CsvSource::new(write(&dir, "agences.csv", AGENCIES))
        .agencies()
        .unwrap()
        .records;
    let batch = ZoneThresholds::default().assign_zones(&localities.records, &agencies);
    // Atlantis has no agency coordinates
    assert_eq!(batch.records.len(), 5);
    assert_eq!(batch.skipped.len(), 1);

    let zones: Vec<(&str, Zone)> = batch
        .records
        .iter()
        .map(|l| (l.commune.as_str(), l.zone.unwrap()))
        .collect();
    assert_eq!(
        zones,
        vec![
            ("Caen", Zone::Zone1),
            ("Bayeux", Zone::Zone2),
            ("Vire", Zone::Zone3),
            ("Agneaux", Zone::Zone3),
            ("Saint-Lô", Zone::Zone1),
        ]
    );

    let summaries = zone_summary(&batch.records);
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].agency_code, "NT14G");
    assert_eq!(summaries[0].per_zone, PerZone::new(1, 1, 2));
}

#[test]
fn test_exported_localities_reload() {
    let dir = TempDir::new().unwrap();
    let localities = CsvSource::new(write(&dir, "communes.csv", LOCALITIES))
        .localities()
        .unwrap()
        .records;
    let agencies = CsvSource::new(write(&dir, "agences.csv", AGENCIES))
        .agencies()
        .unwrap()
        .records;
    let located = ZoneThresholds::default()
        .assign_zones(&localities, &agencies)
        .records;

    let csv = CsvExport::default()
        .with_fingerprint("sha256:0123456789abcdef")
        .localities(&located)
        .unwrap();
    assert!(csv.starts_with("# config sha256:0123456789abcdef\n"));
    let reloaded = load_localities(&csv, &CsvOptions::default()).unwrap();
    assert!(reloaded.is_clean());
    assert_eq!(reloaded.records.len(), located.len());
    for (a, b) in reloaded.records.iter().zip(&located) {
        assert_eq!(a.commune, b.commune);
        assert_eq!(a.zone, b.zone);
        assert_eq!(a.distance_km, b.distance_km);
    }
}

#[test]
fn test_latin1_file_is_decoded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("latin1.csv");
    let mut bytes = b"Commune;Code agence;Latitude;Longitude\n".to_vec();
    // "Saint-Lô" in Latin-1
    bytes.extend_from_slice(b"Saint-L\xf4;NT50S;49.115;-1.09\n");
    fs::write(&path, bytes).unwrap();

    let batch = CsvSource::new(&path).localities().unwrap();
    assert_eq!(batch.records[0].commune, "Saint-Lô");
}

#[test]
fn test_shipments_to_distribution() {
    let dir = TempDir::new().unwrap();
    let batch = CsvSource::new(write(&dir, "expeditions.csv", SHIPMENTS))
        .shipments()
        .unwrap();
    assert_eq!(batch.records.len(), 5);
    assert_eq!(batch.skipped.len(), 1);

    let tab = CrossTab::build(&batch.records, &TrancheScale::weight(), Axis::Weight);
    assert_eq!(tab.total(), 4);
    assert_eq!(tab.unmatched.len(), 1);

    let shares = tab.zone_shares();
    assert_eq!(shares["0-10kg"], PerZone::new(100.0, 0.0, 0.0));
    assert_eq!(shares["100-200kg"], PerZone::new(0.0, 50.0, 50.0));

    let counts = commune_counts(&batch.records);
    assert_eq!(counts["Caen"], 3);
}

#[test]
fn test_missing_columns_abort_load() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.csv", "Commune;Latitude\nCaen;49.18\n");
    let err = CsvSource::new(path).localities().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Code agence"), "{}", message);
    assert!(message.contains("Longitude"), "{}", message);
}

#[test]
fn test_repartition_file_to_global_tariff() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "repartition.csv",
        "Code agence;Zone;% d'expéditions\n\
         NT14G;Zone 1;60\nNT14G;Zone 2;30\nNT14G;Zone 3;10\n\
         NT50S;Zone 1;40\nNT50S;Zone 2;40\nNT50S;Zone 3;20\n",
    );
    let agencies = CsvSource::new(path).agency_shares().unwrap().records;
    assert_eq!(agencies.len(), 2);

    let network = aggregate_network_shares(&agencies).unwrap();
    assert_eq!(network, PerZone::new(50.0, 35.0, 15.0));

    let tariff = global_weighted(&network, &PerZone::new(1.0, 2.0, 3.0), 10.0).unwrap();
    assert_eq!(tariff.prices, PerZone::new(6.06, 12.12, 18.18));
}

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let yaml = "version: 1\nthresholds:\n  zone1_max_km: 15\n  zone2_max_km: 35\n";
    let path = write(&dir, "zonetarif.yaml", yaml);

    let result = validate_file(&path);
    assert!(!result.has_errors(), "{:?}", result.issues);

    let config = TariffConfig::load(&path).unwrap();
    assert_eq!(config.thresholds.classify(16.0).unwrap(), Zone::Zone2);

    let fingerprint = config.fingerprint().unwrap();
    assert!(fingerprint.starts_with("sha256:"));
    assert_eq!(fingerprint.len(), "sha256:".len() + 16);
    assert_ne!(fingerprint, TariffConfig::default().fingerprint().unwrap());
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "zonetarif.yaml",
        "thresholds:\n  zone1_max_km: 50\n  zone2_max_km: 40\n",
    );
    let result = validate_file(&path);
    assert_eq!(result.error_count(), 1);
    assert_eq!(result.issues[0].code, "E010");

    let config = TariffConfig::load(&path).unwrap();
    assert!(matches!(config.ensure_valid(), Err(Error::Config(_))));
}
