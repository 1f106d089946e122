//! Worked examples for classification, binning and the three pricing policies

use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeMap;
use zonetarif::tariff::{Distribution, FlagKind};
use zonetarif::*;

#[rstest]
#[case(0.0, Zone::Zone1)]
#[case(20.0, Zone::Zone1)]
#[case(20.0001, Zone::Zone2)]
#[case(40.0, Zone::Zone2)]
#[case(40.01, Zone::Zone3)]
#[case(250.0, Zone::Zone3)]
fn test_classification_boundaries(#[case] km: f64, #[case] expected: Zone) {
    assert_eq!(classify(km).unwrap(), expected);
}

#[rstest]
#[case(-0.1)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn test_classification_rejects_bad_distance(#[case] km: f64) {
    assert!(matches!(classify(km), Err(Error::InputValidation(_))));
}

#[rstest]
#[case(0.0, "0-10kg")]
#[case(9.99, "0-10kg")]
#[case(10.0, "10-20kg")]
#[case(100.0, "100-200kg")]
#[case(2999.9, "2000-3000kg")]
#[case(3000.0, ">3000kg")]
#[case(125000.0, ">3000kg")]
fn test_weight_binning(#[case] kg: f64, #[case] expected: &str) {
    assert_eq!(weight_tranche(kg).as_deref(), Some(expected));
}

#[test]
fn test_text_weights_accept_decimal_comma() {
    let scale = TrancheScale::weight();
    assert_eq!(scale.bin_text("99,5").unwrap().label, "90-100kg");
    assert_eq!(scale.bin_text("100.0").unwrap().label, "100-200kg");
    assert!(matches!(scale.bin_text("lourd"), Err(Error::InputValidation(_))));
    assert!(matches!(scale.bin_text("-3"), Err(Error::Lookup(_))));
}

fn single(label: &str, base: f64, shares: PerZone<f64>) -> (BTreeMap<String, f64>, Distribution) {
    let mut tariffs = BTreeMap::new();
    tariffs.insert(label.to_string(), base);
    let mut distribution = Distribution::new();
    distribution.insert(label.to_string(), shares);
    (tariffs, distribution)
}

#[test]
fn test_fixed_gap_round_trip() {
    let (tariffs, distribution) = single("40-50kg", 10.52, PerZone::new(49.68, 37.61, 12.71));
    let table = fixed_gap(
        &TrancheScale::weight(),
        &tariffs,
        &distribution,
        &FixedGapParams::default(),
        &SolveOptions::default(),
    )
    .unwrap();

    let row = table.row("40-50kg").unwrap();
    assert_eq!((row.z1, row.z2, row.z3), (10.16, 10.73, 11.3));
    assert!((row.total - 10.52).abs() <= 0.01);
    assert!(table.is_clean());
}

#[test]
fn test_zero_gap_gives_flat_prices() {
    let (tariffs, distribution) = single("0-10kg", 6.5, PerZone::new(51.54, 34.25, 14.21));
    let params = FixedGapParams::new(0.0, 1.5, 3.0).unwrap();
    let table = fixed_gap(
        &TrancheScale::weight(),
        &tariffs,
        &distribution,
        &params,
        &SolveOptions::default(),
    )
    .unwrap();
    let row = table.row("0-10kg").unwrap();
    assert_eq!((row.z1, row.z2, row.z3, row.total), (6.5, 6.5, 6.5, 6.5));
}

#[test]
fn test_bad_share_row_is_flagged_not_normalised() {
    let (tariffs, distribution) = single("0-10kg", 6.5, PerZone::new(40.0, 30.0, 20.0));
    let table = fixed_gap(
        &TrancheScale::weight(),
        &tariffs,
        &distribution,
        &FixedGapParams::default(),
        &SolveOptions::default(),
    )
    .unwrap();
    assert!(table.rows.is_empty());
    assert_eq!(table.flagged.len(), 1);
    assert_eq!(table.flagged[0].kind, FlagKind::ShareSum);

    let strict = fixed_gap(
        &TrancheScale::weight(),
        &tariffs,
        &distribution,
        &FixedGapParams::default(),
        &SolveOptions::strict(),
    );
    assert!(matches!(strict, Err(Error::InputValidation(_))));
}

#[test]
fn test_negative_gap_aborts() {
    let err = FixedGapParams::new(-0.1, 1.5, 3.0).unwrap_err();
    assert!(matches!(err, Error::InputValidation(_)));
}

#[test]
fn test_unknown_tranche_is_lookup_error() {
    let (tariffs, distribution) = single("0-15kg", 6.5, PerZone::new(50.0, 35.0, 15.0));
    let err = fixed_gap(
        &TrancheScale::weight(),
        &tariffs,
        &distribution,
        &FixedGapParams::default(),
        &SolveOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Lookup(_)));
}

#[test]
fn test_direct_policy() {
    let (tariffs, _) = single("40-50kg", 8.3, PerZone::new(50.0, 35.0, 15.0));
    let table = direct(
        &TrancheScale::weight(),
        &tariffs,
        &PerZone::new(1.0, 1.5, 2.0),
        None,
        &SolveOptions::default(),
    )
    .unwrap();
    let row = table.row("40-50kg").unwrap();
    assert_eq!((row.z1, row.z2, row.z3), (8.3, 12.45, 16.6));
    assert_eq!(table.policy, PricingPolicy::Direct);
}

#[test]
fn test_global_weighted_allocation() {
    let tariff = global_weighted(
        &PerZone::new(50.0, 35.0, 15.0),
        &PerZone::new(1.0, 2.0, 3.0),
        10.0,
    )
    .unwrap();
    // base = 10 / (0.5 + 0.7 + 0.45)
    assert_eq!(tariff.prices, PerZone::new(6.06, 12.12, 18.18));
    assert!((tariff.blended - 10.0).abs() <= 0.01);
}

#[test]
fn test_global_weighted_zero_denominator() {
    let err = global_weighted(
        &PerZone::new(0.0, 0.0, 0.0),
        &PerZone::new(1.0, 2.0, 3.0),
        10.0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Computation(_)));
}

#[test]
fn test_reference_tables_price_every_tranche() {
    let config = TariffConfig::default();
    for kind in [ScaleKind::Weight, ScaleKind::Pallets] {
        let scale_config = config.scale(kind);
        let table = fixed_gap(
            &scale_config.scale().unwrap(),
            &scale_config.base_tariffs,
            &scale_config.distribution,
            &scale_config.gap_params(&config.fixed_gap),
            &config.solve_options(),
        )
        .unwrap();
        assert_eq!(table.rows.len(), scale_config.base_tariffs.len(), "{}", kind);
        assert!(table
            .flagged
            .iter()
            .all(|f| f.kind == FlagKind::RoundTrip));
        for row in &table.rows {
            assert!(row.z1 <= row.z2 && row.z2 <= row.z3, "{:?}", row);
        }
    }
}

#[test]
fn test_per_agency_allocation_uses_overrides() {
    let agencies = vec![
        AgencyShares {
            agency_code: "NT50S".into(),
            shares: PerZone::new(50.0, 35.0, 15.0),
        },
        AgencyShares {
            agency_code: "NT99X".into(),
            shares: PerZone::new(50.0, 35.0, 15.0),
        },
    ];
    let config = TariffConfig::default();
    let batch = per_agency_weighted(
        &agencies,
        &config.agency_coefficients,
        &config.agency_default,
        10.0,
    )
    .unwrap();
    assert!(batch.is_clean());
    assert_eq!(batch.records[0].coefficients, PerZone::new(1.0, 1.6, 2.1));
    assert_eq!(batch.records[1].coefficients, PerZone::new(1.0, 1.5, 2.0));
    for tariff in &batch.records {
        assert!((tariff.tariff.blended - 10.0).abs() <= 0.01);
    }
}

#[test]
fn test_weighted_shares_are_not_rescaled() {
    let coefficients = PerZone::new(1.0, 2.0, 3.0);
    // counts instead of percentages
    let err = global_weighted(&PerZone::new(500.0, 350.0, 150.0), &coefficients, 10.0).unwrap_err();
    assert!(matches!(err, Error::InputValidation(_)));

    let agencies = vec![
        AgencyShares {
            agency_code: "NT14G".into(),
            shares: PerZone::new(50.0, 35.0, 5.0),
        },
        AgencyShares {
            agency_code: "NT50S".into(),
            shares: PerZone::new(50.0, 35.0, 15.0),
        },
    ];
    let batch = per_agency_weighted(&agencies, &BTreeMap::new(), &coefficients, 10.0).unwrap();
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].agency_code, "NT50S");
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].line, 1);
}
