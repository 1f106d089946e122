//! Config validation
//!
//! Checks a tariff configuration beyond what parsing guarantees and reports
//! coded issues: `E0xx` errors make the configuration unusable, `W0xx`
//! warnings point at inputs that will be flagged or look unintended.

use crate::config::{ScaleConfig, TariffConfig, CONFIG_VERSION};
use crate::tariff::{check_shares, ZoneCoefficients};
use serde::Serialize;
use std::path::Path;

/// Severity level for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A validation issue found in config
#[derive(Debug, Clone, Serialize)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub file: String,
}

impl ConfigIssue {
    pub fn error(code: &str, message: &str, file: &str) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            message: message.to_string(),
            file: file.to_string(),
        }
    }

    pub fn warning(code: &str, message: &str, file: &str) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.to_string(),
            file: file.to_string(),
        }
    }
}

/// Result of config validation
#[derive(Debug, Default, Serialize)]
pub struct ConfigValidationResult {
    pub issues: Vec<ConfigIssue>,
}

impl ConfigValidationResult {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn first_error(&self) -> Option<&ConfigIssue> {
        self.issues.iter().find(|i| i.severity == Severity::Error)
    }

    fn error(&mut self, code: &str, message: impl AsRef<str>, file: &str) {
        self.issues
            .push(ConfigIssue::error(code, message.as_ref(), file));
    }

    fn warning(&mut self, code: &str, message: impl AsRef<str>, file: &str) {
        self.issues
            .push(ConfigIssue::warning(code, message.as_ref(), file));
    }
}

/// Validate a configuration file
pub fn validate_file(path: &Path) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::default();
    let file_str = path.display().to_string();

    if !path.exists() {
        result.error("E001", "File does not exist", &file_str);
        return result;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.error("E002", format!("Cannot read file: {}", e), &file_str);
            return result;
        }
    };

    let config: TariffConfig = match serde_norway::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            result.error("E003", format!("Invalid YAML: {}", e), &file_str);
            return result;
        }
    };

    result
        .issues
        .extend(validate_config(&config, &file_str).issues);
    result
}

/// Validate an already parsed configuration
pub fn validate_config(config: &TariffConfig, file: &str) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::default();

    if config.version != CONFIG_VERSION {
        result.error(
            "E004",
            format!(
                "Unsupported version: {}. Only version {} is supported.",
                config.version, CONFIG_VERSION
            ),
            file,
        );
    }

    if let Err(e) = config.thresholds.validate() {
        result.error("E010", format!("thresholds: {}", e), file);
    }

    if let Err(e) = config.fixed_gap.validate() {
        result.error("E011", format!("fixed_gap: {}", e), file);
    }

    let mut coefficient_sets: Vec<(String, &ZoneCoefficients)> = vec![
        ("direct".to_string(), &config.direct),
        ("weighted".to_string(), &config.weighted),
        ("agency_default".to_string(), &config.agency_default),
    ];
    for (code, c) in &config.agency_coefficients {
        coefficient_sets.push((format!("agency_coefficients.{}", code), c));
    }
    for (name, coefficients) in &coefficient_sets {
        validate_coefficients(name, coefficients, file, &mut result);
    }

    if !config.target_tariff.is_finite() || config.target_tariff <= 0.0 {
        result.error(
            "E013",
            format!("target_tariff must be > 0, got {}", config.target_tariff),
            file,
        );
    }

    if !config.sum_tolerance.is_finite() || config.sum_tolerance < 0.0 {
        result.error(
            "E014",
            format!("sum_tolerance must be >= 0, got {}", config.sum_tolerance),
            file,
        );
    } else if config.sum_tolerance > 5.0 {
        result.warning(
            "W005",
            format!(
                "sum_tolerance {} accepts distributions far from 100%",
                config.sum_tolerance
            ),
            file,
        );
    }

    let s = &config.strategy;
    if !(s.far_km.is_finite() && s.underused_km.is_finite() && s.costly_km.is_finite())
        || s.far_km < 0.0
        || s.underused_km < 0.0
        || s.costly_km < 0.0
    {
        result.error("E015", "strategy distances must be finite and >= 0", file);
    }

    validate_scale("weight", &config.scales.weight, true, config, file, &mut result);
    validate_scale("pallets", &config.scales.pallets, false, config, file, &mut result);

    result
}

fn validate_coefficients(
    name: &str,
    coefficients: &ZoneCoefficients,
    file: &str,
    result: &mut ConfigValidationResult,
) {
    if let Some((zone, c)) = coefficients
        .iter()
        .find(|(_, c)| !c.is_finite() || *c <= 0.0)
    {
        result.error(
            "E012",
            format!("{}: {} coefficient must be > 0, got {}", name, zone, c),
            file,
        );
        return;
    }
    if coefficients.zone1 > coefficients.zone2 || coefficients.zone2 > coefficients.zone3 {
        result.warning(
            "W004",
            format!(
                "{}: coefficients decrease with distance ({} / {} / {})",
                name, coefficients.zone1, coefficients.zone2, coefficients.zone3
            ),
            file,
        );
    }
}

fn validate_scale(
    name: &str,
    scale_config: &ScaleConfig,
    from_zero: bool,
    config: &TariffConfig,
    file: &str,
    result: &mut ConfigValidationResult,
) {
    let scale = match scale_config.scale() {
        Ok(s) => s,
        Err(e) => {
            result.error("E020", format!("scales.{}: {}", name, e), file);
            return;
        }
    };
    if from_zero && !scale.partitions_from_zero() {
        result.error(
            "E021",
            format!("scales.{}: first tranche must start at 0", name),
            file,
        );
    }

    if let Some(params) = &scale_config.fixed_gap {
        if let Err(e) = params.validate() {
            result.error("E011", format!("scales.{}.fixed_gap: {}", name, e), file);
        }
    }

    for (label, base) in &scale_config.base_tariffs {
        if scale.get(label).is_err() {
            result.error(
                "E022",
                format!("scales.{}: base tariff for unknown tranche '{}'", name, label),
                file,
            );
        } else if !base.is_finite() || *base <= 0.0 {
            result.error(
                "E024",
                format!("scales.{}: base tariff of '{}' must be > 0, got {}", name, label, base),
                file,
            );
        } else if !scale_config.distribution.contains_key(label) {
            result.warning(
                "W002",
                format!("scales.{}: '{}' has a base tariff but no distribution", name, label),
                file,
            );
        }
    }

    for (label, shares) in &scale_config.distribution {
        if scale.get(label).is_err() {
            result.error(
                "E023",
                format!("scales.{}: distribution for unknown tranche '{}'", name, label),
                file,
            );
            continue;
        }
        if let Err(reason) = check_shares(shares, config.sum_tolerance) {
            result.warning(
                "W001",
                format!("scales.{}: '{}' will be flagged: {}", name, label, reason),
                file,
            );
        }
        if !scale_config.base_tariffs.contains_key(label) {
            result.warning(
                "W003",
                format!("scales.{}: '{}' has a distribution but no base tariff", name, label),
                file,
            );
        }
    }

    if scale_config.base_tariffs.is_empty() {
        result.warning(
            "W006",
            format!("scales.{}: no base tariffs, nothing will be priced", name),
            file,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PerZone;
    use tempfile::TempDir;

    fn codes(result: &ConfigValidationResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn test_default_config_has_no_issues() {
        let result = validate_config(&TariffConfig::default(), "default");
        assert!(result.issues.is_empty(), "{:?}", result.issues);
    }

    #[test]
    fn test_invalid_thresholds_and_gap() {
        let mut config = TariffConfig::default();
        config.thresholds.zone1_max_km = 50.0;
        config.fixed_gap.gap = -1.0;
        let result = validate_config(&config, "cfg.yaml");
        assert!(result.has_errors());
        let codes = codes(&result);
        assert!(codes.contains(&"E010"));
        assert!(codes.contains(&"E011"));
    }

    #[test]
    fn test_swapped_gap_coefficients_are_error() {
        let mut config = TariffConfig::default();
        config.fixed_gap.coef_zone2 = 3.0;
        config.fixed_gap.coef_zone3 = 1.5;
        let result = validate_config(&config, "cfg.yaml");
        assert_eq!(codes(&result), vec!["E011"]);
    }

    #[test]
    fn test_zero_coefficient_is_error() {
        let mut config = TariffConfig::default();
        config
            .agency_coefficients
            .insert("NT27E".into(), PerZone::new(1.0, 0.0, 2.0));
        let result = validate_config(&config, "cfg.yaml");
        assert_eq!(result.error_count(), 1);
        assert!(result.issues[0].message.contains("NT27E"));
    }

    #[test]
    fn test_decreasing_coefficients_warn() {
        let mut config = TariffConfig::default();
        config.weighted = PerZone::new(3.0, 2.0, 1.0);
        let result = validate_config(&config, "cfg.yaml");
        assert!(!result.has_errors());
        assert_eq!(codes(&result), vec!["W004"]);
    }

    #[test]
    fn test_distribution_problems() {
        let mut config = TariffConfig::default();
        let weight = &mut config.scales.weight;
        weight
            .distribution
            .insert("0-10kg".into(), PerZone::new(50.0, 30.0, 10.0));
        weight
            .distribution
            .insert("0-15kg".into(), PerZone::new(50.0, 35.0, 15.0));
        let result = validate_config(&config, "cfg.yaml");
        let codes = codes(&result);
        assert!(codes.contains(&"W001"));
        assert!(codes.contains(&"E023"));
    }

    #[test]
    fn test_weight_scale_must_start_at_zero() {
        let mut config = TariffConfig::default();
        config.scales.weight.tranches = vec!["5-10kg".into(), ">10kg".into()];
        config.scales.weight.base_tariffs.clear();
        config.scales.weight.distribution.clear();
        let result = validate_config(&config, "cfg.yaml");
        assert!(codes(&result).contains(&"E021"));
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = validate_file(&dir.path().join("zonetarif.yaml"));
        assert_eq!(codes(&result), vec!["E001"]);
    }

    #[test]
    fn test_validate_file_bad_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zonetarif.yaml");
        std::fs::write(&path, "thresholds: [1, 2\n").unwrap();
        let result = validate_file(&path);
        assert_eq!(codes(&result), vec!["E003"]);
    }

    #[test]
    fn test_validate_file_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zonetarif.yaml");
        std::fs::write(&path, "version: 99\n").unwrap();
        let result = validate_file(&path);
        assert!(codes(&result).contains(&"E004"));
    }
}
