//! Weight tranche scales and binning
//!
//! A [`TrancheScale`] is an ordered list of contiguous left-closed,
//! right-open buckets ending unbounded; weight scales start at 0 and so
//! partition `[0, inf)`. A weight of exactly 100 kg lands in `100-200kg`,
//! never in `90-100kg`.
//!
//! Scales can be written out bound by bound, or derived from their labels:
//!
//! | Label        | Bucket           |
//! |--------------|------------------|
//! | `0-10kg`     | `[0, 10)`        |
//! | `>3000kg`    | `[3000, inf)`    |
//! | `3 P`        | `[3, 4)`         |
//! | `P sup`      | `[previous, inf)`|

use crate::error::{Error, Result};
use crate::util::parse_decimal;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One bucket of a scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Tranche {
    pub label: String,
    /// Inclusive lower bound
    pub min: f64,
    /// Exclusive upper bound; `None` means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Tranche {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.is_none_or(|max| value < max)
    }
}

/// An ordered, gap-free set of tranches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrancheScale {
    pub tranches: Vec<Tranche>,
}

/// Labels of the reference weight scale
pub const WEIGHT_LABELS: [&str; 19] = [
    "0-10kg",
    "10-20kg",
    "20-30kg",
    "30-40kg",
    "40-50kg",
    "50-60kg",
    "60-70kg",
    "70-80kg",
    "80-90kg",
    "90-100kg",
    "100-200kg",
    "200-300kg",
    "300-500kg",
    "500-700kg",
    "700-1000kg",
    "1000-1500kg",
    "1500-2000kg",
    "2000-3000kg",
    ">3000kg",
];

/// Lower bounds of the reference weight scale, in kg
pub const WEIGHT_BOUNDS: [f64; 19] = [
    0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 200.0, 300.0, 500.0, 700.0,
    1000.0, 1500.0, 2000.0, 3000.0,
];

/// Labels of the reference pallet (UM) scale
pub const PALLET_LABELS: [&str; 7] = ["1 P", "2 P", "3 P", "4 P", "5 P", "6 P", "P sup"];

/// Lower bounds of the reference pallet scale, in pallet equivalents
pub const PALLET_BOUNDS: [f64; 7] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:[.,]\d+)?)\s*-\s*(\d+(?:[.,]\d+)?)\s*[[:alpha:]]*\s*$")
            .expect("valid range regex")
    })
}

fn open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*>=?\s*(\d+(?:[.,]\d+)?)\s*[[:alpha:]]*\s*$").expect("valid open regex")
    })
}

fn count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*[Pp]\s*$").expect("valid count regex"))
}

fn supplement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*p\s*sup\s*$").expect("valid supplement regex"))
}

impl TrancheScale {
    /// Build and validate a scale from explicit tranches
    pub fn new(tranches: Vec<Tranche>) -> Result<Self> {
        let scale = Self { tranches };
        scale.validate()?;
        Ok(scale)
    }

    /// Derive bounds from labels (see the module table)
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let mut tranches: Vec<Tranche> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            let previous_max = tranches.last().and_then(|t| t.max);
            let (min, max) = if let Some(caps) = range_re().captures(label) {
                (number(&caps[1], label)?, Some(number(&caps[2], label)?))
            } else if let Some(caps) = open_re().captures(label) {
                (number(&caps[1], label)?, None)
            } else if let Some(caps) = count_re().captures(label) {
                let n = number(&caps[1], label)?;
                (n, Some(n + 1.0))
            } else if supplement_re().is_match(label) {
                let min = previous_max.ok_or_else(|| {
                    Error::input(format!("'{}' must follow a bounded tranche", label))
                })?;
                (min, None)
            } else {
                return Err(Error::input(format!(
                    "cannot derive bounds from tranche label '{}'",
                    label
                )));
            };
            tranches.push(Tranche {
                label: label.trim().to_string(),
                min,
                max,
            });
        }
        Self::new(tranches)
    }

    /// The reference weight scale, `0-10kg` to `>3000kg`
    pub fn weight() -> Self {
        Self::from_bounds(&WEIGHT_LABELS, &WEIGHT_BOUNDS)
    }

    /// The reference pallet scale, `1 P` to `P sup`
    pub fn pallets() -> Self {
        Self::from_bounds(&PALLET_LABELS, &PALLET_BOUNDS)
    }

    fn from_bounds(labels: &[&str], mins: &[f64]) -> Self {
        let tranches = labels
            .iter()
            .zip(mins)
            .enumerate()
            .map(|(i, (label, &min))| Tranche {
                label: (*label).to_string(),
                min,
                max: mins.get(i + 1).copied(),
            })
            .collect();
        Self { tranches }
    }

    /// Whether the scale covers every value from 0 upwards
    ///
    /// Weight scales must; count scales such as pallets start at 1.
    pub fn partitions_from_zero(&self) -> bool {
        self.tranches.first().is_some_and(|t| t.min == 0.0)
    }

    /// Require contiguous, non-empty tranches ending unbounded
    pub fn validate(&self) -> Result<()> {
        let Some(last) = self.tranches.last() else {
            return Err(Error::input("scale has no tranches"));
        };
        if last.max.is_some() {
            return Err(Error::input(format!(
                "last tranche '{}' must be unbounded",
                last.label
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for t in &self.tranches {
            if !seen.insert(t.label.as_str()) {
                return Err(Error::input(format!("duplicate tranche label '{}'", t.label)));
            }
            if !t.min.is_finite() || t.min < 0.0 {
                return Err(Error::input(format!(
                    "tranche '{}' has invalid lower bound {}",
                    t.label, t.min
                )));
            }
            if let Some(max) = t.max {
                if max.is_nan() || max <= t.min {
                    return Err(Error::input(format!(
                        "tranche '{}' is empty: [{}, {})",
                        t.label, t.min, max
                    )));
                }
            }
        }
        for pair in self.tranches.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.max != Some(b.min) {
                return Err(Error::input(format!(
                    "tranches '{}' and '{}' are not contiguous",
                    a.label, b.label
                )));
            }
        }
        Ok(())
    }

    /// The bucket holding `value`, if any
    pub fn bin(&self, value: f64) -> Option<&Tranche> {
        if !value.is_finite() {
            return None;
        }
        // Tranches are sorted and contiguous: last one whose min <= value
        let idx = self.tranches.partition_point(|t| t.min <= value);
        let candidate = self.tranches.get(idx.checked_sub(1)?)?;
        candidate.contains(value).then_some(candidate)
    }

    /// Parse a textual weight (`,` or `.` decimals) and bin it
    pub fn bin_text(&self, raw: &str) -> Result<&Tranche> {
        let value = parse_decimal(raw)
            .ok_or_else(|| Error::input(format!("'{}' is not a number", raw.trim())))?;
        self.bin(value)
            .ok_or_else(|| Error::Lookup(format!("{} matches no tranche", value)))
    }

    /// Find a tranche by label
    pub fn get(&self, label: &str) -> Result<&Tranche> {
        self.tranches
            .iter()
            .find(|t| t.label == label.trim())
            .ok_or_else(|| Error::Lookup(format!("unknown tranche '{}'", label.trim())))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tranches.iter().map(|t| t.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.tranches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tranches.is_empty()
    }
}

fn number(raw: &str, label: &str) -> Result<f64> {
    parse_decimal(raw).ok_or_else(|| Error::input(format!("bad bound '{}' in '{}'", raw, label)))
}

/// Bin with the reference weight scale
pub fn weight_tranche(weight_kg: f64) -> Option<String> {
    TrancheScale::weight().bin(weight_kg).map(|t| t.label.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "0-10kg")]
    #[case(9.999, "0-10kg")]
    #[case(10.0, "10-20kg")]
    #[case(45.5, "40-50kg")]
    #[case(99.99, "90-100kg")]
    #[case(100.0, "100-200kg")]
    #[case(2999.0, "2000-3000kg")]
    #[case(3000.0, ">3000kg")]
    #[case(1.0e9, ">3000kg")]
    fn test_weight_scale(#[case] weight: f64, #[case] label: &str) {
        assert_eq!(TrancheScale::weight().bin(weight).unwrap().label, label);
    }

    #[rstest]
    #[case(-0.5)]
    #[case(f64::NAN)]
    #[case(f64::NEG_INFINITY)]
    fn test_unmatched_weights(#[case] weight: f64) {
        assert!(TrancheScale::weight().bin(weight).is_none());
    }

    #[test]
    fn test_weight_scale_shape() {
        let scale = TrancheScale::weight();
        assert_eq!(scale.len(), 19);
        assert_eq!(scale.tranches[12].min, 300.0);
        assert_eq!(scale.tranches[12].max, Some(500.0));
        assert_eq!(scale.tranches[18].max, None);
        assert_eq!(scale, TrancheScale::from_labels(&WEIGHT_LABELS).unwrap());
    }

    #[test]
    fn test_pallet_scale() {
        let scale = TrancheScale::pallets();
        assert_eq!(scale.bin(1.0).unwrap().label, "1 P");
        assert_eq!(scale.bin(2.5).unwrap().label, "2 P");
        assert_eq!(scale.bin(6.99).unwrap().label, "6 P");
        assert_eq!(scale.bin(7.0).unwrap().label, "P sup");
        assert_eq!(scale.bin(40.0).unwrap().label, "P sup");
        assert!(scale.bin(0.5).is_none());
        assert_eq!(scale, TrancheScale::from_labels(&PALLET_LABELS).unwrap());
    }

    #[test]
    fn test_bin_text_decimal_comma() {
        let scale = TrancheScale::weight();
        assert_eq!(scale.bin_text("99,5").unwrap().label, "90-100kg");
        assert_eq!(scale.bin_text("100.0").unwrap().label, "100-200kg");
        assert!(matches!(
            scale.bin_text("lourd"),
            Err(Error::InputValidation(_))
        ));
        assert!(matches!(scale.bin_text("-3"), Err(Error::Lookup(_))));
    }

    #[test]
    fn test_rejects_gaps_and_overlaps() {
        let gap = TrancheScale::from_labels(&["0-10kg", "20-30kg", ">30kg"]);
        assert!(gap.is_err());
        let overlap = TrancheScale::from_labels(&["0-10kg", "5-20kg", ">20kg"]);
        assert!(overlap.is_err());
        let bounded = TrancheScale::from_labels(&["0-10kg", "10-20kg"]);
        assert!(bounded.is_err());
        let offset = TrancheScale::from_labels(&["5-10kg", ">10kg"]).unwrap();
        assert!(!offset.partitions_from_zero());
        assert!(TrancheScale::weight().partitions_from_zero());
    }

    #[test]
    fn test_rejects_unknown_label() {
        let err = TrancheScale::from_labels(&["light", "heavy"]).unwrap_err();
        assert!(err.to_string().contains("light"));
    }

    #[test]
    fn test_get_by_label() {
        let scale = TrancheScale::weight();
        assert_eq!(scale.get("40-50kg").unwrap().min, 40.0);
        assert!(matches!(scale.get("40-55kg"), Err(Error::Lookup(_))));
    }
}
