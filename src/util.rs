//! Shared utility functions
//!
//! Numeric helpers used by the loaders and every pricing policy.

use sha2::{Digest, Sha256};

/// Round to 2 decimals, ties to even on the exact binary value.
///
/// Matches the rounding the reference tariff tables were produced with, so
/// progressive rounding reproduces the published prices to the cent.
///
/// # Examples
/// ```
/// use zonetarif::util::round2;
/// assert_eq!(round2(10.160729), 10.16);
/// assert_eq!(round2(11.300729), 11.3);
/// assert_eq!(round2(-0.004), 0.0);
/// ```
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round to `decimals` places using the formatter's exact decimal expansion
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let rounded: f64 = format!("{:.*}", decimals, value)
        .parse()
        .unwrap_or(value);
    // "-0.00" parses to negative zero
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Parse a number written with either `,` or `.` as decimal separator
///
/// # Examples
/// ```
/// use zonetarif::util::parse_decimal;
/// assert_eq!(parse_decimal("8,30"), Some(8.3));
/// assert_eq!(parse_decimal(" 12.5 "), Some(12.5));
/// assert_eq!(parse_decimal("n/a"), None);
/// ```
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(['\u{a0}', ' '], "").replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decode file bytes as UTF-8, falling back to Latin-1
///
/// A leading byte-order mark is dropped. Latin-1 maps every byte to the
/// code point of the same value, so the fallback never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Short content fingerprint: `sha256:` followed by 16 hex chars
pub fn fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{}", hex::encode(&hasher.finalize()[..8]))
}

/// Approximate equality used by invariant checks
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance + f64::EPSILON * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_progressive_values() {
        assert_eq!(round2(10.160729), 10.16);
        assert_eq!(round2(10.730729), 10.73);
        assert_eq!(round2(10.519271), 10.52);
        assert_eq!(round2(2.675), 2.67); // 2.675 is stored as 2.67499999...
    }

    #[test]
    fn test_round_to_negative_zero() {
        assert_eq!(round_to(-0.0001, 2).to_bits(), 0.0f64.to_bits());
        assert_eq!(round_to(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal("3,5"), Some(3.5));
        assert_eq!(parse_decimal("1 200,75"), Some(1200.75));
        assert_eq!(parse_decimal("-2"), Some(-2.0));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "Évreux" in Latin-1
        let bytes = [0xC9, b'v', b'r', b'e', b'u', b'x'];
        assert_eq!(decode_text(&bytes), "Évreux");
        assert_eq!(decode_text("Évreux".as_bytes()), "Évreux");
        assert_eq!(decode_text(b"\xEF\xBB\xBFCommune"), "Commune");
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = fingerprint(b"zones");
        assert!(fp.starts_with("sha256:"));
        assert_eq!(fp.len(), "sha256:".len() + 16);
        assert_eq!(fp, fingerprint(b"zones"));
    }
}
