//! CLI utility helpers

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zonetarif::{
    Agency, Batch, CsvExport, CsvSource, Error, Locality, Result, TariffConfig, ZoneThresholds,
};

/// Configuration picked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "zonetarif.yaml";

/// Parse --output argument to determine output file path
pub fn parse_output_arg(args: &[String]) -> Option<PathBuf> {
    flag_value(args, &["--output", "-o"]).map(PathBuf::from)
}

/// Write content to file or stdout
pub fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).map_err(Error::Io)?;
            eprintln!("Written to: {}", p.display());
        }
        None => {
            println!("{}", content.trim_end());
        }
    }
    Ok(())
}

/// Value following the first of `names`
pub fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Parse the value of `name`, if present
pub fn parse_flag<T>(args: &[String], name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match flag_value(args, &[name]) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::InputValidation(format!("{} '{}': {}", name, raw, e))),
        None => Ok(None),
    }
}

/// First argument when it is not an option
pub fn positional(args: &[String]) -> Option<&str> {
    args.first()
        .map(String::as_str)
        .filter(|a| !a.starts_with('-'))
}

pub fn require_positional<'a>(args: &'a [String], usage: &str) -> Result<&'a str> {
    positional(args).ok_or_else(|| Error::Other(format!("Usage: {}", usage)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::InputValidation(format!(
                "unknown format '{}' (expected text, csv or json)",
                other
            ))),
        }
    }
}

/// --format, --json, or csv when writing to a file
pub fn parse_format_arg(args: &[String]) -> Result<OutputFormat> {
    if has_flag(args, "--json") {
        return Ok(OutputFormat::Json);
    }
    match parse_flag::<OutputFormat>(args, "--format")? {
        Some(format) => Ok(format),
        None if parse_output_arg(args).is_some() => Ok(OutputFormat::Csv),
        None => Ok(OutputFormat::Text),
    }
}

pub fn parse_delimiter_arg(args: &[String]) -> Result<u8> {
    match flag_value(args, &["--delimiter", "-d"]) {
        None => Ok(b';'),
        Some("\\t" | "tab") => Ok(b'\t'),
        Some(raw) if raw.len() == 1 => Ok(raw.as_bytes()[0]),
        Some(raw) => Err(Error::InputValidation(format!(
            "delimiter must be a single ASCII character, got '{}'",
            raw
        ))),
    }
}

/// Load --config, else ./zonetarif.yaml when present, else the defaults;
/// the result is validated
pub fn load_config(args: &[String]) -> Result<TariffConfig> {
    let explicit = flag_value(args, &["--config", "-c"]).map(PathBuf::from);
    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    let path = explicit.or_else(|| fallback.exists().then(|| fallback.to_path_buf()));
    let config = TariffConfig::load_or_default(path.as_deref())?;
    config.ensure_valid()?;
    Ok(config)
}

/// CSV writer stamped with the configuration fingerprint
pub fn csv_export(args: &[String], config: &TariffConfig) -> Result<CsvExport> {
    Ok(CsvExport::default()
        .with_delimiter(parse_delimiter_arg(args)?)
        .with_fingerprint(config.fingerprint()?))
}

pub fn source(path: &str, args: &[String]) -> Result<CsvSource> {
    Ok(CsvSource::new(path).with_delimiter(parse_delimiter_arg(args)?))
}

/// Agencies from --agencies, empty when not given
pub fn load_agencies_arg(args: &[String]) -> Result<Vec<Agency>> {
    match flag_value(args, &["--agencies"]) {
        Some(path) => Ok(report_skipped(path, source(path, args)?.agencies()?)),
        None => Ok(Vec::new()),
    }
}

/// Print skipped rows to stderr and keep the records
pub fn report_skipped<T>(what: &str, batch: Batch<T>) -> Vec<T> {
    if !batch.is_clean() {
        eprintln!("⚠ {}: {} row(s) skipped", what, batch.skipped.len());
        for issue in &batch.skipped {
            eprintln!("  {}", issue);
        }
    }
    batch.records
}

/// Fill distance and zone of rows that lack them
///
/// Rows that already carry a distance keep it; their zone is derived when
/// missing.
pub fn locate_missing(
    localities: Vec<Locality>,
    agencies: &[Agency],
    thresholds: &ZoneThresholds,
) -> Vec<Locality> {
    let (mut located, pending): (Vec<Locality>, Vec<Locality>) =
        localities.into_iter().partition(|l| l.distance_km.is_some());
    for locality in &mut located {
        if locality.zone.is_none() {
            locality.zone = locality
                .distance_km
                .and_then(|d| thresholds.classify(d).ok());
        }
    }
    if !pending.is_empty() {
        let batch = thresholds.assign_zones(&pending, agencies);
        located.extend(report_skipped("localities", batch));
    }
    located
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flag_parsing() {
        let a = args(&["file.csv", "--k", "4", "--json"]);
        assert_eq!(positional(&a), Some("file.csv"));
        assert_eq!(parse_flag::<usize>(&a, "--k").unwrap(), Some(4));
        assert!(has_flag(&a, "--json"));
        assert_eq!(parse_format_arg(&a).unwrap(), OutputFormat::Json);
        assert!(parse_flag::<usize>(&args(&["--k", "four"]), "--k").is_err());
    }

    #[test]
    fn test_format_defaults_to_csv_with_output() {
        assert_eq!(
            parse_format_arg(&args(&["-o", "out.csv"])).unwrap(),
            OutputFormat::Csv
        );
        assert_eq!(parse_format_arg(&args(&[])).unwrap(), OutputFormat::Text);
    }

    #[test]
    fn test_delimiter() {
        assert_eq!(parse_delimiter_arg(&args(&[])).unwrap(), b';');
        assert_eq!(parse_delimiter_arg(&args(&["--delimiter", ","])).unwrap(), b',');
        assert_eq!(parse_delimiter_arg(&args(&["-d", "tab"])).unwrap(), b'\t');
        assert!(parse_delimiter_arg(&args(&["-d", ";;"])).is_err());
    }
}
