//! Zones command

use super::util::*;
use zonetarif::export::zone_report;
use zonetarif::*;

const USAGE: &str = "zonetarif zones <localities.csv> [--agencies <file>] [--summary]";

pub fn cmd_zones(args: &[String]) -> Result<()> {
    let path = require_positional(args, USAGE)?;
    let config = load_config(args)?;
    let format = parse_format_arg(args)?;
    let output = parse_output_arg(args);

    let agencies = load_agencies_arg(args)?;
    let rows = report_skipped(path, source(path, args)?.localities()?);

    // Recompute wherever the agency position is known, keep given distances elsewhere
    let (known, unknown): (Vec<Locality>, Vec<Locality>) = rows.into_iter().partition(|l| {
        l.agency_position.is_some() || agencies.iter().any(|a| a.code == l.agency_code)
    });
    let mut localities = report_skipped(
        "zones",
        config.thresholds.assign_zones(&known, &agencies),
    );
    localities.extend(locate_missing(unknown, &agencies, &config.thresholds));

    if has_flag(args, "--summary") {
        let mut summaries = zone_summary(&localities);
        summaries.push(network_summary(&localities, "ALL"));
        let content = match format {
            OutputFormat::Text => zone_report(&summaries),
            OutputFormat::Csv => csv_export(args, &config)?.zone_summaries(&summaries)?,
            OutputFormat::Json => to_json(&summaries)?,
        };
        return write_output(&output, &content);
    }

    let content = match format {
        OutputFormat::Text => {
            let mut t = TextTable::new(["Commune", "Agency", "km", "Zone"]);
            for l in &localities {
                t.row(vec![
                    l.commune.clone(),
                    l.agency_code.clone(),
                    l.distance_km.map(|d| format!("{:.2}", d)).unwrap_or_default(),
                    l.zone.map(|z| z.to_string()).unwrap_or_default(),
                ]);
            }
            t.render()
        }
        OutputFormat::Csv => csv_export(args, &config)?.localities(&localities)?,
        OutputFormat::Json => to_json(&localities)?,
    };
    write_output(&output, &content)
}
