//! Tranches command

use super::util::*;
use zonetarif::export::cross_tab_report;
use zonetarif::*;

const USAGE: &str = "zonetarif tranches <shipments.csv> [--scale weight|pallets] [--stats]";

pub fn cmd_tranches(args: &[String]) -> Result<()> {
    let path = require_positional(args, USAGE)?;
    let config = load_config(args)?;
    let format = parse_format_arg(args)?;
    let output = parse_output_arg(args);
    let kind = parse_flag::<ScaleKind>(args, "--scale")?.unwrap_or_default();
    let axis = match kind {
        ScaleKind::Weight => Axis::Weight,
        ScaleKind::Pallets => Axis::Um,
    };

    let shipments = report_skipped(path, source(path, args)?.shipments()?);
    let scale = config.scale(kind).scale()?;
    let tab = CrossTab::build(&shipments, &scale, axis);

    if has_flag(args, "--stats") {
        let zones = zone_stats(&shipments);
        let agencies = agency_stats(&shipments);
        let content = match format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "zones": zones,
                "agencies": agencies,
            }))?,
            OutputFormat::Csv => {
                let export = csv_export(args, &config)?;
                format!(
                    "{}\n{}",
                    export.group_stats("Zone", &zones)?,
                    export.group_stats("Code agence", &agencies)?
                )
            }
            OutputFormat::Text => {
                let mut out = String::new();
                for (title, stats) in [("Zone", &zones), ("Agency", &agencies)] {
                    let mut t = TextTable::new([title, "Shipments", "Weight", "Mean", "UM", "Mean UM"]);
                    for s in stats {
                        let opt = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into());
                        t.row(vec![
                            s.key.clone(),
                            s.shipments.to_string(),
                            opt(s.total_weight),
                            opt(s.mean_weight),
                            opt(s.total_um),
                            opt(s.mean_um),
                        ]);
                    }
                    out.push_str(&t.render());
                    out.push('\n');
                }
                out
            }
        };
        return write_output(&output, &content);
    }

    let content = match format {
        OutputFormat::Text => cross_tab_report(&tab),
        OutputFormat::Csv => csv_export(args, &config)?.cross_tab(&tab)?,
        OutputFormat::Json => to_json(&serde_json::json!({
            "scale": kind.to_string(),
            "zone_shares": tab.zone_shares(),
            "counts": tab.tranches.iter().zip(&tab.counts).collect::<Vec<_>>(),
            "unmatched": tab.unmatched,
        }))?,
    };
    write_output(&output, &content)
}
