//! Strategy commands: cluster, reassign

use super::util::*;
use zonetarif::export::{cluster_report, reassign_report};
use zonetarif::strategy::tag;
use zonetarif::*;

const DEFAULT_K: usize = 3;

pub fn cmd_cluster(args: &[String]) -> Result<()> {
    let path = require_positional(
        args,
        "zonetarif cluster <localities.csv> [--k <2-6>] [--agency <code>]",
    )?;
    let config = load_config(args)?;
    let format = parse_format_arg(args)?;
    let output = parse_output_arg(args);
    let k = parse_flag::<usize>(args, "--k")?.unwrap_or(DEFAULT_K);
    let agency = flag_value(args, &["--agency"]);

    let agencies = load_agencies_arg(args)?;
    let rows = report_skipped(path, source(path, args)?.localities()?);
    let localities = locate_missing(rows, &agencies, &config.thresholds);

    let profiles = commune_profiles(&localities, agency);
    let clustering = kmeans(&profiles, k)?;
    let suggestions = suggest_new_agencies(&profiles, &clustering, &config.strategy);

    let content = match format {
        OutputFormat::Text => {
            let mut out = cluster_report(&profiles, &clustering, &suggestions);
            let tagged: Vec<(&CommuneProfile, Anomaly)> = profiles
                .iter()
                .filter_map(|p| tag(p, &config.strategy).map(|a| (p, a)))
                .collect();
            if !tagged.is_empty() {
                out.push_str("\nAnomalies:\n");
                for (p, anomaly) in tagged {
                    out.push_str(&format!(
                        "  {} ({}): {} at {:.2} km, {} shipment(s)\n",
                        p.commune, p.agency_code, anomaly, p.distance_km, p.shipments
                    ));
                }
            }
            out
        }
        OutputFormat::Csv => {
            csv_export(args, &config)?.profiles(&profiles, &clustering, &config.strategy)?
        }
        OutputFormat::Json => {
            let communes: Vec<_> = profiles
                .iter()
                .zip(&clustering.assignments)
                .map(|(p, c)| {
                    serde_json::json!({
                        "profile": p,
                        "cluster": c,
                        "anomaly": tag(p, &config.strategy),
                    })
                })
                .collect();
            to_json(&serde_json::json!({
                "k": clustering.k(),
                "centroids": clustering.centroids,
                "inertia": clustering.inertia,
                "communes": communes,
                "new_agencies": suggestions,
            }))?
        }
    };
    write_output(&output, &content)
}

pub fn cmd_reassign(args: &[String]) -> Result<()> {
    let path = require_positional(
        args,
        "zonetarif reassign <localities.csv> [--agencies <file>] [--far <km>]",
    )?;
    let config = load_config(args)?;
    let format = parse_format_arg(args)?;
    let output = parse_output_arg(args);
    let far_km = parse_flag::<f64>(args, "--far")?.unwrap_or(config.strategy.far_km);

    let agencies = load_agencies_arg(args)?;
    let rows = report_skipped(path, source(path, args)?.localities()?);
    let localities = locate_missing(rows, &agencies, &config.thresholds);
    let suggestions = suggest_reassignments(&localities, &agencies, far_km);

    let content = match format {
        OutputFormat::Text => reassign_report(&suggestions),
        OutputFormat::Csv => csv_export(args, &config)?.reassignments(&suggestions)?,
        OutputFormat::Json => to_json(&suggestions)?,
    };
    write_output(&output, &content)
}
