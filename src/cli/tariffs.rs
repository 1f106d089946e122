//! Tariff commands: tariffs, global

use super::util::*;
use zonetarif::export::{agency_report, global_report, tariff_report};
use zonetarif::tariff::{BaseTariffs, Distribution, ZoneShares};
use zonetarif::*;

pub fn cmd_tariffs(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let format = parse_format_arg(args)?;
    let output = parse_output_arg(args);
    let kind = parse_flag::<ScaleKind>(args, "--scale")?.unwrap_or_default();
    let policy = parse_flag::<PricingPolicy>(args, "--policy")?.unwrap_or_default();

    let scale_config = config.scale(kind);
    let scale = scale_config.scale()?;
    let base_tariffs = base_tariffs_arg(args, scale_config)?;
    let distribution = distribution_arg(args, kind, &scale, scale_config)?;

    let mut options = config.solve_options();
    if has_flag(args, "--strict") {
        options.strict = true;
    }

    let table = match policy {
        PricingPolicy::FixedGap => {
            let mut params = scale_config.gap_params(&config.fixed_gap);
            if let Some(gap) = parse_flag::<f64>(args, "--gap")? {
                params.gap = gap;
            }
            if let Some(c) = parse_flag::<f64>(args, "--coef2")? {
                params.coef_zone2 = c;
            }
            if let Some(c) = parse_flag::<f64>(args, "--coef3")? {
                params.coef_zone3 = c;
            }
            fixed_gap(&scale, &base_tariffs, &distribution, &params, &options)?
        }
        PricingPolicy::Direct => direct(
            &scale,
            &base_tariffs,
            &config.direct,
            Some(&distribution),
            &options,
        )?,
        PricingPolicy::GlobalWeighted => {
            return Err(Error::InputValidation(
                "global-weighted prices the whole network at once, use `zonetarif global`"
                    .to_string(),
            ))
        }
    };

    let content = match format {
        OutputFormat::Text => tariff_report(&table),
        OutputFormat::Csv => csv_export(args, &config)?.tariff_table(&table)?,
        OutputFormat::Json => to_json(&table)?,
    };
    write_output(&output, &content)
}

fn base_tariffs_arg(args: &[String], scale_config: &ScaleConfig) -> Result<BaseTariffs> {
    match flag_value(args, &["--base"]) {
        Some(path) => {
            let (tariffs, issues) = source(path, args)?.base_tariffs()?;
            report_skipped(path, issues);
            Ok(tariffs)
        }
        None => Ok(scale_config.base_tariffs.clone()),
    }
}

/// --distribution file, shares measured from --shipments, or the configured table
fn distribution_arg(
    args: &[String],
    kind: ScaleKind,
    scale: &TrancheScale,
    scale_config: &ScaleConfig,
) -> Result<Distribution> {
    if let Some(path) = flag_value(args, &["--distribution"]) {
        let (distribution, issues) = source(path, args)?.distribution()?;
        report_skipped(path, issues);
        return Ok(distribution);
    }
    if let Some(path) = flag_value(args, &["--shipments"]) {
        let shipments = report_skipped(path, source(path, args)?.shipments()?);
        let axis = match kind {
            ScaleKind::Weight => Axis::Weight,
            ScaleKind::Pallets => Axis::Um,
        };
        return Ok(CrossTab::build(&shipments, scale, axis).zone_shares());
    }
    Ok(scale_config.distribution.clone())
}

pub fn cmd_global(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let format = parse_format_arg(args)?;
    let output = parse_output_arg(args);
    let target = parse_flag::<f64>(args, "--target")?.unwrap_or(config.target_tariff);

    let agencies = match positional(args) {
        Some(path) => report_skipped(path, source(path, args)?.agency_shares()?),
        None => Vec::new(),
    };

    if has_flag(args, "--by-agency") {
        if agencies.is_empty() {
            return Err("Usage: zonetarif global <repartition.csv> --by-agency".into());
        }
        let batch = per_agency_weighted(
            &agencies,
            &config.agency_coefficients,
            &config.agency_default,
            target,
        )?;
        let tariffs = report_skipped("agencies", batch);
        let content = match format {
            OutputFormat::Text => agency_report(&tariffs),
            OutputFormat::Csv => csv_export(args, &config)?.agency_tariffs(&tariffs)?,
            OutputFormat::Json => to_json(&tariffs)?,
        };
        return write_output(&output, &content);
    }

    let shares = match flag_value(args, &["--shares"]) {
        Some(raw) => parse_shares(raw)?,
        None if !agencies.is_empty() => aggregate_network_shares(&agencies)?,
        None => {
            return Err(
                "Usage: zonetarif global <repartition.csv> | --shares <z1,z2,z3> [--target <eur>]"
                    .into(),
            )
        }
    };
    let tariff = global_weighted(&shares, &config.weighted, target)?;

    let content = match format {
        OutputFormat::Text => format!(
            "Network shares: {} / {} / {}\n\n{}",
            shares.zone1,
            shares.zone2,
            shares.zone3,
            global_report(&tariff, &config.weighted, target)
        ),
        OutputFormat::Csv => csv_export(args, &config)?.global_tariff(&tariff, &config.weighted)?,
        OutputFormat::Json => to_json(&serde_json::json!({
            "shares": shares,
            "coefficients": config.weighted,
            "target": target,
            "tariff": tariff,
        }))?,
    };
    write_output(&output, &content)
}

/// `50,35,15` or `50/35/15`
fn parse_shares(raw: &str) -> Result<ZoneShares> {
    let values: Vec<f64> = raw
        .split([',', '/'])
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| Error::InputValidation(format!("share '{}' is not a number", v.trim())))
        })
        .collect::<Result<_>>()?;
    match values.as_slice() {
        [z1, z2, z3] => Ok(PerZone::new(*z1, *z2, *z3)),
        _ => Err(Error::InputValidation(format!(
            "--shares needs three values, got {}",
            values.len()
        ))),
    }
}
