//! zonetarif CLI - Command-line interface
//!
//! Commands:
//!   zones    - Compute distance and zone of localities
//!   tranches - Shipment distribution per tranche and zone
//!   tariffs  - Per-zone tariff table (fixed gap or direct)
//!   global   - Global or per-agency weighted allocation
//!   cluster  - Commune clustering and new agency candidates
//!   reassign - Closer agency for far localities
//!   config   - Check, print schema or write a configuration

mod cli;

use cli::*;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zonetarif::VERSION;

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "zones" => cmd_zones(&args[2..]),
        "tranches" => cmd_tranches(&args[2..]),
        "tariffs" => cmd_tariffs(&args[2..]),
        "global" => cmd_global(&args[2..]),
        "cluster" => cmd_cluster(&args[2..]),
        "reassign" => cmd_reassign(&args[2..]),
        "config" => cmd_config(&args[2..]),
        "version" | "--version" | "-v" => {
            println!("zonetarif {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr so CSV and JSON on stdout stay clean
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ZONETARIF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_usage() {
    println!(
        r#"
zonetarif - Delivery zones and per-zone tariffs

USAGE:
    zonetarif <COMMAND> [OPTIONS]

COMMANDS:
    zones <localities.csv>            Distance and zone of each locality
          [--agencies <file>]         Agency coordinates (Code agence;Latitude;Longitude)
          [--summary]                 Per-agency zone summary instead of rows
    tranches <shipments.csv>          Zone shares per tranche
          [--scale weight|pallets]
          [--stats]                   Per-zone and per-agency volume statistics
    tariffs                           Per-zone tariff table
          [--scale weight|pallets]
          [--policy fixed-gap|direct]
          [--gap <a>] [--coef2 <c>] [--coef3 <c>]
          [--base <file>]             Base tariffs (Tranche;Forfait)
          [--distribution <file>]     Zone shares (Tranche;Zone 1;Zone 2;Zone 3)
          [--strict]                  Fail on flagged tranches
    global [repartition.csv]          Weighted allocation around a target tariff
          --target <eur>
          [--shares <z1,z2,z3>]       Network shares instead of a file
          [--by-agency]               One allocation per agency
    cluster <localities.csv>          K-means on distance and shipment count
          [--k <2-6>] [--agency <code>] [--agencies <file>]
    reassign <localities.csv>         Closer agency for far localities
          [--agencies <file>] [--far <km>]
    config check [file]               Validate a configuration file
    config schema [config|credentials] Print a JSON schema
    config init [file] [--force]      Write the default configuration
    version                           Print version

OPTIONS:
    --config <file>                   Configuration (default: ./zonetarif.yaml if present)
    --format <text|csv|json>          Output format (default: text, csv with --output)
    --json                            Same as --format json
    --output <file>                   Output file (default: stdout)
    --delimiter <char>                CSV delimiter for input and output (default: ;)

ENVIRONMENT:
    ZONETARIF_LOG, RUST_LOG           Log filter, e.g. info or zonetarif=debug (default: warn)

EXAMPLES:
    zonetarif zones communes.csv --summary
    zonetarif tranches expeditions.csv --scale pallets --json
    zonetarif tariffs --gap 0.4 --output tarifs.csv
    zonetarif global --shares 50,35,15 --target 10
    zonetarif cluster communes.csv --k 4 --agency NT14G
"#
    );
}
