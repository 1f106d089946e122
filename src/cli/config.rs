//! Config and schema CLI commands

use super::util::DEFAULT_CONFIG_FILE;
use std::path::Path;
use zonetarif::config_validate::{validate_file, Severity};
use zonetarif::*;

pub fn cmd_config(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err("Usage: zonetarif config <check|schema|init> [options]".into());
    }

    let file = args
        .get(1)
        .filter(|a| !a.starts_with('-'))
        .map(String::as_str);

    match args[0].as_str() {
        "check" => {
            let json_output = args.contains(&"--json".to_string());
            let path = Path::new(file.unwrap_or(DEFAULT_CONFIG_FILE));
            let result = validate_file(path);

            if json_output {
                let output = serde_json::json!({
                    "valid": !result.has_errors(),
                    "errors": result.error_count(),
                    "warnings": result.warning_count(),
                    "issues": result.issues,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if result.issues.is_empty() {
                println!("✓ Configuration is valid");
            } else {
                for issue in &result.issues {
                    let (prefix, level) = match issue.severity {
                        Severity::Error => ("✗", "ERROR"),
                        Severity::Warning => ("⚠", "WARN"),
                    };
                    println!("{} [{}] {}: {}", prefix, issue.code, level, issue.message);
                    println!("  File: {}", issue.file);
                }

                println!();
                if result.has_errors() {
                    println!(
                        "✗ {} error(s), {} warning(s)",
                        result.error_count(),
                        result.warning_count()
                    );
                } else {
                    println!("✓ {} warning(s) (no errors)", result.warning_count());
                }
            }

            if result.has_errors() {
                return Err("Configuration validation failed".into());
            }
            Ok(())
        }
        "schema" => match file.unwrap_or("config") {
            "config" | "tariffs" => print_schema::<TariffConfig>(),
            "credentials" | "users" => print_schema::<Credentials>(),
            "table" => print_schema::<TariffTable>(),
            name => Err(format!(
                "Unknown schema: {}. Use 'config', 'credentials' or 'table'.",
                name
            )
            .into()),
        },
        "init" => {
            let path = Path::new(file.unwrap_or(DEFAULT_CONFIG_FILE));
            if path.exists() && !args.contains(&"--force".to_string()) {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
            let header = format!(
                "# zonetarif {} configuration, generated {}\n",
                VERSION,
                chrono::Utc::now().format("%Y-%m-%d")
            );
            let yaml = TariffConfig::default().to_yaml()?;
            std::fs::write(path, format!("{}{}", header, yaml)).map_err(Error::Io)?;
            println!("✓ Wrote {}", path.display());
            Ok(())
        }
        cmd => Err(format!(
            "Unknown config subcommand: {}. Use 'check', 'schema' or 'init'.",
            cmd
        )
        .into()),
    }
}

fn print_schema<T: schemars::JsonSchema>() -> Result<()> {
    let schema = schemars::schema_for!(T);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
