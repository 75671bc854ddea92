mod cli;

use std::path::Path;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ListRulesArgs, MigrateArgs, ShowArgs};
use dryreport::config::{self, DryConfig};
use dryreport::report::finding::Severity;
use dryreport::report::{json, loader, terminal};
use dryreport::rules::{self, RuleSet};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("dryreport=debug")
    } else if cli.quiet {
        EnvFilter::new("dryreport=error")
    } else {
        EnvFilter::new("dryreport=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    info!("dryreport v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Show(args) => show(args),
        Commands::Migrate(args) => migrate(args),
        Commands::Init => config::init_config(&std::env::current_dir()?),
        Commands::ListRules(args) => list_rules(args),
    }
}

fn show(args: &ShowArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.report.parent().unwrap_or(Path::new(".")));
    let loaded = loader::load_report_file(&args.report)?;
    let report = &loaded.report;

    let min_severity = match (args.min_severity, config.output.min_severity.as_deref()) {
        (Some(severity), _) => severity,
        (None, Some(name)) => match Severity::parse(name) {
            Some(severity) => severity,
            None => bail!("invalid min_severity '{}' in config", name),
        },
        (None, None) => Severity::Low,
    };

    let format = args.format.as_deref().unwrap_or(config.output.format.as_str());
    match format {
        "json" => println!("{}", json::render(report)?),
        _ => terminal::render(report, &RuleSet::from_config(&config.rules), min_severity),
    }

    for record in &loaded.rejected {
        warn!("Not shown: {}", record);
    }

    // Exit code based on findings
    if let Some(threshold) = args.fail_on {
        if report.has_findings_at_or_above(threshold) {
            std::process::exit(1);
        }
    }
    if config.load.fail_on_rejected && !loaded.is_complete() {
        std::process::exit(1);
    }

    Ok(())
}

fn migrate(args: &MigrateArgs) -> Result<()> {
    let loaded = loader::load_report_file(&args.report)?;

    if !loaded.is_complete() {
        for record in &loaded.rejected {
            warn!("{}", record);
        }
        if !args.allow_partial {
            bail!(
                "{} duplication records could not be read; rerun with --allow-partial to drop them",
                loaded.rejected.len()
            );
        }
    }

    let output = json::render(&loaded.report)?;
    if let Some(ref path) = args.out {
        std::fs::write(path, &output)?;
        info!("Upgraded report written to {}", path.display());
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn list_rules(args: &ListRulesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), &std::env::current_dir()?);
    rules::list_rules(&RuleSet::from_config(&config.rules));
    Ok(())
}

fn load_config(explicit: Option<&Path>, search_from: &Path) -> DryConfig {
    let config = match explicit {
        Some(path) => DryConfig::load_file(path),
        None => DryConfig::load(search_from),
    };
    config.unwrap_or_default()
}
