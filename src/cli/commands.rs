use clap::Subcommand;
use std::path::PathBuf;

use dryreport::report::finding::Severity;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a report with its duplication groups
    Show(ShowArgs),

    /// Rewrite a report in the current format
    Migrate(MigrateArgs),

    /// Initialize a .dryreport.toml config file in the current directory
    Init,

    /// List the rules described in the config file
    ListRules(ListRulesArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Report file to load
    pub report: PathBuf,

    /// Output format: "terminal" or "json" (defaults to the config file's)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Fail (exit code 1) if findings at or above this severity are present.
    /// Values: ERROR, HIGH, NORMAL, LOW
    #[arg(long, value_parser = parse_severity)]
    pub fail_on: Option<Severity>,

    /// Only show findings at or above this severity
    #[arg(long, value_parser = parse_severity)]
    pub min_severity: Option<Severity>,

    /// Config file to use instead of searching next to the report
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    /// Report file to upgrade
    pub report: PathBuf,

    /// Write the upgraded report here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Write the report even if some duplication records could not be read
    /// (those records are dropped)
    #[arg(long)]
    pub allow_partial: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListRulesArgs {
    /// Config file to read (defaults to searching from the current directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn parse_severity(value: &str) -> Result<Severity, String> {
    Severity::parse(value).ok_or_else(|| {
        format!("unknown severity '{}' (expected ERROR, HIGH, NORMAL or LOW)", value)
    })
}
