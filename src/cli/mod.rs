pub mod commands;

use clap::Parser;

pub use commands::{Commands, ListRulesArgs, MigrateArgs, ShowArgs};

/// dryreport — Duplicate-code report viewer
///
/// Loads analysis reports (including ones written by older releases),
/// shows findings together with the duplication groups they belong to,
/// and rewrites old reports in the current format.
#[derive(Parser, Debug)]
#[command(
    name = "dryreport",
    version,
    about = "📋 dryreport — Duplicate-code report viewer",
    long_about = "dryreport loads static-analysis reports and shows which findings\nare occurrences of the same duplicated code fragment.\n\nReports written by older releases are upgraded on load."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
