use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::rules::Rule;

pub const CONFIG_FILE_NAME: &str = ".dryreport.toml";

/// dryreport configuration (loaded from .dryreport.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DryConfig {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub load: LoadConfig,

    /// Rule metadata shown next to findings
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format
    #[serde(default = "default_format")]
    pub format: String,

    /// Minimum severity to show
    #[serde(default)]
    pub min_severity: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: default_format(),
            min_severity: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Exit with an error when any duplication record had to be skipped
    #[serde(default)]
    pub fail_on_rejected: bool,
}

fn default_format() -> String {
    "terminal".to_string()
}

impl DryConfig {
    /// Try to load .dryreport.toml from the given directory or its parents
    pub fn load(start: &Path) -> Option<Self> {
        let config_path = find_config_file(start)?;
        debug!("Found config: {}", config_path.display());
        Self::load_file(&config_path)
    }

    /// Load a specific config file. Unreadable or invalid files yield `None`.
    pub fn load_file(config_path: &Path) -> Option<Self> {
        match std::fs::read_to_string(config_path) {
            Ok(content) => match toml::from_str::<DryConfig>(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", config_path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("Could not read {}: {}", config_path.display(), e);
                None
            }
        }
    }
}

/// Walk up from `start` to find .dryreport.toml
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let config = current.join(CONFIG_FILE_NAME);
        if config.exists() {
            return Some(config);
        }
        if !current.pop() {
            return None;
        }
    }
}

const DEFAULT_CONFIG: &str = r#"# dryreport configuration

[output]
# Default output format: "terminal" or "json"
format = "terminal"

# Minimum severity to show: "LOW", "NORMAL", "HIGH", "ERROR"
# min_severity = "LOW"

[load]
# Exit with code 1 when a duplication record in a report cannot be read
fail_on_rejected = false

# Describe the checks that produce your findings
# [[rules]]
# category = "Duplication"
# check_id = "CPD"
# name = "Duplicated code"
# url = "https://pmd.github.io/latest/pmd_userdocs_cpd.html"
# description = "The same code fragment appears in several places"
"#;

/// Create a default .dryreport.toml in `dir`
pub fn init_config(dir: &Path) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        println!("⚠️  {} already exists in this directory", CONFIG_FILE_NAME);
        return Ok(());
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    println!("✅ Created {}", CONFIG_FILE_NAME);
    println!("   Edit it to customize how reports are shown.");

    Ok(())
}
