use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::report::GroupRef;

/// Severity level of a finding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    #[default]
    Normal,
    High,
    Error,
}

impl Severity {
    /// Parse a severity name, case-insensitively. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ERROR" => Some(Severity::Error),
            "HIGH" => Some(Severity::High),
            "NORMAL" => Some(Severity::Normal),
            "LOW" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::High => "HIGH",
            Severity::Normal => "NORMAL",
            Severity::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value of the side-channel slot a finding carries.
///
/// The slot is general purpose, but only the variants listed here can be
/// stored in it, so readers match instead of downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FindingProperty {
    /// The finding is one occurrence of the duplication group behind this handle.
    Duplication(GroupRef),
}

impl FindingProperty {
    pub fn duplication_group(&self) -> Option<GroupRef> {
        match self {
            FindingProperty::Duplication(group) => Some(*group),
        }
    }
}

/// A single static-analysis finding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Deterministic ID (hash-based) e.g. "DRY-a1b2c3d4"
    pub id: String,

    /// Check that produced this finding, e.g. "CPD" or "CA1822"
    pub rule_id: String,

    /// Rule category, used together with `rule_id` to look up rule metadata
    #[serde(default)]
    pub category: String,

    pub severity: Severity,

    /// Short title
    #[serde(default)]
    pub title: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// File where the finding was reported
    pub file_path: PathBuf,

    /// Starting line number (1-based)
    pub line_start: usize,

    /// Ending line number (1-based)
    pub line_end: usize,

    /// Evidence snippet (code)
    #[serde(default)]
    pub evidence: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_properties: Option<FindingProperty>,
}

impl Finding {
    /// Create a finding for a single line with its deterministic ID filled in.
    pub fn new(rule_id: impl Into<String>, file_path: impl Into<PathBuf>, line_start: usize) -> Self {
        let rule_id = rule_id.into();
        let file_path = file_path.into();
        Finding {
            id: Self::generate_id(&rule_id, &file_path, line_start),
            rule_id,
            file_path,
            line_start,
            line_end: line_start,
            ..Default::default()
        }
    }

    /// Generate a deterministic ID based on rule, file, and location
    pub fn generate_id(rule_id: &str, file_path: &Path, line_start: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(rule_id.as_bytes());
        hasher.update(file_path.to_string_lossy().as_bytes());
        hasher.update(line_start.to_string().as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        format!("DRY-{}", &hex[..8])
    }

    pub fn additional_properties(&self) -> Option<&FindingProperty> {
        self.additional_properties.as_ref()
    }

    /// Store a value in the side-channel slot, replacing whatever was there.
    pub fn set_additional_properties(&mut self, property: FindingProperty) {
        self.additional_properties = Some(property);
    }

    pub fn clear_additional_properties(&mut self) {
        self.additional_properties = None;
    }

    /// Handle of the duplication group this finding belongs to, if any.
    pub fn duplication_group(&self) -> Option<GroupRef> {
        self.additional_properties
            .as_ref()
            .and_then(FindingProperty::duplication_group)
    }

    /// `path:line` or `path:start-end` for display
    pub fn location(&self) -> String {
        if self.line_end > self.line_start {
            format!("{}:{}-{}", self.file_path.display(), self.line_start, self.line_end)
        } else {
            format!("{}:{}", self.file_path.display(), self.line_start)
        }
    }
}
