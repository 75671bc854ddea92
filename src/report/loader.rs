//! Loading persisted reports, including ones written by older releases.
//!
//! The report envelope (findings, metadata) must parse or the whole load
//! fails. Duplication group records are decoded one by one: a record that
//! cannot be read is rejected on its own and the rest of the report still
//! loads.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::report::duplication::DuplicationGroup;
use crate::report::finding::Finding;
use crate::report::legacy::BridgeError;
use crate::report::{FindingRef, ScanReport};

/// Report envelope as written by any release. Reports from before
/// duplication groups existed have no `duplications` key.
#[derive(Debug, Deserialize)]
struct PersistedReport {
    #[serde(default)]
    version: String,
    #[serde(default)]
    timestamp: String,
    findings: Vec<Finding>,
    #[serde(default)]
    duplications: Vec<Value>,
}

/// Errors that make a whole report unreadable.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report is not readable: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a single group record was left out.
#[derive(thiserror::Error, Debug)]
pub enum RejectReason {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("member {finding} does not exist, the report has {available} findings")]
    DanglingReference { finding: FindingRef, available: usize },
}

#[derive(Debug)]
pub struct RejectedRecord {
    /// Position of the record in the persisted `duplications` array
    pub index: usize,
    pub reason: RejectReason,
}

impl std::fmt::Display for RejectedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplication record {}: {}", self.index, self.reason)
    }
}

#[derive(Debug)]
pub struct LoadedReport {
    pub report: ScanReport,
    pub rejected: Vec<RejectedRecord>,
}

impl LoadedReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Load a report from raw bytes.
pub fn load_report(bytes: &[u8]) -> Result<LoadedReport, LoadError> {
    let persisted: PersistedReport = serde_json::from_slice(bytes)?;
    let available = persisted.findings.len();
    debug!(
        "Report envelope has {} findings and {} group records",
        available,
        persisted.duplications.len()
    );

    let decoded: Vec<_> = persisted
        .duplications
        .into_par_iter()
        .map(|record| decode_record(record, available))
        .collect();

    let mut groups = Vec::with_capacity(decoded.len());
    let mut rejected = Vec::new();
    for (index, result) in decoded.into_iter().enumerate() {
        match result {
            Ok(group) => groups.push(group),
            Err(reason) => {
                let record = RejectedRecord { index, reason };
                warn!("Skipping {}", record);
                rejected.push(record);
            }
        }
    }

    let report = ScanReport::from_parts(persisted.version, persisted.timestamp, persisted.findings, groups);
    info!(
        "Loaded {} findings and {} duplication groups ({} rejected)",
        report.summary.total,
        report.summary.duplication_groups,
        rejected.len()
    );

    Ok(LoadedReport { report, rejected })
}

/// Load a report from a file.
pub fn load_report_file(path: &Path) -> Result<LoadedReport, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_report(&bytes)
}

fn decode_record(record: Value, available: usize) -> Result<DuplicationGroup, RejectReason> {
    let group = DuplicationGroup::try_from(record)?;
    if let Some(finding) = group.duplications().iter().find(|f| f.index() >= available) {
        return Err(RejectReason::DanglingReference {
            finding: *finding,
            available,
        });
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::GroupRef;
    use serde_json::json;

    fn finding_json(file: &str, line: usize) -> Value {
        serde_json::to_value(Finding::new("CPD", file, line)).unwrap()
    }

    #[test]
    fn bad_records_do_not_abort_the_report() {
        let bytes = serde_json::to_vec(&json!({
            "version": "0.1.0",
            "timestamp": "2024-01-01T00:00:00+00:00",
            "findings": [finding_json("a.rs", 1), finding_json("b.rs", 1), finding_json("c.rs", 1)],
            "duplications": [
                { "codeFragment": "first", "duplications": [0, 1] },
                { "codeFragment": "broken" },
                { "schema_version": 3, "code_fragment": "dangling", "duplications": [2, 9] },
                { "schema_version": 2, "fragment": "last", "members": [2] },
            ],
        }))
        .unwrap();

        let loaded = load_report(&bytes).unwrap();
        assert!(!loaded.is_complete());
        let rejected: Vec<_> = loaded.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![1, 2]);
        assert!(matches!(
            loaded.rejected[1].reason,
            RejectReason::DanglingReference { available: 3, .. }
        ));

        let report = loaded.report;
        let fragments: Vec<_> = report.duplications().iter().map(|g| g.code_fragment()).collect();
        assert_eq!(fragments, vec!["first", "last"]);
        assert_eq!(report.group_of(FindingRef::new(2)), Some(GroupRef::new(1)));
        assert!(report.same_cluster(FindingRef::new(0), FindingRef::new(1)));
    }

    #[test]
    fn stale_slots_are_rebuilt_from_groups() {
        let mut stale = Finding::new("CPD", "a.rs", 1);
        stale.set_additional_properties(crate::report::finding::FindingProperty::Duplication(GroupRef::new(7)));
        let bytes = serde_json::to_vec(&json!({
            "findings": [serde_json::to_value(&stale).unwrap()],
        }))
        .unwrap();

        let loaded = load_report(&bytes).unwrap();
        assert!(loaded.is_complete());
        assert_eq!(loaded.report.group_of(FindingRef::new(0)), None);
        assert_eq!(loaded.report.summary.duplicated_findings, 0);
    }

    #[test]
    fn broken_envelopes_fail_the_load() {
        assert!(matches!(load_report(b"{\"findings\": ["), Err(LoadError::Json(_))));
        assert!(matches!(load_report(b"{}"), Err(LoadError::Json(_))));
    }

    #[test]
    fn missing_files_report_their_path() {
        let err = load_report_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
