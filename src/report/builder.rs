//! Turns raw findings plus the clustering decisions of a deduplication pass
//! into a wired [`ScanReport`].
//!
//! The builder never decides what is a duplicate. It is told which findings
//! share a fragment and only records that.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::report::duplication::DuplicationGroup;
use crate::report::finding::Finding;
use crate::report::{merger, FindingRef, GroupRef, ScanReport};

/// One cluster as reported by the deduplication pass.
#[derive(Debug, Clone)]
struct Cluster {
    fragment: String,
    finding_ids: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ReportBuilder {
    findings: Vec<Finding>,
    clusters: Vec<Cluster>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_finding(&mut self, finding: Finding) -> &mut Self {
        self.findings.push(finding);
        self
    }

    pub fn add_findings(&mut self, findings: impl IntoIterator<Item = Finding>) -> &mut Self {
        self.findings.extend(findings);
        self
    }

    /// Record that the findings with these IDs are occurrences of `fragment`.
    pub fn add_cluster<I, S>(&mut self, fragment: impl Into<String>, finding_ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clusters.push(Cluster {
            fragment: fragment.into(),
            finding_ids: finding_ids.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Merge the findings, then create one group per distinct non-empty
    /// fragment and attach every listed finding to it.
    ///
    /// Clusters with an empty fragment each get their own group. IDs that do
    /// not match any finding are skipped.
    pub fn build(self) -> ScanReport {
        let raw = self.findings.len();
        let findings = merger::merge_findings(self.findings);
        debug!("Merged {} raw findings into {}", raw, findings.len());

        let mut report = ScanReport::new();
        let mut by_id: HashMap<String, FindingRef> = HashMap::with_capacity(findings.len());
        for finding in findings {
            let id = finding.id.clone();
            let handle = report.add_finding(finding);
            by_id.insert(id, handle);
        }

        let mut by_fragment: HashMap<String, GroupRef> = HashMap::new();
        for cluster in self.clusters {
            let group = if cluster.fragment.is_empty() {
                report.add_group(DuplicationGroup::default())
            } else if let Some(group) = by_fragment.get(&cluster.fragment) {
                debug!("Merging cluster into existing group {}", group);
                *group
            } else {
                let group = report.add_group(DuplicationGroup::new(&cluster.fragment));
                by_fragment.insert(cluster.fragment, group);
                group
            };

            for id in &cluster.finding_ids {
                match by_id.get(id) {
                    Some(finding) => report.attach(group, *finding),
                    None => warn!("Cluster references unknown finding {}", id),
                }
            }
        }

        report.refresh_summary();
        info!(
            "Built report with {} findings in {} duplication groups",
            report.summary.total, report.summary.duplication_groups
        );
        report
    }
}
