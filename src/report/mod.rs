pub mod builder;
pub mod duplication;
pub mod finding;
pub mod json;
pub mod legacy;
pub mod loader;
pub mod merger;
pub mod terminal;

use serde::{Deserialize, Serialize};

use duplication::DuplicationGroup;
use finding::{Finding, FindingProperty, Severity};

// ── Arena handles ──────────────────────────────────────────────────

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            pub fn new(index: usize) -> Self {
                Self(index)
            }

            pub fn index(self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

arena_handle!(
    /// Position of a finding in [`ScanReport::findings`].
    FindingRef
);
arena_handle!(
    /// Position of a group in [`ScanReport::duplications`].
    GroupRef
);

// ── Report ─────────────────────────────────────────────────────────

/// A complete report: the arena that owns every finding and every
/// duplication group. Groups and findings refer to each other only through
/// [`FindingRef`] and [`GroupRef`] handles into this report.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Version of the tool that wrote the report
    pub version: String,

    /// When the report was produced
    pub timestamp: String,

    findings: Vec<Finding>,

    duplications: Vec<DuplicationGroup>,

    /// Summary counts
    pub summary: ScanSummary,
}

impl Default for ScanReport {
    fn default() -> Self {
        ScanReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            findings: Vec::new(),
            duplications: Vec::new(),
            summary: ScanSummary::default(),
        }
    }
}

impl ScanReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn duplications(&self) -> &[DuplicationGroup] {
        &self.duplications
    }

    pub fn add_finding(&mut self, finding: Finding) -> FindingRef {
        self.findings.push(finding);
        FindingRef::new(self.findings.len() - 1)
    }

    pub fn add_group(&mut self, group: DuplicationGroup) -> GroupRef {
        self.duplications.push(group);
        GroupRef::new(self.duplications.len() - 1)
    }

    pub fn finding(&self, finding: FindingRef) -> Option<&Finding> {
        self.findings.get(finding.index())
    }

    pub fn finding_mut(&mut self, finding: FindingRef) -> Option<&mut Finding> {
        self.findings.get_mut(finding.index())
    }

    pub fn group(&self, group: GroupRef) -> Option<&DuplicationGroup> {
        self.duplications.get(group.index())
    }

    pub fn group_mut(&mut self, group: GroupRef) -> Option<&mut DuplicationGroup> {
        self.duplications.get_mut(group.index())
    }

    /// Make `finding` a member of `group`: the finding's slot points at the
    /// group and the group lists the finding.
    ///
    /// Nothing checks that the finding belongs in the group, or that it is
    /// not already a member of another one; the slot simply keeps the last
    /// group attached.
    ///
    /// # Panics
    /// If either handle does not come from this report.
    pub fn attach(&mut self, group: GroupRef, finding: FindingRef) {
        self.findings[finding.index()].set_additional_properties(FindingProperty::Duplication(group));
        self.duplications[group.index()].add(finding);
    }

    /// The group a finding's slot points at.
    pub fn group_of(&self, finding: FindingRef) -> Option<GroupRef> {
        self.finding(finding).and_then(Finding::duplication_group)
    }

    /// Whether both findings point at the same group instance.
    pub fn same_cluster(&self, a: FindingRef, b: FindingRef) -> bool {
        match (self.group_of(a), self.group_of(b)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    /// Member findings of a group, in insertion order. Handles that do not
    /// resolve are skipped.
    pub fn members(&self, group: GroupRef) -> impl Iterator<Item = &Finding> + '_ {
        self.group(group)
            .map(DuplicationGroup::duplications)
            .unwrap_or_default()
            .iter()
            .filter_map(|finding| self.finding(*finding))
    }

    /// Rebuild every finding's duplication slot from group membership.
    ///
    /// Groups are authoritative: slots that point at a group are cleared first,
    /// then each member gets its group in group order (a finding listed in two
    /// groups ends up pointing at the later one).
    pub fn relink_duplications(&mut self) {
        for finding in &mut self.findings {
            if finding.duplication_group().is_some() {
                finding.clear_additional_properties();
            }
        }
        for (index, group) in self.duplications.iter().enumerate() {
            for member in group.duplications() {
                if let Some(finding) = self.findings.get_mut(member.index()) {
                    finding.set_additional_properties(FindingProperty::Duplication(GroupRef::new(index)));
                }
            }
        }
    }

    pub fn refresh_summary(&mut self) {
        self.summary = ScanSummary::from_report(&self.findings, &self.duplications);
    }

    /// Check if there are findings at or above a severity threshold
    pub fn has_findings_at_or_above(&self, threshold: Severity) -> bool {
        self.findings.iter().any(|f| f.severity >= threshold)
    }

    /// Findings at or above `threshold`, with their handles. The report itself
    /// is never re-indexed, so the handles stay valid.
    pub fn findings_at_or_above(&self, threshold: Severity) -> impl Iterator<Item = (FindingRef, &Finding)> + '_ {
        self.findings
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.severity >= threshold)
            .map(|(index, f)| (FindingRef::new(index), f))
    }

    pub(crate) fn from_parts(
        version: String,
        timestamp: String,
        findings: Vec<Finding>,
        duplications: Vec<DuplicationGroup>,
    ) -> Self {
        let mut report = ScanReport {
            version,
            timestamp,
            findings,
            duplications,
            summary: ScanSummary::default(),
        };
        report.relink_duplications();
        report.refresh_summary();
        report
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub error: usize,
    pub high: usize,
    pub normal: usize,
    pub low: usize,
    #[serde(default)]
    pub duplication_groups: usize,
    /// Findings that belong to at least one group
    #[serde(default)]
    pub duplicated_findings: usize,
}

impl ScanSummary {
    pub fn from_report(findings: &[Finding], duplications: &[DuplicationGroup]) -> Self {
        let mut summary = ScanSummary {
            total: findings.len(),
            duplication_groups: duplications.len(),
            ..Default::default()
        };
        for f in findings {
            match f.severity {
                Severity::Error => summary.error += 1,
                Severity::High => summary.high += 1,
                Severity::Normal => summary.normal += 1,
                Severity::Low => summary.low += 1,
            }
        }
        summary.duplicated_findings = findings
            .iter()
            .filter(|f| f.duplication_group().is_some())
            .count();
        summary
    }
}
