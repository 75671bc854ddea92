use std::collections::HashSet;

use crate::report::finding::Finding;

/// Deduplicate and sort findings.
///
/// Must run before any handle is handed out: it reorders the findings.
pub fn merge_findings(mut findings: Vec<Finding>) -> Vec<Finding> {
    // Deduplicate by deterministic ID
    let mut seen = HashSet::new();
    findings.retain(|f| seen.insert(f.id.clone()));

    // Sort by severity (most severe first), then by file path, then by line
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line_start.cmp(&b.line_start))
    });

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::finding::Severity;

    #[test]
    fn drops_repeated_ids_and_orders_by_severity() {
        let mut loud = Finding::new("CA2000", "src/z.rs", 1);
        loud.severity = Severity::Error;
        let findings = vec![
            Finding::new("CPD", "src/b.rs", 7),
            Finding::new("CPD", "src/a.rs", 9),
            Finding::new("CPD", "src/a.rs", 2),
            loud.clone(),
            Finding::new("CPD", "src/a.rs", 9),
        ];

        let merged = merge_findings(findings);
        let order: Vec<_> = merged.iter().map(Finding::location).collect();
        assert_eq!(order, vec!["src/z.rs:1", "src/a.rs:2", "src/a.rs:9", "src/b.rs:7"]);
        assert_eq!(merged[0], loud);
    }
}
