use comfy_table::{presets::UTF8_BORDERS_ONLY, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;

use crate::report::finding::Severity;
use crate::report::{GroupRef, ScanReport};
use crate::rules::RuleSet;

const FRAGMENT_PREVIEW_CHARS: usize = 60;

/// Render a report to the terminal with colors
pub fn render(report: &ScanReport, rules: &RuleSet, min_severity: Severity) {
    println!();
    println!(
        "{}  dryreport v{} — report written by v{} at {}",
        "🔍".bold(),
        env!("CARGO_PKG_VERSION"),
        report.version,
        report.timestamp
    );
    println!();

    let mut shown = 0;
    for (_, finding) in report.findings_at_or_above(min_severity) {
        shown += 1;
        let severity_display = format!(" {} ", finding.severity);
        let severity_colored = match finding.severity {
            Severity::Error => severity_display.on_red().white().bold().to_string(),
            Severity::High => severity_display.on_yellow().black().bold().to_string(),
            Severity::Normal => severity_display.on_blue().white().bold().to_string(),
            Severity::Low => severity_display.on_white().black().to_string(),
        };

        println!("  {}  {}", severity_colored, finding.location().dimmed());

        let title = if finding.title.is_empty() { &finding.rule_id } else { &finding.title };
        println!("           {}", title.bold());

        if let Some(rule) = rules.get(&finding.category, &finding.rule_id) {
            println!("           {} {}", "rule:".dimmed(), rule.name);
            if !rule.url.is_empty() {
                println!("           {} {}", "see:".dimmed(), rule.url.underline());
            }
        }

        if let Some(group) = finding.duplication_group() {
            println!(
                "           {} {}",
                "⮕".green(),
                format!("duplication group {}", group).green()
            );
        }
        println!();
    }

    if shown == 0 {
        println!("  {}  No findings at or above {}", "✅".bold(), min_severity);
        println!();
    }

    if !report.duplications().is_empty() {
        println!("{}", duplication_table(report));
        println!();
    }

    // Summary bar
    println!("{}", "━".repeat(60));

    let mut summary_parts = Vec::new();
    if report.summary.error > 0 {
        summary_parts.push(format!("{} error", report.summary.error).red().bold().to_string());
    }
    if report.summary.high > 0 {
        summary_parts.push(format!("{} high", report.summary.high).yellow().bold().to_string());
    }
    if report.summary.normal > 0 {
        summary_parts.push(format!("{} normal", report.summary.normal).blue().to_string());
    }
    if report.summary.low > 0 {
        summary_parts.push(format!("{} low", report.summary.low).white().to_string());
    }

    println!(
        " Found {} findings: {}",
        report.summary.total.to_string().bold(),
        summary_parts.join(", ")
    );
    println!(
        " {} duplication groups covering {} findings",
        report.summary.duplication_groups.to_string().bold(),
        report.summary.duplicated_findings
    );

    println!("{}", "━".repeat(60));
    println!();
}

/// One row per group: handle, fragment preview, occurrences, locations.
pub fn duplication_table(report: &ScanReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Group", "Fragment", "Occurrences", "Locations"]);

    for (index, group) in report.duplications().iter().enumerate() {
        let handle = GroupRef::new(index);
        let locations: Vec<_> = report.members(handle).map(|f| f.location()).collect();
        table.add_row(vec![
            Cell::new(handle),
            Cell::new(fragment_preview(group.code_fragment())),
            Cell::new(group.len()),
            Cell::new(locations.join("\n")),
        ]);
    }
    table
}

/// First non-blank line of the fragment, shortened for display.
fn fragment_preview(fragment: &str) -> String {
    let line = fragment.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if line.is_empty() {
        return "(no fragment)".to_string();
    }
    if line.chars().count() > FRAGMENT_PREVIEW_CHARS {
        let cut: String = line.chars().take(FRAGMENT_PREVIEW_CHARS - 1).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::duplication::DuplicationGroup;
    use crate::report::finding::Finding;

    #[test]
    fn previews_use_the_first_meaningful_line() {
        assert_eq!(fragment_preview("\n   \n  let a = 1;\nlet b = 2;"), "let a = 1;");
        assert_eq!(fragment_preview(""), "(no fragment)");

        let long = "x".repeat(100);
        let preview = fragment_preview(&long);
        assert_eq!(preview.chars().count(), FRAGMENT_PREVIEW_CHARS);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn table_lists_every_group() {
        let mut report = ScanReport::new();
        let a = report.add_finding(Finding::new("CPD", "src/a.rs", 1));
        let b = report.add_finding(Finding::new("CPD", "src/b.rs", 2));
        let group = report.add_group(DuplicationGroup::new("fn twin() {}"));
        report.attach(group, a);
        report.attach(group, b);
        report.add_group(DuplicationGroup::default());

        let rendered = duplication_table(&report).to_string();
        assert!(rendered.contains("fn twin() {}"));
        assert!(rendered.contains("src/a.rs:1"));
        assert!(rendered.contains("(no fragment)"));
    }
}
