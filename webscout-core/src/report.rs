// Console and JSON reports built from the finding list

use crate::data::{Finding, FindingCategory, Severity};
use colored::{ColoredString, Colorize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const DEFAULT_REPORT_PATH: &str = "vulnerability_report.json";

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// One console line announcing a finding as it is recorded.
pub fn finding_line(finding: &Finding) -> String {
    format!("[+] Potential {} found at {}", finding.category, finding.url)
}

/// One report line per finding.
pub fn report_line(finding: &Finding) -> String {
    format!(
        "- {} | {} | Param: {}",
        finding.category,
        finding.url,
        finding.parameter.as_deref().unwrap_or("None")
    )
}

/// Number of findings per category, in category order, skipping empty ones.
pub fn tally(findings: &[Finding]) -> Vec<(FindingCategory, usize)> {
    FindingCategory::ALL
        .iter()
        .map(|category| {
            let count = findings.iter().filter(|f| f.category == *category).count();
            (*category, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}

pub fn generate_text_report(findings: &[Finding]) -> String {
    let mut report = String::new();

    report.push_str(DIVIDER);
    report.push('\n');
    report.push_str("SCAN REPORT\n");
    report.push_str(DIVIDER);
    report.push_str("\n\n");

    if findings.is_empty() {
        report.push_str("No issues found. Target appears secure.\n");
        return report;
    }

    for finding in findings {
        report.push_str(&report_line(finding));
        report.push('\n');
    }

    report.push('\n');
    report.push_str(&format!("Total Findings: {}\n\n", findings.len()));
    for (category, count) in tally(findings) {
        report.push_str(&format!(
            "  {} {}: {}\n",
            severity_tag(category.severity()),
            category,
            count
        ));
    }

    report
}

fn severity_tag(severity: Severity) -> ColoredString {
    let tag = format!("{:<10}", format!("[{}]", severity.as_str().to_uppercase()));
    match severity {
        Severity::Critical => tag.red().bold(),
        Severity::High => tag.red(),
        Severity::Medium => tag.yellow(),
        Severity::Low => tag.cyan(),
        Severity::Info => tag.dimmed(),
    }
}

/// The findings as a pretty-printed JSON array.
pub fn generate_json_report(findings: &[Finding]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(findings)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Serialize and save in one step; the error says which half failed.
pub fn write_json_report(findings: &[Finding], path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    let json = generate_json_report(findings).context("Failed to serialize findings")?;
    save_report(&json, path)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
