use crate::model::{Ecosystem, FindingStatus, ScanReport};
use anyhow::Result;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Ecosystem")]
    ecosystem: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Source File")]
    source_file: String,
}

pub fn print_cli_table(report: &ScanReport) -> Result<()> {
    println!();
    println!(
        "Scan completed at: {}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Target: {}", report.target);
    println!();

    if report.findings.is_empty() {
        println!("No high-risk findings.");
    } else {
        println!("Found {} risky dependencies:", report.findings.len());
        println!();

        let mut findings = report.findings.clone();
        // Unpublished first; otherwise keep completion order.
        findings.sort_by_key(|f| match f.status {
            FindingStatus::Unpublished => 0,
            FindingStatus::NotFound => 1,
        });

        let rows: Vec<FindingRow> = findings
            .iter()
            .map(|f| FindingRow {
                risk: format_risk(&f.status),
                ecosystem: f.ecosystem.display_name().to_string(),
                package: truncate(&f.name, 40),
                status: f.status.display_name().to_string(),
                source_file: truncate(&f.source_file, 60),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    println!();
    print_summary(report);

    Ok(())
}

fn format_risk(status: &FindingStatus) -> String {
    match status {
        FindingStatus::Unpublished => "\x1b[91mHIGH\x1b[0m".to_string(),
        FindingStatus::NotFound => "\x1b[33mMEDIUM\x1b[0m".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

fn print_summary(report: &ScanReport) {
    let mut by_ecosystem: BTreeMap<&'static str, usize> = BTreeMap::new();
    for finding in &report.findings {
        *by_ecosystem
            .entry(finding.ecosystem.display_name())
            .or_default() += 1;
    }

    let ecosystems: Vec<&str> = report
        .ecosystems
        .iter()
        .map(Ecosystem::display_name)
        .collect();

    println!("Summary:");
    println!("  Ecosystems: {}", ecosystems.join(", "));
    println!("  Dependencies checked: {}", report.total_dependencies);
    println!(
        "  Findings: {} unpublished, {} not found",
        report.count(FindingStatus::Unpublished),
        report.count(FindingStatus::NotFound)
    );

    if by_ecosystem.len() > 1 {
        let breakdown: Vec<String> = by_ecosystem
            .iter()
            .map(|(name, count)| format!("{} {}", count, name))
            .collect();
        println!("  By ecosystem: {}", breakdown.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("left-pad", 40), "left-pad");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("ééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_format_risk() {
        assert!(format_risk(&FindingStatus::Unpublished).contains("HIGH"));
        assert!(format_risk(&FindingStatus::NotFound).contains("MEDIUM"));
    }
}
