use std::collections::HashSet;

use crate::model::{Ecosystem, Finding, FindingStatus, RegistryStatus, WorkItem};

/// Collects findings, keeping one per (ecosystem, name, status).
#[derive(Debug, Default)]
pub struct ResultAggregator {
    seen: HashSet<(Ecosystem, String, FindingStatus)>,
    findings: Vec<Finding>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one lookup. Returns true if a new finding was added.
    pub fn record(&mut self, item: &WorkItem, status: RegistryStatus) -> bool {
        let Some(status) = status.finding_status() else {
            return false;
        };
        if !self
            .seen
            .insert((item.ecosystem, item.package_name.clone(), status))
        {
            return false;
        }

        self.findings.push(Finding::new(
            item.package_name.clone(),
            item.ecosystem,
            status,
            item.source_file.clone(),
        ));
        true
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn take_findings(&mut self) -> Vec<Finding> {
        std::mem::take(&mut self.findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(ecosystem: Ecosystem, name: &str, source: &str) -> WorkItem {
        WorkItem {
            ecosystem,
            package_name: name.to_string(),
            lookup_url: String::new(),
            source_file: source.to_string(),
        }
    }

    #[test]
    fn test_published_is_ignored() {
        let mut aggregator = ResultAggregator::new();
        assert!(!aggregator.record(&item(Ecosystem::Npm, "react", "p"), RegistryStatus::Published));
        assert!(aggregator.findings().is_empty());
    }

    #[test]
    fn test_duplicate_results_are_dropped() {
        let mut aggregator = ResultAggregator::new();
        let first = item(Ecosystem::Npm, "left-pad", "a/package.json");
        let again = item(Ecosystem::Npm, "left-pad", "b/package.json");

        assert!(aggregator.record(&first, RegistryStatus::Unpublished));
        assert!(!aggregator.record(&again, RegistryStatus::Unpublished));
        assert_eq!(aggregator.findings().len(), 1);
        assert_eq!(aggregator.findings()[0].source_file, "a/package.json");
    }

    #[test]
    fn test_distinct_status_or_ecosystem_are_kept() {
        let mut aggregator = ResultAggregator::new();

        assert!(aggregator.record(&item(Ecosystem::Npm, "x", "p"), RegistryStatus::Unpublished));
        assert!(aggregator.record(&item(Ecosystem::Npm, "x", "p"), RegistryStatus::NotFound));
        assert!(aggregator.record(&item(Ecosystem::Ruby, "x", "g"), RegistryStatus::NotFound));

        let findings = aggregator.take_findings();
        assert_eq!(findings.len(), 3);
        assert!(aggregator.findings().is_empty());
    }
}
