use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Ecosystem;

/// Classification of one registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryStatus {
    Published,
    NotFound,
    Unpublished,
}

impl RegistryStatus {
    /// Returns the finding status for outcomes that should be reported.
    pub fn finding_status(&self) -> Option<FindingStatus> {
        match self {
            RegistryStatus::Published => None,
            RegistryStatus::NotFound => Some(FindingStatus::NotFound),
            RegistryStatus::Unpublished => Some(FindingStatus::Unpublished),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindingStatus {
    NotFound,
    Unpublished,
}

impl FindingStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            FindingStatus::NotFound => "Not Found",
            FindingStatus::Unpublished => "Unpublished",
        }
    }

    /// Unpublished packages were deliberately pulled and are the stronger signal.
    pub fn risk_label(&self) -> &'static str {
        match self {
            FindingStatus::Unpublished => "high",
            FindingStatus::NotFound => "medium",
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub name: String,
    #[serde(rename = "type")]
    pub ecosystem: Ecosystem,
    pub status: FindingStatus,
    #[serde(rename = "sourceFile")]
    pub source_file: String,
}

impl Finding {
    pub fn new(
        name: impl Into<String>,
        ecosystem: Ecosystem,
        status: FindingStatus,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ecosystem,
            status,
            source_file: source_file.into(),
        }
    }
}

/// Progress notification emitted after every completed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub scanned: usize,
    pub total: usize,
}

impl ScanProgress {
    /// Percent complete in `0.0..=100.0`; zero when nothing was scheduled.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.scanned as f64 / self.total as f64 * 100.0
        }
    }
}

/// Final result of a scan. Findings are in lookup completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub findings: Vec<Finding>,
    pub total: usize,
    pub scanned: usize,
}

impl ScanOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Exportable record of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub ecosystems: Vec<Ecosystem>,
    pub total_dependencies: usize,
    pub total_findings: usize,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    pub fn new(target: impl Into<String>, ecosystems: Vec<Ecosystem>, outcome: ScanOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.into(),
            ecosystems,
            total_dependencies: outcome.total,
            total_findings: outcome.findings.len(),
            findings: outcome.findings,
        }
    }

    pub fn count(&self, status: FindingStatus) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }
}
