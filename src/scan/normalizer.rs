use std::collections::HashSet;

use crate::config::{IgnoreConfig, RegistryEndpoints};
use crate::model::{Ecosystem, RawDependency, WorkItem};

/// Turns raw dependency names into at most one [`WorkItem`] per
/// (ecosystem, name) for the lifetime of a scan.
#[derive(Debug)]
pub struct Normalizer {
    seen: HashSet<(Ecosystem, String)>,
    endpoints: RegistryEndpoints,
    ignore: IgnoreConfig,
}

impl Normalizer {
    pub fn new(endpoints: RegistryEndpoints, ignore: IgnoreConfig) -> Self {
        Self {
            seen: HashSet::new(),
            endpoints,
            ignore,
        }
    }

    /// Returns a work item the first time a package is seen in `ecosystem`.
    ///
    /// Later sightings, including from other source files, are dropped so the
    /// first source file is the one reported.
    pub fn admit(&mut self, ecosystem: Ecosystem, dependency: RawDependency) -> Option<WorkItem> {
        if self.ignore.should_ignore_package(&dependency.name) {
            return None;
        }
        if !self.seen.insert((ecosystem, dependency.name.clone())) {
            return None;
        }

        Some(WorkItem {
            ecosystem,
            lookup_url: self.endpoints.lookup_url(ecosystem, &dependency.name),
            package_name: dependency.name,
            source_file: dependency.source_file,
        })
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
