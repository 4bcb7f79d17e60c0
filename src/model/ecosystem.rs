use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Ruby,
    Python,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 3] = [Ecosystem::Npm, Ecosystem::Ruby, Ecosystem::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Ruby => "ruby",
            Ecosystem::Python => "python",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "NPM",
            Ecosystem::Ruby => "RubyGems",
            Ecosystem::Python => "PyPI",
        }
    }

    /// Manifest files this ecosystem's dependencies are read from.
    pub fn manifest_names(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "package.json",
            Ecosystem::Ruby => "Gemfile, Gemfile.*",
            Ecosystem::Python => "requirements.txt, requirements*.txt",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npm" | "node" => Ok(Ecosystem::Npm),
            "ruby" | "rubygems" | "gem" => Ok(Ecosystem::Ruby),
            "python" | "pypi" | "pip" => Ok(Ecosystem::Python),
            _ => Err(format!(
                "Unknown ecosystem: {}. Use 'npm', 'ruby', or 'python'",
                s
            )),
        }
    }
}

/// Location of a raw manifest file: an `http(s)://` URL or a local path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub location: String,
}

impl ManifestFile {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Manifest files grouped by the ecosystem that parses them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestFiles {
    files: HashMap<Ecosystem, Vec<ManifestFile>>,
}

impl ManifestFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file unless the same location is already recorded for `ecosystem`.
    pub fn push(&mut self, ecosystem: Ecosystem, file: ManifestFile) {
        let files = self.files.entry(ecosystem).or_default();
        if !files.contains(&file) {
            files.push(file);
        }
    }

    pub fn get(&self, ecosystem: Ecosystem) -> &[ManifestFile] {
        self.files.get(&ecosystem).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, ecosystem: Ecosystem) -> bool {
        !self.get(ecosystem).is_empty()
    }

    pub fn extend(&mut self, other: ManifestFiles) {
        for ecosystem in Ecosystem::ALL {
            for file in other.get(ecosystem) {
                self.push(ecosystem, file.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dependency name as extracted from one manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDependency {
    pub name: String,
    pub source_file: String,
}

impl RawDependency {
    pub fn new(name: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_file: source_file.into(),
        }
    }
}

/// One pending registry lookup for a single (ecosystem, package) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub ecosystem: Ecosystem,
    pub package_name: String,
    pub lookup_url: String,
    pub source_file: String,
}
