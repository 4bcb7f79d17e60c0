//! Configuration file handling.
//!
//! This module provides loading and saving of depsentry configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/depsentry/config.toml`
//! - macOS: `~/Library/Application Support/depsentry/config.toml`
//! - Windows: `%APPDATA%\depsentry\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! max_concurrent_requests = 40
//! request_timeout_secs = 10
//! default_format = "table"
//! default_ecosystems = ["npm", "ruby", "python"]
//!
//! [registries]
//! npm = "https://registry.npmjs.org"
//! rubygems = "https://rubygems.org"
//! pypi = "https://pypi.org"
//!
//! [ignore]
//! packages = ["@internal/*"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::Ecosystem;

/// Ceiling on in-flight registry lookups when nothing else is configured.
pub const DEFAULT_MAX_CONCURRENT: usize = 40;

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use depsentry::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Concurrency cap: {}", config.max_concurrent_requests);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of registry lookups in flight at once.
    ///
    /// Default: 40
    pub max_concurrent_requests: usize,

    /// Per-lookup timeout, in seconds. A lookup that exceeds it counts as a miss.
    ///
    /// Default: 10
    pub request_timeout_secs: u64,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Ecosystems scanned with `--all`.
    ///
    /// Default: all ecosystems
    pub default_ecosystems: Vec<Ecosystem>,

    /// Registry base URLs.
    pub registries: RegistryEndpoints,

    /// Packages that are never looked up.
    pub ignore: IgnoreConfig,
}

/// Base URLs of the registries queried for each ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryEndpoints {
    pub npm: String,
    pub rubygems: String,
    pub pypi: String,
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            npm: "https://registry.npmjs.org".to_string(),
            rubygems: "https://rubygems.org".to_string(),
            pypi: "https://pypi.org".to_string(),
        }
    }
}

impl RegistryEndpoints {
    /// Points every ecosystem at the same base URL. Handy for mock servers.
    pub fn uniform(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            npm: base.clone(),
            rubygems: base.clone(),
            pypi: base,
        }
    }

    /// Builds the status/metadata URL for a package.
    pub fn lookup_url(&self, ecosystem: Ecosystem, name: &str) -> String {
        match ecosystem {
            Ecosystem::Npm => {
                // Scoped packages: @scope/pkg -> @scope%2Fpkg
                let encoded = name.replace('/', "%2F");
                format!("{}/{}", self.npm.trim_end_matches('/'), encoded)
            }
            Ecosystem::Ruby => format!(
                "{}/api/v1/gems/{}.json",
                self.rubygems.trim_end_matches('/'),
                name
            ),
            Ecosystem::Python => {
                format!("{}/pypi/{}/json", self.pypi.trim_end_matches('/'), name)
            }
        }
    }
}

/// Configuration for skipping specific packages.
///
/// Use this to keep private or internal package names off public registries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names to exclude from scanning.
    ///
    /// Supports glob patterns (e.g., "lodash*", "@internal/*").
    pub packages: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a package should be skipped.
    pub fn should_ignore_package(&self, name: &str) -> bool {
        self.packages.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, name)
            } else {
                pattern == name
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT,
            request_timeout_secs: 10,
            default_format: "table".to_string(),
            default_ecosystems: Ecosystem::ALL.to_vec(),
            registries: RegistryEndpoints::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use depsentry::Config;
    ///
    /// let path = Config::config_path();
    /// println!("Config file: {}", path.display());
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depsentry")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
