//! Error types for registry lookups, manifest handling, and scans.
//!
//! None of these abort a scan on their own: lookup and manifest errors are
//! logged and absorbed where they occur. They are typed so callers and tests
//! can tell the failure modes apart.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry lookup for {package} timed out after {timeout:?}")]
    Timeout { package: String, timeout: Duration },

    #[error("malformed registry response for {package}: {source}")]
    MalformedBody {
        package: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid manifest pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan stopped before reporting completion")]
    Interrupted,
}
