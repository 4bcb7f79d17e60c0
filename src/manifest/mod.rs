//! Manifest discovery, retrieval, and parsing.
//!
//! # Supported Manifests
//!
//! | Ecosystem | Files | Extraction |
//! |-----------|-------|------------|
//! | npm | `package.json` | keys of `dependencies` and `devDependencies` |
//! | ruby | `Gemfile`, `Gemfile.*` | first argument of each `gem` line |
//! | python | `requirements*.txt` | leading package token of each requirement |

pub mod discovery;
pub mod parse;

pub use discovery::{classify_path, detect_ecosystem, discover_local, discover_remote};
pub use parse::parse_dependencies;

use crate::error::ManifestError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Retrieves the raw text of a manifest file.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<String, ManifestError>;
}

/// Reads `http(s)://` locations over the network and everything else from disk.
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[async_trait]
impl ManifestFetcher for DefaultFetcher {
    async fn fetch(&self, location: &str) -> Result<String, ManifestError> {
        if !is_remote(location) {
            return tokio::fs::read_to_string(location)
                .await
                .map_err(|source| ManifestError::Io {
                    path: PathBuf::from(location),
                    source,
                });
        }

        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|source| ManifestError::Fetch {
                url: location.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ManifestError::Status {
                url: location.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|source| ManifestError::Fetch {
            url: location.to_string(),
            source,
        })
    }
}
