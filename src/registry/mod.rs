//! Registry status lookups.
//!
//! A [`RegistryClient`] answers one question per [`WorkItem`]: is this
//! package still published? [`HttpRegistryClient`] asks the public
//! registries; tests substitute their own implementations.

mod classify;

pub use classify::{classify, has_unpublish_marker};

use crate::error::RegistryError;
use crate::model::{Ecosystem, RegistryStatus, WorkItem};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Looks up the current registry status of one package.
    async fn check_status(&self, item: &WorkItem) -> Result<RegistryStatus, RegistryError>;
}

pub struct HttpRegistryClient {
    client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("depsentry/", env!("CARGO_PKG_VERSION")))
            .default_headers(no_cache_headers())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for HttpRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Every lookup must reflect the registry's current state.
fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    fn name(&self) -> &'static str {
        "HTTP registry"
    }

    async fn check_status(&self, item: &WorkItem) -> Result<RegistryStatus, RegistryError> {
        let response = self
            .client
            .get(&item.lookup_url)
            .send()
            .await
            .map_err(|source| RegistryError::Request {
                url: item.lookup_url.clone(),
                source,
            })?;

        let status = response.status();
        debug!(
            package = %item.package_name,
            ecosystem = item.ecosystem.as_str(),
            status = status.as_u16(),
            "registry responded"
        );

        // Only npm metadata carries an unpublish marker worth reading.
        let body = if item.ecosystem == Ecosystem::Npm && status == StatusCode::OK {
            response
                .bytes()
                .await
                .map_err(|source| RegistryError::Request {
                    url: item.lookup_url.clone(),
                    source,
                })?
        } else {
            Default::default()
        };

        classify(item.ecosystem, &item.package_name, status.as_u16(), &body)
    }
}
