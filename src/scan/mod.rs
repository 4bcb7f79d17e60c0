//! Bounded-concurrency registry status scanning.
//!
//! A scan runs in two phases. The first reads every selected manifest, one
//! file at a time, and queues one lookup per distinct (ecosystem, package).
//! The second dispatches those lookups with at most `max_concurrent` in
//! flight; every finished lookup records its result, emits a
//! [`ScanProgress`], and admits the next queued items. The scan completes
//! when the queue is empty and nothing is in flight.
//!
//! Lookup failures and timeouts are logged and treated as "published": a
//! scan always completes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use depsentry::manifest::DefaultFetcher;
//! use depsentry::registry::HttpRegistryClient;
//! use depsentry::scan::{ScanOptions, Scanner};
//! use depsentry::{Ecosystem, RawDependency};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scanner = Scanner::new(
//!         Arc::new(HttpRegistryClient::new()),
//!         Arc::new(DefaultFetcher::new()),
//!         ScanOptions::default(),
//!     );
//!
//!     let mut handle = scanner.start_with_dependencies(vec![(
//!         Ecosystem::Npm,
//!         vec![RawDependency::new("left-pad", "package.json")],
//!     )]);
//!     while let Some(progress) = handle.progress.recv().await {
//!         println!("{}/{}", progress.scanned, progress.total);
//!     }
//!     let outcome = handle.finish().await?;
//!     println!("{} findings", outcome.findings.len());
//!     Ok(())
//! }
//! ```

mod aggregator;
mod normalizer;
mod queue;
mod state;

pub use aggregator::ResultAggregator;
pub use normalizer::Normalizer;
pub use queue::TaskQueue;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

use crate::config::{Config, IgnoreConfig, RegistryEndpoints, DEFAULT_MAX_CONCURRENT};
use crate::error::{RegistryError, ScanError};
use crate::manifest::{parse_dependencies, ManifestFetcher};
use crate::model::{
    Ecosystem, ManifestFiles, RawDependency, RegistryStatus, ScanOutcome, ScanProgress, WorkItem,
};
use crate::registry::RegistryClient;
use state::ScanState;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum lookups in flight at once. Values below 1 are treated as 1.
    pub max_concurrent: usize,
    /// Upper bound on a single lookup.
    pub lookup_timeout: Duration,
    pub endpoints: RegistryEndpoints,
    pub ignore: IgnoreConfig,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            lookup_timeout: Duration::from_secs(10),
            endpoints: RegistryEndpoints::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl From<&Config> for ScanOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent: config.max_concurrent_requests,
            lookup_timeout: config.request_timeout(),
            endpoints: config.registries.clone(),
            ignore: config.ignore.clone(),
        }
    }
}

/// Receiving side of a running scan.
pub struct ScanHandle {
    /// One event per finished lookup, in order. Closed when the scan completes.
    pub progress: mpsc::UnboundedReceiver<ScanProgress>,
    result: oneshot::Receiver<ScanOutcome>,
}

impl ScanHandle {
    /// Waits for the scan's final result.
    pub async fn finish(self) -> Result<ScanOutcome, ScanError> {
        self.result.await.map_err(|_| ScanError::Interrupted)
    }
}

struct ScanContext {
    state: Mutex<ScanState>,
    registry: Arc<dyn RegistryClient>,
    lookup_timeout: Duration,
}

impl ScanContext {
    async fn begin_dispatch(self: &Arc<Self>) {
        let batch = self.state.lock().await.finish_enumeration();
        self.spawn_lookups(batch);
    }

    fn spawn_lookups(self: &Arc<Self>, items: Vec<WorkItem>) {
        for item in items {
            let ctx = Arc::clone(self);
            tokio::spawn(async move { ctx.lookup(item).await });
        }
    }

    async fn lookup(self: Arc<Self>, item: WorkItem) {
        let status = match tokio::time::timeout(
            self.lookup_timeout,
            self.registry.check_status(&item),
        )
        .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!("Registry check failed for {}: {}", item.package_name, e);
                RegistryStatus::Published
            }
            Err(_) => {
                let e = RegistryError::Timeout {
                    package: item.package_name.clone(),
                    timeout: self.lookup_timeout,
                };
                warn!("{}", e);
                RegistryStatus::Published
            }
        };

        let next = self.state.lock().await.complete_lookup(&item, status);
        self.spawn_lookups(next);
    }
}

/// Schedules registry lookups for a set of dependencies.
///
/// Each call to [`start`](Self::start) or
/// [`start_with_dependencies`](Self::start_with_dependencies) runs an
/// independent scan with its own counters and dedup sets. Both must be
/// called from within a tokio runtime.
pub struct Scanner {
    registry: Arc<dyn RegistryClient>,
    fetcher: Arc<dyn ManifestFetcher>,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        fetcher: Arc<dyn ManifestFetcher>,
        options: ScanOptions,
    ) -> Self {
        Self {
            registry,
            fetcher,
            options,
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn context(&self) -> (Arc<ScanContext>, ScanHandle) {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let normalizer = Normalizer::new(self.options.endpoints.clone(), self.options.ignore.clone());

        let ctx = Arc::new(ScanContext {
            state: Mutex::new(ScanState::new(
                normalizer,
                self.options.max_concurrent,
                progress_tx,
                done_tx,
            )),
            registry: Arc::clone(&self.registry),
            lookup_timeout: self.options.lookup_timeout,
        });

        let handle = ScanHandle {
            progress: progress_rx,
            result: done_rx,
        };
        (ctx, handle)
    }

    /// Reads the manifests of the selected ecosystems and checks every
    /// dependency they declare.
    ///
    /// A manifest that cannot be fetched or parsed contributes nothing.
    pub fn start(&self, selection: &[Ecosystem], files: ManifestFiles) -> ScanHandle {
        let (ctx, handle) = self.context();
        let fetcher = Arc::clone(&self.fetcher);
        let selection = selection.to_vec();

        tokio::spawn(async move {
            for ecosystem in selection {
                for file in files.get(ecosystem) {
                    let names = match fetcher
                        .fetch(&file.location)
                        .await
                        .and_then(|text| parse_dependencies(ecosystem, &text))
                    {
                        Ok(names) => names,
                        Err(e) => {
                            warn!("Skipping {}: {}", file.location, e);
                            continue;
                        }
                    };
                    debug!(
                        ecosystem = ecosystem.as_str(),
                        file = %file.location,
                        count = names.len(),
                        "extracted dependencies"
                    );

                    let mut state = ctx.state.lock().await;
                    for name in names {
                        state.enqueue(ecosystem, RawDependency::new(name, file.location.clone()));
                    }
                }
            }

            ctx.begin_dispatch().await;
        });

        handle
    }

    /// Checks dependencies that were already extracted from their manifests.
    pub fn start_with_dependencies(
        &self,
        dependencies: Vec<(Ecosystem, Vec<RawDependency>)>,
    ) -> ScanHandle {
        let (ctx, handle) = self.context();

        tokio::spawn(async move {
            {
                let mut state = ctx.state.lock().await;
                for (ecosystem, deps) in dependencies {
                    for dep in deps {
                        state.enqueue(ecosystem, dep);
                    }
                }
            }

            ctx.begin_dispatch().await;
        });

        handle
    }

    /// Runs a scan to completion, discarding progress events.
    pub async fn run(
        &self,
        selection: &[Ecosystem],
        files: ManifestFiles,
    ) -> Result<ScanOutcome, ScanError> {
        let mut handle = self.start(selection, files);
        while handle.progress.recv().await.is_some() {}
        handle.finish().await
    }
}
