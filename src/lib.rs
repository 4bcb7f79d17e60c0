pub mod config;
pub mod error;
pub mod manifest;
pub mod model;
pub mod output;
pub mod registry;
pub mod scan;

pub use config::Config;
pub use error::{ManifestError, RegistryError, ScanError};
pub use model::{
    Ecosystem, Finding, FindingStatus, ManifestFile, ManifestFiles, RawDependency,
    RegistryStatus, ScanOutcome, ScanProgress, ScanReport, WorkItem,
};
pub use scan::{ScanHandle, ScanOptions, Scanner};
