#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

// Building blocks
mod catalog_set;
mod ledger;
mod pipeline;

// Public API
mod loader;
mod manager;
mod preload;
mod signal;
mod update;

pub use catalog_set::CatalogSet;
pub use ledger::{LedgerGuard, LedgerSlot, LedgerWait, LoadLedger};
pub use loader::{DiskFetch, LoadedPackage, PackageLoader};
pub use manager::{
    BundleDeps, BundleManager, CatalogDownload, CatalogSyncError, ConfigError, FeatureState,
    ManagerConfig, UpdateOutcome,
};
pub use pipeline::{DownloadPipeline, PipelineDeps};
pub use preload::{
    PreloadDecision, PreloadError, PreloadFailure, PreloadObserver, PreloadPlan, PreloadReport,
    PreloadRequest, PreloadSource, Preloader, ProceedAll,
};
pub use signal::{
    CatalogRequest, CatalogRequestPolicy, CatalogVersionSignal, DefaultCatalogRequest,
    RESOURCE_VERSION_HEADER, VersionSignals,
};
pub use update::{
    CommitAll, CommitUnlessInUse, UpdateClassification, UpdateCondition, UpdatePolicy,
    classify_update,
};
