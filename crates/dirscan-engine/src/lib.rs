//! Concurrent scanning engine for dirscan.
//!
//! This crate walks a directory tree and submits every file it finds to an
//! external scanning capability, aggregating the verdicts into run
//! statistics and a scan log.
//!
//! # Overview
//!
//! - **Tree walking**: one task per directory, spawned without limit
//! - **Admission control**: a counting gate bounds concurrent scan calls
//! - **Completion tracking**: a shared pending count joins all spawned work
//! - **Aggregation**: atomic counters plus a serialized append-only log
//!
//! # Example
//!
//! ```rust,no_run
//! use dirscan_engine::{ClientOptions, CommandBackend, DirectoryScanner, ScanConfig, ScanLog};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = CommandBackend::new("v1fs-scan", ClientOptions::default());
//! let log = ScanLog::append_file("scan.log")?;
//! let scanner = DirectoryScanner::new(backend, ScanConfig::new("/srv/uploads"), log);
//!
//! let summary = scanner.run().await?;
//! println!("Scanned {} files", summary.total_scanned);
//! # Ok(())
//! # }
//! ```
//!
//! # Cancellation
//!
//! Runs are never cancelled unless the caller asks for it:
//!
//! ```rust,no_run
//! # use dirscan_engine::{ClientOptions, CommandBackend, DirectoryScanner, ScanConfig, ScanLog};
//! # let scanner = DirectoryScanner::new(
//! #     CommandBackend::new("v1fs-scan", ClientOptions::default()),
//! #     ScanConfig::new("."),
//! #     ScanLog::sink(),
//! # );
//! let token = scanner.cancellation_token();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     token.cancel();
//! });
//! ```

mod backend;
mod invoker;
mod limiter;
mod log;
mod scanner;
mod stats;
mod tracker;
mod walker;

pub use backend::{AUTH_FAILURE_EXIT_CODE, CommandBackend, ScanBackend, validate_credentials};
pub use invoker::{FileOutcome, scan_file};
pub use limiter::{AdmissionLimiter, AdmissionPermit};
pub use log::ScanLog;
pub use scanner::{DirectoryScanner, RunContext};
pub use stats::{RunStats, RunSummary};
pub use tracker::{PendingGuard, PendingTracker};

// Re-export core types for convenience
pub use dirscan_core::{
    BackendError, ClientOptions, Concurrency, ConfigError, Endpoint, FileScanError, FoundMalware,
    ScanConfig, ScanError, ScanResult, TagSet, Verdict,
};
