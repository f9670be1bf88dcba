//! Run entry point.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use dirscan_core::{ScanConfig, ScanError};

use crate::backend::ScanBackend;
use crate::limiter::AdmissionLimiter;
use crate::log::ScanLog;
use crate::stats::{RunStats, RunSummary};
use crate::tracker::PendingTracker;
use crate::walker;

/// Shared state for one run, referenced by every task.
#[derive(Debug)]
pub struct RunContext<B> {
    backend: B,
    config: ScanConfig,
    limiter: AdmissionLimiter,
    tracker: PendingTracker,
    stats: RunStats,
    log: ScanLog,
    cancel: CancellationToken,
}

impl<B: ScanBackend> RunContext<B> {
    /// Create the context for a run over `config.root`.
    pub fn new(backend: B, config: ScanConfig, log: ScanLog) -> Self {
        Self {
            backend,
            limiter: AdmissionLimiter::new(config.concurrency),
            config,
            tracker: PendingTracker::new(),
            stats: RunStats::new(),
            log,
            cancel: CancellationToken::new(),
        }
    }

    /// The scanning backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Admission gate for scan calls.
    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Pending-work tracker.
    pub fn tracker(&self) -> &PendingTracker {
        &self.tracker
    }

    /// Run counters.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Scan log.
    pub fn log(&self) -> &ScanLog {
        &self.log
    }

    /// Token that stops the run when cancelled. Never cancelled by the engine.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Scans a directory tree through a [`ScanBackend`].
#[derive(Debug)]
pub struct DirectoryScanner<B> {
    ctx: Arc<RunContext<B>>,
}

impl<B: ScanBackend> DirectoryScanner<B> {
    /// Create a scanner.
    pub fn new(backend: B, config: ScanConfig, log: ScanLog) -> Self {
        Self {
            ctx: Arc::new(RunContext::new(backend, config, log)),
        }
    }

    /// Token that cancels in-flight scans and stops traversal.
    ///
    /// Nothing cancels it unless the caller does.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// Shared run state.
    pub fn context(&self) -> &RunContext<B> {
        &self.ctx
    }

    /// Live counters.
    pub fn stats(&self) -> &RunStats {
        &self.ctx.stats
    }

    /// Walk the configured root and scan every file below it.
    ///
    /// Only an unusable root fails the run. Per-directory and per-file
    /// errors are logged and leave the counters accurate for everything
    /// that was scanned. Counters are cumulative across calls.
    pub async fn run(&self) -> Result<RunSummary, ScanError> {
        let root = self.ctx.config.root.clone();
        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|e| ScanError::io(&root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }

        tracing::info!(
            root = %root.display(),
            max_workers = %self.ctx.config.concurrency,
            tags = self.ctx.config.tags.len(),
            "starting scan"
        );

        let start = Instant::now();
        let guard = self.ctx.tracker.register();
        walker::spawn_walk(Arc::clone(&self.ctx), root, guard);
        self.ctx.tracker.wait().await;

        let summary = self.ctx.stats.snapshot(start.elapsed());
        if let Err(e) = self.ctx.log.write_summary(&summary) {
            tracing::error!(error = %e, "failed to write scan summary");
        }
        tracing::info!(
            total_scanned = summary.total_scanned,
            files_with_malware = summary.files_with_malware,
            files_clean = summary.files_clean,
            elapsed = ?summary.elapsed,
            "scan complete"
        );

        Ok(summary)
    }
}
