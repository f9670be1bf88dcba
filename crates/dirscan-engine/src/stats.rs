//! Run statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Serialize, Serializer};

use dirscan_core::Verdict;

/// Counters updated concurrently by every scan task.
///
/// Only final totals matter, so updates are relaxed; the final read is
/// ordered by the completion join.
#[derive(Debug, Default)]
pub struct RunStats {
    total_scanned: AtomicU64,
    files_with_malware: AtomicU64,
    files_clean: AtomicU64,
}

impl RunStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scan call that reached the scanner.
    pub fn record_scanned(&self) {
        self.total_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the classification of a parsed verdict.
    pub fn record_verdict(&self, verdict: Verdict) {
        let counter = match verdict {
            Verdict::Malware => &self.files_with_malware,
            Verdict::Clean => &self.files_clean,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Files whose scan reached the scanner so far.
    pub fn total_scanned(&self) -> u64 {
        self.total_scanned.load(Ordering::Relaxed)
    }

    /// Read all counters together with the run's elapsed time.
    pub fn snapshot(&self, elapsed: Duration) -> RunSummary {
        RunSummary {
            total_scanned: self.total_scanned.load(Ordering::Acquire),
            files_with_malware: self.files_with_malware.load(Ordering::Acquire),
            files_clean: self.files_clean.load(Ordering::Acquire),
            elapsed,
        }
    }
}

/// Final statistics for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files submitted to the scanner.
    pub total_scanned: u64,
    /// Files with at least one malware match.
    pub files_with_malware: u64,
    /// Files with no malware match.
    pub files_clean: u64,
    /// Wall-clock duration of the run.
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Scanned files that got no classification (failed or malformed verdicts).
    pub fn unclassified(&self) -> u64 {
        self.total_scanned
            .saturating_sub(self.files_with_malware + self.files_clean)
    }

    /// Scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.total_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    /// The summary block appended to the scan log.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Scan Time: {:?}", self.elapsed)?;
        writeln!(f, "Total Files Scanned: {}", self.total_scanned)?;
        writeln!(f, "Files with Malware: {}", self.files_with_malware)?;
        write!(f, "Files Clean: {}", self.files_clean)
    }
}

fn as_secs_f64<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
