//! Scan of a single file.

use std::borrow::Cow;
use std::path::Path;
use std::time::{Duration, Instant};

use humansize::{BINARY, format_size};

use dirscan_core::{BackendError, FileScanError, ScanResult};

use crate::backend::ScanBackend;
use crate::scanner::RunContext;

/// What happened to a file that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The scan completed and its verdict parsed.
    Scanned(ScanResult),
    /// The file was above the size ceiling and never submitted.
    Skipped { size: u64 },
}

/// Scan one file through the run's backend.
///
/// Oversized files are skipped before taking an admission slot. Every call
/// that reaches the backend counts towards `total_scanned`, whether or not
/// it succeeds; only parsed verdicts are classified. The slot is released
/// before the log lines are written.
pub async fn scan_file<B: ScanBackend>(
    ctx: &RunContext<B>,
    path: &Path,
) -> Result<FileOutcome, FileScanError> {
    let config = ctx.config();
    // Follows symlinks, so a dangling link fails here and is never
    // submitted or counted.
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|source| FileScanError::Metadata {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if config.exceeds_size_limit(size) {
        tracing::info!(
            path = %path.display(),
            size = %format_size(size, BINARY),
            "skipping file above size limit"
        );
        return Ok(FileOutcome::Skipped { size });
    }

    let cancel = ctx.cancel_token();
    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = ctx.limiter().acquire() => Some(permit),
    };
    let Some(permit) = permit else {
        return Err(cancelled(path));
    };

    if config.verbose {
        println!("Scanning: {}", path.display());
    }

    let start = Instant::now();
    let call = call_backend(ctx, path, config.scan_timeout);
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        response = call => Some(response),
    };
    permit.release();
    let Some(response) = response else {
        return Err(cancelled(path));
    };

    ctx.stats().record_scanned();

    let outcome = response
        .map_err(|source| FileScanError::Backend {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|raw| {
            let result = ScanResult::from_json(&raw).map_err(|source| FileScanError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            Ok((raw, result))
        });
    let elapsed = start.elapsed();

    let scanned_line = format!("Scanned: {}, Duration: {:?}", path.display(), elapsed);
    let written = match &outcome {
        Ok((raw, _)) => ctx
            .log()
            .append_lines(&[scanned_line.as_str(), single_line(raw).as_ref()]),
        Err(_) => ctx.log().append_line(&scanned_line),
    };
    if let Err(e) = written {
        tracing::warn!(path = %path.display(), error = %e, "failed to write scan log");
    }

    let (_, result) = outcome?;
    ctx.stats().record_verdict(result.verdict());
    if result.is_malware() {
        tracing::warn!(
            path = %path.display(),
            malware = ?result.malware_names().collect::<Vec<_>>(),
            "malware found"
        );
    }
    if config.verbose {
        println!("Scanned: {} [scanned in {:?}]", path.display(), elapsed);
    }

    Ok(FileOutcome::Scanned(result))
}

async fn call_backend<B: ScanBackend>(
    ctx: &RunContext<B>,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<String, BackendError> {
    let tags = &ctx.config().tags;
    match timeout {
        Some(limit) => tokio::time::timeout(limit, ctx.backend().scan_file(path, tags))
            .await
            .unwrap_or(Err(BackendError::Timeout { limit })),
        None => ctx.backend().scan_file(path, tags).await,
    }
}

fn cancelled(path: &Path) -> FileScanError {
    FileScanError::Cancelled {
        path: path.to_path_buf(),
    }
}

// Keeps one verdict per log line even if the scanner pretty-prints.
fn single_line(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\n') {
        return Cow::Borrowed(raw);
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => Cow::Owned(value.to_string()),
        Err(_) => Cow::Owned(raw.replace(['\r', '\n'], " ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_passthrough() {
        let raw = r#"{"fileName":"a"}"#;
        assert!(matches!(single_line(raw), Cow::Borrowed(_)));
    }

    #[test]
    fn test_single_line_compacts_pretty_json() {
        let raw = "{\n  \"fileName\": \"a\",\n  \"foundMalwares\": []\n}";
        assert_eq!(single_line(raw), r#"{"fileName":"a","foundMalwares":[]}"#);
    }
}
