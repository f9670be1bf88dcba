//! Recursive directory traversal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::ScanBackend;
use crate::invoker::{FileOutcome, scan_file};
use crate::scanner::RunContext;
use crate::tracker::PendingGuard;

/// Spawn a task that enumerates `dir`.
///
/// `guard` was registered by the caller before spawning and is released once
/// the directory's own entries have been dispatched, not when its subtree
/// finishes.
pub(crate) fn spawn_walk<B: ScanBackend>(
    ctx: Arc<RunContext<B>>,
    dir: PathBuf,
    guard: PendingGuard,
) {
    tokio::spawn(async move {
        walk_dir(&ctx, &dir).await;
        guard.done();
    });
}

/// Spawn a task that scans one file.
fn spawn_scan<B: ScanBackend>(ctx: Arc<RunContext<B>>, path: PathBuf, guard: PendingGuard) {
    tokio::spawn(async move {
        match scan_file(&ctx, &path).await {
            Ok(FileOutcome::Scanned(_)) | Ok(FileOutcome::Skipped { .. }) => {}
            Err(e) if !e.reached_scanner() => {
                tracing::warn!(path = %path.display(), error = %e, "file not scanned");
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error scanning file");
            }
        }
        guard.done();
    });
}

async fn walk_dir<B: ScanBackend>(ctx: &Arc<RunContext<B>>, dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(path = %dir.display(), error = %e, "Error reading directory");
            return;
        }
    };

    loop {
        if ctx.cancel_token().is_cancelled() {
            tracing::debug!(path = %dir.display(), "traversal cancelled");
            return;
        }

        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(path = %dir.display(), error = %e, "Error reading directory");
                return;
            }
        };

        let path = entry.path();
        // Symlinks report their own type here, so they are never followed
        // as directories.
        let is_dir = match entry.file_type().await {
            Ok(file_type) => file_type.is_dir(),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot read entry type");
                false
            }
        };

        let guard = ctx.tracker().register();
        if is_dir {
            spawn_walk(Arc::clone(ctx), path, guard);
        } else {
            spawn_scan(Arc::clone(ctx), path, guard);
        }
    }
}
