//! Two-pass folder traversal
//!
//! Pass one counts every file in the tree so progress can be scaled; pass
//! two visits folders depth-first (a folder's own files, then each
//! subfolder), fetches each drawing or model into the local cache and
//! records a [`FileEntry`] for it.

use std::fs;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::entry::{local_timestamp, unknown_modified, DocumentKind, FileEntry};
use crate::core::progress::{ProgressEvent, ProgressObserver, ProgressReporter};
use crate::core::store::{FolderStore, StoreError, StoreFile};

/// Errors that abort a scan
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters collected during a scan
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScanStats {
    /// Files counted in the first pass
    pub total_files: usize,
    /// Files visited in the second pass
    pub visited: usize,
    /// Drawings and models recorded
    pub matched: usize,
    /// Recorded files whose cache fetch failed
    pub fetch_failures: usize,
    /// Wall-clock time of the visit pass
    pub duration: Duration,
}

/// Result of a completed scan
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub entries: Vec<FileEntry>,
    pub stats: ScanStats,
}

/// Count all files below `folder`, whatever their extension
pub fn count_files<S: FolderStore>(store: &S, folder: &S::Folder) -> Result<usize, StoreError> {
    let mut count = store.list_files(folder)?.len();
    for sub in store.list_subfolders(folder)? {
        count += count_files(store, &sub)?;
    }
    Ok(count)
}

/// Per-run traversal state, owned by one `scan` call
struct ScanContext<'a, O: ProgressObserver + ?Sized> {
    reporter: ProgressReporter,
    observer: &'a mut O,
    total: usize,
    processed: usize,
    entries: Vec<FileEntry>,
    fetch_failures: usize,
}

impl<O: ProgressObserver + ?Sized> ScanContext<'_, O> {
    fn advance(&mut self) {
        self.processed += 1;
        if self.processed > self.total {
            // The tree grew between the two passes
            warn!(
                processed = self.processed,
                total = self.total,
                "more files than counted; extending total"
            );
            self.total = self.processed;
        }
        let tick = self.reporter.tick(self.processed, self.total);
        self.observer.on_progress(ProgressEvent {
            processed: self.processed,
            total: self.total,
            elapsed: tick.elapsed,
            remaining: tick.remaining,
        });
    }
}

/// Scan `root` and return every `.pdf` / `.x_t` file below it
///
/// Listing failures abort the scan. A failed fetch does not: the entry is
/// still recorded from its name, with an unknown modification time.
pub fn scan<S, O>(store: &S, root: &S::Folder, observer: &mut O) -> Result<ScanOutcome, ScanError>
where
    S: FolderStore,
    O: ProgressObserver + ?Sized,
{
    let total = count_files(store, root)?;
    info!(total, "counted files to scan");

    let mut ctx = ScanContext {
        reporter: ProgressReporter::new(),
        observer,
        total,
        processed: 0,
        entries: Vec::new(),
        fetch_failures: 0,
    };
    ctx.reporter.start();
    visit(store, root, &mut ctx)?;
    ctx.reporter.stop();

    let stats = ScanStats {
        total_files: total,
        visited: ctx.processed,
        matched: ctx.entries.len(),
        fetch_failures: ctx.fetch_failures,
        duration: ctx.reporter.elapsed(),
    };
    info!(
        visited = stats.visited,
        matched = stats.matched,
        fetch_failures = stats.fetch_failures,
        "scan complete"
    );

    Ok(ScanOutcome {
        entries: ctx.entries,
        stats,
    })
}

fn visit<S, O>(store: &S, folder: &S::Folder, ctx: &mut ScanContext<'_, O>) -> Result<(), ScanError>
where
    S: FolderStore,
    O: ProgressObserver + ?Sized,
{
    for file in store.list_files(folder)? {
        debug!(name = %file.name, "processing file");
        if DocumentKind::from_name(&file.name).is_some() {
            let entry = record(store, &file, &mut ctx.fetch_failures);
            ctx.entries.push(entry);
        }
        ctx.advance();
    }

    for sub in store.list_subfolders(folder)? {
        visit(store, &sub, ctx)?;
    }
    Ok(())
}

fn record<S: FolderStore>(store: &S, file: &StoreFile, failures: &mut usize) -> FileEntry {
    let last_modified = match store.fetch(file) {
        Ok(()) => match fs::metadata(&file.local_path).and_then(|m| m.modified()) {
            Ok(time) => local_timestamp(time),
            Err(e) => {
                warn!(path = %file.local_path.display(), error = %e, "file not found after fetch");
                unknown_modified()
            }
        },
        Err(e) => {
            warn!(error = %e, "fetch failed, recording entry without modification time");
            *failures += 1;
            unknown_modified()
        }
    };
    FileEntry::from_listing(&file.name, file.local_path.clone(), last_modified)
}
