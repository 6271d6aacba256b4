//! Scan → resolve → archive driver
//!
//! One [`Pipeline`] value drives one run. Stages only move forward; any
//! failure parks the pipeline in [`Stage::Error`] and a new run starts over
//! with a fresh scan.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::core::archive::{self, ArchiveError, ArchiveManifest, ArchiveReport, DuplicatePolicy};
use crate::core::entry::FileEntry;
use crate::core::inventory::{self, InventoryError};
use crate::core::progress::ProgressObserver;
use crate::core::resolve::{self, PartResolution, SelectionPolicy};
use crate::core::scan::{self, ScanError, ScanStats};
use crate::core::store::FolderStore;
use crate::core::workspace::{Workspace, WorkspaceError};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Scanning,
    Scanned,
    Resolving,
    Resolved,
    Archiving,
    Done,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Scanning => "scanning",
            Stage::Scanned => "scanned",
            Stage::Resolving => "resolving",
            Stage::Resolved => "resolved",
            Stage::Archiving => "archiving",
            Stage::Done => "done",
            Stage::Error => "error",
        };
        f.write_str(s)
    }
}

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("nothing to do: {0}")]
    NothingToDo(String),

    #[error("cannot start {requested} while the pipeline is {current}")]
    OutOfOrder { current: Stage, requested: Stage },
}

/// Policies applied by a run
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub selection: SelectionPolicy,
    pub duplicates: DuplicatePolicy,
}

/// Files produced by a complete run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub inventory: PathBuf,
    pub scan: ScanStats,
    pub resolution: PathBuf,
    pub resolutions: Vec<PartResolution>,
    pub archive: ArchiveReport,
}

/// Linear scan → resolve → archive state machine
#[derive(Debug)]
pub struct Pipeline {
    workspace: Workspace,
    options: PipelineOptions,
    stage: Stage,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl Pipeline {
    pub fn new(workspace: Workspace, options: PipelineOptions) -> Self {
        Self {
            workspace,
            options,
            stage: Stage::Idle,
            clock: local_now,
        }
    }

    /// Use a fixed clock for file names
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, expected: Stage, next: Stage) -> Result<(), PipelineError> {
        if self.stage != expected {
            return Err(PipelineError::OutOfOrder {
                current: self.stage,
                requested: next,
            });
        }
        info!(from = %self.stage, to = %next, "pipeline stage");
        self.stage = next;
        Ok(())
    }

    fn finish<T>(&mut self, result: Result<T, PipelineError>, next: Stage) -> Result<T, PipelineError> {
        self.stage = if result.is_ok() { next } else { Stage::Error };
        info!(stage = %self.stage, "pipeline stage");
        result
    }

    /// Scan `root` and write a new inventory into `Lists/`
    pub fn scan<S, O>(
        &mut self,
        store: &S,
        root: &S::Folder,
        observer: &mut O,
    ) -> Result<(PathBuf, Vec<FileEntry>, ScanStats), PipelineError>
    where
        S: FolderStore,
        O: ProgressObserver + ?Sized,
    {
        self.enter(Stage::Idle, Stage::Scanning)?;
        let result = self.scan_inner(store, root, observer);
        self.finish(result, Stage::Scanned)
    }

    fn scan_inner<S, O>(
        &self,
        store: &S,
        root: &S::Folder,
        observer: &mut O,
    ) -> Result<(PathBuf, Vec<FileEntry>, ScanStats), PipelineError>
    where
        S: FolderStore,
        O: ProgressObserver + ?Sized,
    {
        self.workspace.ensure_dirs()?;
        let outcome = scan::scan(store, root, observer)?;
        let path = inventory::write_new(&outcome.entries, &self.workspace.lists_dir(), (self.clock)())?;
        Ok((path, outcome.entries, outcome.stats))
    }

    /// Resolve `requested` against the most recent inventory and write
    /// the result into `Files/`
    pub fn resolve(
        &mut self,
        requested: &[String],
    ) -> Result<(PathBuf, Vec<PartResolution>), PipelineError> {
        self.enter(Stage::Scanned, Stage::Resolving)?;
        let result = self.resolve_inner(requested);
        self.finish(result, Stage::Resolved)
    }

    fn resolve_inner(&self, requested: &[String]) -> Result<(PathBuf, Vec<PartResolution>), PipelineError> {
        if requested.is_empty() {
            return Err(PipelineError::NothingToDo("no part numbers entered".to_string()));
        }
        let latest = inventory::most_recent(&self.workspace.lists_dir()).ok_or_else(|| {
            PipelineError::NothingToDo("no inventory found in the Lists folder".to_string())
        })?;
        let records = inventory::read_all(&latest)?;
        let resolutions = resolve::resolve(&records, requested, self.options.selection);
        let path = resolve::write_new_resolutions(&resolutions, &self.workspace.files_dir(), (self.clock)())?;
        Ok((path, resolutions))
    }

    /// Package the resolved files into a new archive in `ZIP/`
    pub fn archive(&mut self, resolutions: &[PartResolution]) -> Result<ArchiveReport, PipelineError> {
        self.enter(Stage::Resolved, Stage::Archiving)?;
        let result = self.archive_inner(resolutions);
        self.finish(result, Stage::Done)
    }

    fn archive_inner(&self, resolutions: &[PartResolution]) -> Result<ArchiveReport, PipelineError> {
        let manifest = ArchiveManifest::from_resolutions(resolutions, self.options.duplicates)?;
        if manifest.is_empty() {
            return Err(PipelineError::NothingToDo(
                "none of the resolved files exist locally".to_string(),
            ));
        }
        let destination = self
            .workspace
            .zip_dir()
            .join(archive::archive_file_name((self.clock)()));
        Ok(archive::write_manifest(manifest, &destination)?)
    }

    /// Run all three stages
    pub fn run<S, O>(
        &mut self,
        store: &S,
        root: &S::Folder,
        requested: &[String],
        observer: &mut O,
    ) -> Result<PipelineOutcome, PipelineError>
    where
        S: FolderStore,
        O: ProgressObserver + ?Sized,
    {
        let (inventory, _entries, scan) = self.scan(store, root, observer)?;
        let (resolution, resolutions) = self.resolve(requested)?;
        let archive = self.archive(&resolutions)?;
        Ok(PipelineOutcome {
            inventory,
            scan,
            resolution,
            resolutions,
            archive,
        })
    }
}
