//! Core module - the scan, resolve and archive pipeline

pub mod archive;
pub mod config;
pub mod entry;
pub mod extract;
pub mod inventory;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod scan;
pub mod store;
pub mod workspace;

pub use archive::{ArchiveError, ArchiveManifest, ArchiveReport, DuplicatePolicy};
pub use config::Config;
pub use entry::{DocumentKind, FileEntry, InventoryRecord};
pub use extract::{extract, PartMetadata};
pub use inventory::InventoryError;
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, PipelineOutcome, Stage};
pub use progress::{NoProgress, ProgressEvent, ProgressObserver, ProgressReporter};
pub use resolve::{PartResolution, SelectionPolicy};
pub use scan::{ScanError, ScanOutcome, ScanStats};
pub use store::{FolderStore, LocalStore, MemoryStore, StoreError, StoreFile};
pub use workspace::{Workspace, WorkspaceError};
