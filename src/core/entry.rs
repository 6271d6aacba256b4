//! Scanned file entries and the document kinds the inventory tracks

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::extract::extract;

/// Timestamp layout used in every CSV this tool writes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sentinel recorded when a file's modification time is unknown
pub fn unknown_modified() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Convert a filesystem time to local wall-clock time, truncated to seconds
pub fn local_timestamp(time: SystemTime) -> NaiveDateTime {
    let local: DateTime<Local> = time.into();
    let naive = local.naive_local();
    naive.with_nanosecond(0).unwrap_or(naive)
}

/// Document kinds tracked by the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// `.pdf` drawing
    Drawing,
    /// `.x_t` Parasolid model
    Model,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Model, DocumentKind::Drawing];

    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Drawing => ".pdf",
            DocumentKind::Model => ".x_t",
        }
    }

    /// Classify a file name or path by its (case-insensitive) extension
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| ends_with_ignore_case(name, kind.extension()))
    }

    /// Classify a path by its (case-insensitive) extension
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_name(&path.to_string_lossy())
    }
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// One scanned drawing or model
///
/// This is also the row shape of an inventory file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// File name as listed by the store
    pub name: String,

    /// Local cache path
    pub path: PathBuf,

    /// Last modification time (local time, second precision)
    pub last_modified: NaiveDateTime,

    /// True when the name carries a revision token
    pub is_production: bool,

    /// Revision letter
    pub revision: Option<char>,

    /// Part number (never empty)
    pub part_number: String,
}

/// An inventory row is a scanned entry read back from disk
pub type InventoryRecord = FileEntry;

impl FileEntry {
    /// Build an entry from a listed file, deriving metadata from its name
    pub fn from_listing(name: &str, path: PathBuf, last_modified: NaiveDateTime) -> Self {
        let meta = extract(name);
        Self {
            name: name.to_string(),
            path,
            last_modified,
            is_production: meta.is_production,
            revision: meta.revision,
            part_number: meta.part_number,
        }
    }

    /// Document kind of this entry's local path
    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_path(&self.path)
    }

    /// True when the modification time could not be read
    pub fn has_unknown_modified(&self) -> bool {
        self.last_modified == unknown_modified()
    }
}
