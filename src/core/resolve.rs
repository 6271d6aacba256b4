//! Part-number resolution
//!
//! For each requested part number, pick the newest `.x_t` model and the
//! newest `.pdf` drawing recorded in an inventory.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::entry::{unknown_modified, DocumentKind, InventoryRecord};
use crate::core::inventory::{self, line_of, open_reader, write_atomic, InventoryError};

/// Header row of a resolution file
pub const RESOLUTION_HEADER: [&str; 3] = [
    "Part Number",
    "Most Updated x_t File",
    "Most Updated pdf File",
];

/// File name prefix of resolution files
pub const RESOLUTION_PREFIX: &str = "PNFiles_";

/// How the newest model and drawing are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Newest model and newest drawing, tracked separately
    #[default]
    Independent,
    /// Legacy behaviour: one "newest so far" threshold shared by both kinds,
    /// so a newer drawing can hide an older model that follows it
    SharedThreshold,
}

/// Newest files found for one requested part number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartResolution {
    pub part_number: String,
    pub best_xt: Option<PathBuf>,
    pub best_pdf: Option<PathBuf>,
}

impl PartResolution {
    /// True when neither a model nor a drawing was found
    pub fn is_empty(&self) -> bool {
        self.best_xt.is_none() && self.best_pdf.is_none()
    }

    /// Found paths, model first
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.best_xt
            .iter()
            .chain(self.best_pdf.iter())
            .map(PathBuf::as_path)
    }
}

/// Split free text into part numbers, one per line
///
/// Lines are trimmed and blank lines dropped; order and duplicates are kept.
pub fn parse_part_numbers(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn same_part(requested: &str, recorded: &str) -> bool {
    requested == recorded || requested.to_lowercase() == recorded.to_lowercase()
}

#[derive(Default)]
struct Best<'a> {
    path: Option<&'a Path>,
    modified: Option<NaiveDateTime>,
}

impl<'a> Best<'a> {
    /// Rows with an unknown modification time never beat the empty state
    fn is_beaten_by(&self, modified: NaiveDateTime) -> bool {
        modified > self.modified.unwrap_or_else(unknown_modified)
    }

    fn take(&mut self, path: &'a Path, modified: NaiveDateTime) {
        self.path = Some(path);
        self.modified = Some(modified);
    }
}

fn resolve_one(inventory: &[InventoryRecord], part_number: &str, policy: SelectionPolicy) -> PartResolution {
    let mut xt = Best::default();
    let mut pdf = Best::default();
    let mut shared = unknown_modified();

    for row in inventory.iter().filter(|r| same_part(part_number, &r.part_number)) {
        let Some(kind) = DocumentKind::from_path(&row.path) else {
            continue;
        };
        let best = match kind {
            DocumentKind::Model => &mut xt,
            DocumentKind::Drawing => &mut pdf,
        };

        match policy {
            SelectionPolicy::Independent => {
                if best.is_beaten_by(row.last_modified) {
                    best.take(&row.path, row.last_modified);
                }
            }
            SelectionPolicy::SharedThreshold => {
                if row.last_modified > shared {
                    best.take(&row.path, row.last_modified);
                    shared = row.last_modified;
                }
            }
        }
    }

    PartResolution {
        part_number: part_number.to_string(),
        best_xt: xt.path.map(Path::to_path_buf),
        best_pdf: pdf.path.map(Path::to_path_buf),
    }
}

/// Resolve every requested part number against `inventory`
///
/// One result per request, in request order; duplicates are not merged.
pub fn resolve(
    inventory: &[InventoryRecord],
    requested: &[String],
    policy: SelectionPolicy,
) -> Vec<PartResolution> {
    requested
        .iter()
        .map(|pn| resolve_one(inventory, pn, policy))
        .collect()
}

/// Name of the resolution file written at `now`
pub fn resolution_file_name(now: NaiveDateTime) -> String {
    format!("{}{}.csv", RESOLUTION_PREFIX, now.format("%d-%m-%Y-%H-%M"))
}

fn path_field(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write resolutions to `path`; missing files become empty fields
pub fn write_resolutions(records: &[PartResolution], path: &Path) -> Result<(), InventoryError> {
    let rows = records.iter().map(|r| {
        vec![
            r.part_number.clone(),
            path_field(&r.best_xt),
            path_field(&r.best_pdf),
        ]
    });
    write_atomic(path, &RESOLUTION_HEADER, rows)
}

/// Write resolutions into `dir` under a timestamped name
pub fn write_new_resolutions(
    records: &[PartResolution],
    dir: &Path,
    now: NaiveDateTime,
) -> Result<PathBuf, InventoryError> {
    let path = dir.join(resolution_file_name(now));
    write_resolutions(records, &path)?;
    Ok(path)
}

/// Read a resolution file back
pub fn read_resolutions(path: &Path) -> Result<Vec<PartResolution>, InventoryError> {
    let mut reader = open_reader(path)?;
    let mut records = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| InventoryError::csv(path, e))?;
        if record.len() < RESOLUTION_HEADER.len() {
            return Err(InventoryError::Parse {
                path: path.to_path_buf(),
                line: line_of(&record, index),
                reason: format!(
                    "expected {} fields, found {}",
                    RESOLUTION_HEADER.len(),
                    record.len()
                ),
            });
        }
        let optional = |i: usize| {
            let value = record.get(i).unwrap_or("").trim();
            (!value.is_empty()).then(|| PathBuf::from(value))
        };
        records.push(PartResolution {
            part_number: record.get(0).unwrap_or("").to_string(),
            best_xt: optional(1),
            best_pdf: optional(2),
        });
    }

    Ok(records)
}

/// Most recent resolution file in `dir`
pub fn most_recent_resolution(dir: &Path) -> Option<PathBuf> {
    inventory::most_recent_matching(dir, RESOLUTION_PREFIX, ".csv")
}
