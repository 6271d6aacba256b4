//! Inventory CSV files
//!
//! Each scan writes one immutable `Files<DD-MM-YYYY-HH-mm>.csv` into the
//! workspace `Lists/` folder:
//!
//! ```text
//! File Name,File Path,Last Modified,IsProd,Revision,Part Number
//! PN-1001_RevB.pdf,C:\Vault\PN-1001_RevB.pdf,2024-03-01 14:05:09,1,B,PN-1001
//! ```
//!
//! Files are written to a temporary path and renamed into place when
//! complete, so an interrupted scan never leaves a loadable inventory.

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::core::entry::{FileEntry, InventoryRecord, TIMESTAMP_FORMAT};

/// Header row of an inventory file
pub const INVENTORY_HEADER: [&str; 6] = [
    "File Name",
    "File Path",
    "Last Modified",
    "IsProd",
    "Revision",
    "Part Number",
];

/// File name prefix of inventory files
pub const INVENTORY_PREFIX: &str = "Files";

/// Errors reading or writing inventory-style CSV files
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

impl InventoryError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        InventoryError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        InventoryError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Name of the inventory file for a scan started at `now`
pub fn inventory_file_name(now: NaiveDateTime) -> String {
    format!("{}{}.csv", INVENTORY_PREFIX, now.format("%d-%m-%Y-%H-%M"))
}

/// Write `rows` as CSV to `path` atomically
///
/// The rows are written to a temporary file next to `path` which replaces
/// `path` only after everything was flushed.
pub(crate) fn write_atomic<I>(path: &Path, header: &[&str], rows: I) -> Result<(), InventoryError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| InventoryError::io(&dir, e))?;

    let tmp = NamedTempFile::new_in(&dir).map_err(|e| InventoryError::io(&dir, e))?;
    {
        let mut writer = WriterBuilder::new().from_writer(tmp.as_file());
        writer
            .write_record(header)
            .map_err(|e| InventoryError::csv(path, e))?;
        for row in rows {
            writer
                .write_record(&row)
                .map_err(|e| InventoryError::csv(path, e))?;
        }
        writer
            .flush()
            .map_err(|e| InventoryError::io(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| InventoryError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| InventoryError::io(path, e.error))?;
    Ok(())
}

fn to_row(entry: &FileEntry) -> Vec<String> {
    vec![
        entry.name.clone(),
        entry.path.to_string_lossy().into_owned(),
        entry.last_modified.format(TIMESTAMP_FORMAT).to_string(),
        if entry.is_production { "1" } else { "0" }.to_string(),
        entry.revision.map(String::from).unwrap_or_default(),
        entry.part_number.clone(),
    ]
}

/// Write scanned entries to an inventory file at `path`
pub fn write(entries: &[FileEntry], path: &Path) -> Result<(), InventoryError> {
    write_atomic(path, &INVENTORY_HEADER, entries.iter().map(to_row))
}

/// Write scanned entries into `dir` under a timestamped name
pub fn write_new(
    entries: &[FileEntry],
    dir: &Path,
    now: NaiveDateTime,
) -> Result<PathBuf, InventoryError> {
    let path = dir.join(inventory_file_name(now));
    write(entries, &path)?;
    Ok(path)
}

/// Open a CSV file with a header row, tolerating ragged rows
pub(crate) fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, InventoryError> {
    let file = fs::File::open(path).map_err(|e| InventoryError::io(path, e))?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

/// 1-based line number of a record, falling back to its index
pub(crate) fn line_of(record: &StringRecord, index: usize) -> u64 {
    record
        .position()
        .map(|p| p.line())
        .unwrap_or(index as u64 + 2)
}

fn parse_row(path: &Path, line: u64, record: &StringRecord) -> Result<InventoryRecord, InventoryError> {
    let parse_err = |reason: String| InventoryError::Parse {
        path: path.to_path_buf(),
        line,
        reason,
    };

    if record.len() < INVENTORY_HEADER.len() {
        return Err(parse_err(format!(
            "expected {} fields, found {}",
            INVENTORY_HEADER.len(),
            record.len()
        )));
    }

    let field = |i: usize| record.get(i).unwrap_or("");

    let last_modified = NaiveDateTime::parse_from_str(field(2).trim(), TIMESTAMP_FORMAT)
        .map_err(|e| parse_err(format!("invalid timestamp '{}': {}", field(2), e)))?;

    let is_production = match field(3).trim() {
        "1" => true,
        "0" | "" => false,
        other => return Err(parse_err(format!("invalid IsProd value '{}'", other))),
    };

    let revision = {
        let mut chars = field(4).trim().chars();
        match (chars.next(), chars.next()) {
            (None, _) => None,
            (Some(c), None) => Some(c),
            _ => return Err(parse_err(format!("invalid revision '{}'", field(4)))),
        }
    };

    Ok(InventoryRecord {
        name: field(0).to_string(),
        path: PathBuf::from(field(1)),
        last_modified,
        is_production,
        revision,
        part_number: field(5).to_string(),
    })
}

/// Read every row of an inventory file
///
/// Aborts on the first malformed row.
pub fn read_all(path: &Path) -> Result<Vec<InventoryRecord>, InventoryError> {
    let mut reader = open_reader(path)?;
    let mut records = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| InventoryError::csv(path, e))?;
        let line = line_of(&record, index);
        records.push(parse_row(path, line, &record)?);
    }

    Ok(records)
}

/// Most recently modified file in `dir` named `<prefix>*<suffix>`
///
/// Returns `None` when the directory is missing or holds no candidate.
/// Equal modification times are broken by the greater file name.
pub fn most_recent_matching(dir: &Path, prefix: &str, suffix: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;

    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) || !name.to_lowercase().ends_with(suffix) {
                return None;
            }
            let modified = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, name, e.path()))
        })
        .max_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)))
        .map(|(_, _, path)| path)
}

/// Most recent inventory file in `dir`
pub fn most_recent(dir: &Path) -> Option<PathBuf> {
    most_recent_matching(dir, INVENTORY_PREFIX, ".csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::unknown_modified;
    use chrono::NaiveDate;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn sample_entries() -> Vec<FileEntry> {
        vec![
            FileEntry::from_listing(
                "PN-1001_RevB.pdf",
                PathBuf::from("/cache/PN-1001_RevB.pdf"),
                ts(2024, 3, 1, 14, 5, 9),
            ),
            FileEntry::from_listing(
                "PN-1001.x_t",
                PathBuf::from("/cache/wip/PN-1001.x_t"),
                ts(2024, 3, 2, 8, 0, 0),
            ),
            FileEntry::from_listing(
                "odd, name_RevC.pdf",
                PathBuf::from("/cache/odd, name_RevC.pdf"),
                unknown_modified(),
            ),
        ]
    }

    #[test]
    fn test_inventory_file_name() {
        assert_eq!(
            inventory_file_name(ts(2024, 3, 1, 14, 5, 9)),
            "Files01-03-2024-14-05.csv"
        );
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("Files01-03-2024-14-05.csv");
        let entries = sample_entries();

        write(&entries, &path).unwrap();
        let records = read_all(&path).unwrap();
        assert_eq!(records, entries);
    }

    #[test]
    fn test_write_format() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("inv.csv");
        write(&sample_entries()[..2], &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "File Name,File Path,Last Modified,IsProd,Revision,Part Number",
                "PN-1001_RevB.pdf,/cache/PN-1001_RevB.pdf,2024-03-01 14:05:09,1,B,PN-1001",
                "PN-1001.x_t,/cache/wip/PN-1001.x_t,2024-03-02 08:00:00,0,,PN-1001.x_t",
            ]
        );
    }

    #[test]
    fn test_write_creates_directory_and_leaves_no_temp_files() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("Lists");
        let path = write_new(&sample_entries(), &dir, ts(2024, 1, 2, 3, 4, 5)).unwrap();

        assert_eq!(path, dir.join("Files02-01-2024-03-04.csv"));
        let names: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_read_short_row_is_parse_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("bad.csv");
        fs::write(
            &path,
            "File Name,File Path,Last Modified,IsProd,Revision,Part Number\n\
             a.pdf,/a.pdf,2024-01-01 00:00:00,0,,a.pdf\n\
             b.pdf,/b.pdf,2024-01-01 00:00:00\n",
        )
        .unwrap();

        let err = read_all(&path).unwrap_err();
        match err {
            InventoryError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_bad_timestamp_is_parse_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("bad.csv");
        fs::write(
            &path,
            "File Name,File Path,Last Modified,IsProd,Revision,Part Number\n\
             a.pdf,/a.pdf,yesterday,0,,a.pdf\n",
        )
        .unwrap();

        assert!(matches!(
            read_all(&path),
            Err(InventoryError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_all(Path::new("/nonexistent/Files.csv")).unwrap_err();
        assert!(matches!(err, InventoryError::Io { .. }));
    }

    #[test]
    fn test_most_recent_missing_dir() {
        assert_eq!(most_recent(Path::new("/nonexistent/Lists")), None);
    }

    #[test]
    fn test_most_recent_empty_dir() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        fs::write(tmp.path().join("PNFiles_01-01-2024-00-00.csv"), "x").unwrap();
        assert_eq!(most_recent(tmp.path()), None);
    }

    #[test]
    fn test_most_recent_picks_newest_modification() {
        let tmp = tempdir().unwrap();
        let older = tmp.path().join("Files31-12-2030-00-00.csv");
        let newer = tmp.path().join("Files01-01-2024-00-00.csv");
        fs::write(&older, "x").unwrap();
        fs::write(&newer, "x").unwrap();

        // The file name is not the ordering key: modification time is
        let base = SystemTime::now();
        fs::File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(base - Duration::from_secs(3600))
            .unwrap();
        fs::File::options()
            .write(true)
            .open(&newer)
            .unwrap()
            .set_modified(base)
            .unwrap();

        assert_eq!(most_recent(tmp.path()), Some(newer));
    }
}
