//! Packaging resolved files into a zip archive
//!
//! The manifest is every model and drawing path named by the resolutions,
//! model first, in resolution order, keeping only files that exist when the
//! archive is built. Entries are stored flat under their base file name.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::core::resolve::PartResolution;

/// What to do when two files share a base name inside the archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Store later files as `name (2).ext`, `name (3).ext`, ...
    #[default]
    Rename,
    /// Keep the first file, skip later ones
    FirstWins,
    /// Fail the build
    Reject,
}

/// Errors raised while building an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("'{name}' would be stored twice ({first} and {second})")]
    DuplicateEntry {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One file to store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub source: PathBuf,
    pub entry_name: String,
}

/// Files to package, after existence and duplicate checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveManifest {
    pub entries: Vec<ManifestEntry>,
    /// Resolved paths that do not exist locally
    pub missing: Vec<PathBuf>,
    /// Files left out by [`DuplicatePolicy::FirstWins`]
    pub skipped: Vec<PathBuf>,
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn numbered_name(name: &str, n: usize) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{} ({}).{}",
            stem.to_string_lossy(),
            n,
            ext.to_string_lossy()
        ),
        _ => format!("{} ({})", name, n),
    }
}

impl ArchiveManifest {
    /// Collect the files named by `records`
    ///
    /// Paths are checked against the filesystem now. A path named by more
    /// than one resolution is stored once. Entry names are compared
    /// case-insensitively.
    pub fn from_resolutions(
        records: &[PartResolution],
        policy: DuplicatePolicy,
    ) -> Result<Self, ArchiveError> {
        let mut manifest = ArchiveManifest::default();
        let mut seen_sources: HashSet<PathBuf> = HashSet::new();
        let mut taken: Vec<(String, PathBuf)> = Vec::new();

        for path in records.iter().flat_map(PartResolution::paths) {
            if !seen_sources.insert(path.to_path_buf()) {
                continue;
            }
            if !path.is_file() {
                debug!(path = %path.display(), "resolved file missing, skipping");
                manifest.missing.push(path.to_path_buf());
                continue;
            }

            let name = base_name(path);
            let is_taken = |candidate: &str| {
                taken
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case(candidate))
                    .map(|(_, src)| src.clone())
            };

            let entry_name = match is_taken(&name) {
                None => name,
                Some(first) => match policy {
                    DuplicatePolicy::Reject => {
                        return Err(ArchiveError::DuplicateEntry {
                            name,
                            first,
                            second: path.to_path_buf(),
                        });
                    }
                    DuplicatePolicy::FirstWins => {
                        warn!(name = %name, path = %path.display(), "duplicate entry name, skipping");
                        manifest.skipped.push(path.to_path_buf());
                        continue;
                    }
                    DuplicatePolicy::Rename => {
                        let mut n = 2;
                        while is_taken(&numbered_name(&name, n)).is_some() {
                            n += 1;
                        }
                        numbered_name(&name, n)
                    }
                },
            };

            taken.push((entry_name.clone(), path.to_path_buf()));
            manifest.entries.push(ManifestEntry {
                source: path.to_path_buf(),
                entry_name,
            });
        }

        Ok(manifest)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add every entry to `writer`
    pub fn write_into<W: ArchiveWriter + ?Sized>(&self, writer: &mut W) -> Result<(), ArchiveError> {
        for entry in &self.entries {
            writer.add_file(&entry.source, &entry.entry_name)?;
        }
        Ok(())
    }
}

/// Append-only archive container
pub trait ArchiveWriter {
    /// Copy the local file `source` into the archive as `entry_name`
    fn add_file(&mut self, source: &Path, entry_name: &str) -> Result<(), ArchiveError>;
}

/// Deflate-compressed zip file
///
/// Written to a temporary file in the destination folder and moved over
/// the destination by [`ZipArchiveWriter::finish`].
pub struct ZipArchiveWriter {
    zip: ZipWriter<NamedTempFile>,
    destination: PathBuf,
    options: SimpleFileOptions,
}

impl ZipArchiveWriter {
    /// Start a new archive that will replace `destination`
    pub fn create(destination: &Path) -> Result<Self, ArchiveError> {
        let dir = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let tmp = NamedTempFile::new_in(&dir).map_err(io_err(&dir))?;

        Ok(Self {
            zip: ZipWriter::new(tmp),
            destination: destination.to_path_buf(),
            options: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .compression_level(Some(6)),
        })
    }

    /// Finish the central directory and move the archive into place
    pub fn finish(self) -> Result<PathBuf, ArchiveError> {
        let tmp = self.zip.finish()?;
        tmp.persist(&self.destination)
            .map_err(|e| io_err(&self.destination)(e.error))?;
        Ok(self.destination)
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_file(&mut self, source: &Path, entry_name: &str) -> Result<(), ArchiveError> {
        let mut file = File::open(source).map_err(io_err(source))?;
        self.zip.start_file(entry_name, self.options)?;
        io::copy(&mut file, &mut self.zip).map_err(io_err(source))?;
        Ok(())
    }
}

/// Outcome of [`build`]
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub destination: PathBuf,
    pub manifest: ArchiveManifest,
}

/// Package the files named by `records` into a new zip at `destination`
///
/// An existing file at `destination` is replaced. Missing files are skipped.
pub fn build(
    records: &[PartResolution],
    destination: &Path,
    policy: DuplicatePolicy,
) -> Result<ArchiveReport, ArchiveError> {
    let manifest = ArchiveManifest::from_resolutions(records, policy)?;
    write_manifest(manifest, destination)
}

/// Write an already collected manifest into a new zip at `destination`
pub fn write_manifest(manifest: ArchiveManifest, destination: &Path) -> Result<ArchiveReport, ArchiveError> {
    let mut writer = ZipArchiveWriter::create(destination)?;
    manifest.write_into(&mut writer)?;
    let destination = writer.finish()?;

    info!(
        destination = %destination.display(),
        files = manifest.entries.len(),
        missing = manifest.missing.len(),
        "archive written"
    );
    Ok(ArchiveReport {
        destination,
        manifest,
    })
}

/// Name of an archive created at `now`
pub fn archive_file_name(now: chrono::NaiveDateTime) -> String {
    format!("ProductionFiles_{}.zip", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    fn resolution(pn: &str, xt: Option<&Path>, pdf: Option<&Path>) -> PartResolution {
        PartResolution {
            part_number: pn.to_string(),
            best_xt: xt.map(Path::to_path_buf),
            best_pdf: pdf.map(Path::to_path_buf),
        }
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_build_skips_missing_files() {
        let tmp = tempdir().unwrap();
        let present = tmp.path().join("A_RevA.pdf");
        fs::write(&present, b"drawing").unwrap();
        let missing = tmp.path().join("A_RevA.x_t");

        let dest = tmp.path().join("ZIP/out.zip");
        let records = vec![resolution("A", Some(&missing), Some(&present))];
        let report = build(&records, &dest, DuplicatePolicy::Rename).unwrap();

        assert_eq!(report.manifest.missing, vec![missing]);
        assert_eq!(entry_names(&dest), vec!["A_RevA.pdf"]);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("A_RevA.pdf")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "drawing");
    }

    #[test]
    fn test_entries_keep_model_then_drawing_order() {
        let tmp = tempdir().unwrap();
        let paths: Vec<_> = ["A_RevA.x_t", "A_RevA.pdf", "B_RevB.x_t", "B_RevB.pdf"]
            .iter()
            .map(|n| {
                let p = tmp.path().join(n);
                fs::write(&p, n).unwrap();
                p
            })
            .collect();
        let records = vec![
            resolution("A", Some(&paths[0]), Some(&paths[1])),
            resolution("B", Some(&paths[2]), Some(&paths[3])),
        ];
        let dest = tmp.path().join("out.zip");
        build(&records, &dest, DuplicatePolicy::Rename).unwrap();
        assert_eq!(
            entry_names(&dest),
            vec!["A_RevA.x_t", "A_RevA.pdf", "B_RevB.x_t", "B_RevB.pdf"]
        );
    }

    fn colliding_files(tmp: &Path) -> (PathBuf, PathBuf) {
        fs::create_dir_all(tmp.join("one")).unwrap();
        fs::create_dir_all(tmp.join("two")).unwrap();
        let first = tmp.join("one/P_RevA.pdf");
        let second = tmp.join("two/P_RevA.pdf");
        fs::write(&first, b"1").unwrap();
        fs::write(&second, b"2").unwrap();
        (first, second)
    }

    #[test]
    fn test_duplicate_names_renamed() {
        let tmp = tempdir().unwrap();
        let (first, second) = colliding_files(tmp.path());
        let records = vec![
            resolution("P", None, Some(&first)),
            resolution("p", None, Some(&second)),
        ];
        let dest = tmp.path().join("out.zip");
        build(&records, &dest, DuplicatePolicy::Rename).unwrap();
        assert_eq!(entry_names(&dest), vec!["P_RevA.pdf", "P_RevA (2).pdf"]);
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let tmp = tempdir().unwrap();
        let (first, second) = colliding_files(tmp.path());
        let records = vec![
            resolution("P", None, Some(&first)),
            resolution("p", None, Some(&second)),
        ];
        let dest = tmp.path().join("out.zip");
        let report = build(&records, &dest, DuplicatePolicy::FirstWins).unwrap();
        assert_eq!(entry_names(&dest), vec!["P_RevA.pdf"]);
        assert_eq!(report.manifest.skipped, vec![second]);
    }

    #[test]
    fn test_duplicate_names_rejected_before_writing() {
        let tmp = tempdir().unwrap();
        let (first, second) = colliding_files(tmp.path());
        let records = vec![
            resolution("P", None, Some(&first)),
            resolution("p", None, Some(&second)),
        ];
        let dest = tmp.path().join("out.zip");
        let err = build(&records, &dest, DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicateEntry { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_same_source_requested_twice_stored_once() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("D_RevA.pdf");
        fs::write(&file, b"d").unwrap();
        let records = vec![
            resolution("D", None, Some(&file)),
            resolution("D", None, Some(&file)),
        ];
        let manifest = ArchiveManifest::from_resolutions(&records, DuplicatePolicy::Reject).unwrap();
        assert_eq!(manifest.entries.len(), 1);
    }

    #[test]
    fn test_existing_destination_is_replaced() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("E_RevA.pdf");
        fs::write(&file, b"e").unwrap();
        let dest = tmp.path().join("out.zip");
        fs::write(&dest, b"not a zip").unwrap();

        build(&[resolution("E", None, Some(&file))], &dest, DuplicatePolicy::Rename).unwrap();
        assert_eq!(entry_names(&dest), vec!["E_RevA.pdf"]);
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("a.x_t", 2), "a (2).x_t");
        assert_eq!(numbered_name("README", 3), "README (3)");
    }

    #[test]
    fn test_archive_file_name() {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        assert_eq!(archive_file_name(now), "ProductionFiles_20240301_140509.zip");
    }

    struct Recorder(Vec<String>);

    impl ArchiveWriter for Recorder {
        fn add_file(&mut self, _source: &Path, entry_name: &str) -> Result<(), ArchiveError> {
            self.0.push(entry_name.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_manifest_drives_any_writer() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("F_RevA.x_t");
        fs::write(&file, b"f").unwrap();
        let manifest =
            ArchiveManifest::from_resolutions(&[resolution("F", Some(&file), None)], DuplicatePolicy::Rename)
                .unwrap();
        let mut recorder = Recorder(Vec::new());
        manifest.write_into(&mut recorder).unwrap();
        assert_eq!(recorder.0, vec!["F_RevA.x_t"]);
    }
}
