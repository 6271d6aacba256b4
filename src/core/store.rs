//! Hierarchical file store abstraction
//!
//! The scanner only needs three operations from a vault: list the files in
//! a folder, list its subfolders, and populate a file's local cache copy.
//! [`LocalStore`] serves a directory tree on disk; [`MemoryStore`] is an
//! in-memory tree for tests.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// A file as listed by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFile {
    /// File name (no directory part)
    pub name: String,

    /// Where the file lives once fetched into the local cache
    pub local_path: PathBuf,
}

/// Errors raised by a file store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to fetch {name}: {reason}")]
    FetchFailed { name: String, reason: String },
}

/// Read-only access to a folder tree
pub trait FolderStore {
    /// Opaque folder handle
    type Folder;

    /// Files directly inside `folder`
    fn list_files(&self, folder: &Self::Folder) -> Result<Vec<StoreFile>, StoreError>;

    /// Direct subfolders of `folder`
    fn list_subfolders(&self, folder: &Self::Folder) -> Result<Vec<Self::Folder>, StoreError>;

    /// Populate the local cache copy of `file`
    fn fetch(&self, file: &StoreFile) -> Result<(), StoreError>;
}

/// A directory tree on disk standing in for a vault
///
/// Without a cache directory files are used in place and `fetch` only checks
/// that they still exist. With one, `fetch` copies each file to the mirrored
/// path under the cache directory.
///
/// Symlinked files are listed like regular files. Symlinked folders are
/// skipped, since a link back to an ancestor would never end the recursion.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    cache_dir: Option<PathBuf>,
}

impl LocalStore {
    /// Open a store rooted at `root`
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        if !root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
            cache_dir: None,
        })
    }

    /// Copy fetched files into `cache_dir` instead of using them in place
    pub fn with_cache(mut self, cache_dir: &Path) -> Self {
        self.cache_dir = Some(cache_dir.to_path_buf());
        self
    }

    /// The root folder handle
    pub fn root(&self) -> PathBuf {
        self.root.clone()
    }

    /// Resolve a folder path inside the store (absolute, or relative to the root)
    ///
    /// Paths containing `..` are refused.
    pub fn folder(&self, path: &Path) -> Result<PathBuf, StoreError> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(StoreError::Unavailable(format!(
                "{} may not contain '..'",
                path.display()
            )));
        }
        let folder = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        if !folder.starts_with(&self.root) {
            return Err(StoreError::Unavailable(format!(
                "{} is not part of the vault at {}",
                folder.display(),
                self.root.display()
            )));
        }
        if !folder.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "folder not found: {}",
                folder.display()
            )));
        }
        Ok(folder)
    }

    fn source_path(&self, file: &StoreFile) -> PathBuf {
        match &self.cache_dir {
            Some(cache) => {
                let relative = file.local_path.strip_prefix(cache).unwrap_or(&file.local_path);
                self.root.join(relative)
            }
            None => file.local_path.clone(),
        }
    }

    fn cache_path(&self, source: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(cache) => {
                let relative = source.strip_prefix(&self.root).unwrap_or(source);
                cache.join(relative)
            }
            None => source.to_path_buf(),
        }
    }

    fn children(&self, folder: &Path) -> Result<Vec<walkdir::DirEntry>, StoreError> {
        WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|e| e.map_err(|e| StoreError::Unavailable(e.to_string())))
            .collect()
    }
}

impl FolderStore for LocalStore {
    type Folder = PathBuf;

    fn list_files(&self, folder: &PathBuf) -> Result<Vec<StoreFile>, StoreError> {
        Ok(self
            .children(folder)?
            .into_iter()
            .filter(|e| e.file_type().is_file() || (e.path_is_symlink() && e.path().is_file()))
            .map(|e| StoreFile {
                name: e.file_name().to_string_lossy().into_owned(),
                local_path: self.cache_path(e.path()),
            })
            .collect())
    }

    fn list_subfolders(&self, folder: &PathBuf) -> Result<Vec<PathBuf>, StoreError> {
        Ok(self
            .children(folder)?
            .into_iter()
            .filter(|e| {
                if e.path_is_symlink() && e.path().is_dir() {
                    debug!(path = %e.path().display(), "skipping symlinked folder");
                }
                e.file_type().is_dir()
            })
            .map(|e| e.into_path())
            .collect())
    }

    fn fetch(&self, file: &StoreFile) -> Result<(), StoreError> {
        let failed = |reason: String| StoreError::FetchFailed {
            name: file.name.clone(),
            reason,
        };

        let source = self.source_path(file);
        if !source.is_file() {
            return Err(failed(format!("{} no longer exists", source.display())));
        }
        if self.cache_dir.is_none() {
            return Ok(());
        }

        if let Some(parent) = file.local_path.parent() {
            fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }
        fs::copy(&source, &file.local_path).map_err(|e| failed(e.to_string()))?;

        // Keep the vault's modification time on the cached copy
        let modified = fs::metadata(&source)
            .and_then(|m| m.modified())
            .map_err(|e| failed(e.to_string()))?;
        fs::File::options()
            .write(true)
            .open(&file.local_path)
            .and_then(|f| f.set_modified(modified))
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryFolder {
    files: Vec<StoreFile>,
    subfolders: Vec<String>,
}

/// In-memory folder tree
///
/// Folders are addressed by `/`-separated paths with `""` as the root.
/// Fetching always succeeds unless the file was registered with
/// [`MemoryStore::add_failing_file`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    folders: BTreeMap<String, MemoryFolder>,
    failing: HashSet<PathBuf>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut store = Self::default();
        store.folders.insert(String::new(), MemoryFolder::default());
        store
    }

    /// A store whose listings always fail
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    /// Add a file; `path` is `folder/sub/name.ext`, parents are created
    pub fn add_file(&mut self, path: &str, local_path: impl Into<PathBuf>) -> &mut Self {
        let (folder, name) = match path.rsplit_once('/') {
            Some((folder, name)) => (folder.to_string(), name.to_string()),
            None => (String::new(), path.to_string()),
        };
        self.add_folder(&folder);
        if let Some(entry) = self.folders.get_mut(&folder) {
            entry.files.push(StoreFile {
                name,
                local_path: local_path.into(),
            });
        }
        self
    }

    /// Add a file whose fetch fails
    pub fn add_failing_file(&mut self, path: &str, local_path: impl Into<PathBuf>) -> &mut Self {
        let local_path = local_path.into();
        self.failing.insert(local_path.clone());
        self.add_file(path, local_path)
    }

    /// Add an (empty) folder and all of its parents
    pub fn add_folder(&mut self, path: &str) -> &mut Self {
        if path.is_empty() || self.folders.contains_key(path) {
            return self;
        }
        let (parent, _) = path.rsplit_once('/').unwrap_or(("", path));
        let parent = parent.to_string();
        self.add_folder(&parent);
        if let Some(entry) = self.folders.get_mut(&parent) {
            entry.subfolders.push(path.to_string());
        }
        self.folders.insert(path.to_string(), MemoryFolder::default());
        self
    }

    /// The root folder handle
    pub fn root(&self) -> String {
        String::new()
    }

    fn get(&self, folder: &str) -> Result<&MemoryFolder, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("not logged in".to_string()));
        }
        self.folders
            .get(folder)
            .ok_or_else(|| StoreError::Unavailable(format!("no such folder: {}", folder)))
    }
}

impl FolderStore for MemoryStore {
    type Folder = String;

    fn list_files(&self, folder: &String) -> Result<Vec<StoreFile>, StoreError> {
        Ok(self.get(folder)?.files.clone())
    }

    fn list_subfolders(&self, folder: &String) -> Result<Vec<String>, StoreError> {
        Ok(self.get(folder)?.subfolders.clone())
    }

    fn fetch(&self, file: &StoreFile) -> Result<(), StoreError> {
        if self.failing.contains(&file.local_path) {
            return Err(StoreError::FetchFailed {
                name: file.name.clone(),
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_local_store_lists_one_level_sorted() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("b/inner")).unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("z.pdf"), b"z").unwrap();
        fs::write(tmp.path().join("m.x_t"), b"m").unwrap();
        fs::write(tmp.path().join("b/inner/deep.pdf"), b"d").unwrap();

        let store = LocalStore::open(tmp.path()).unwrap();
        let root = store.root();

        let names: Vec<_> = store
            .list_files(&root)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["m.x_t", "z.pdf"]);

        let folders = store.list_subfolders(&root).unwrap();
        assert_eq!(folders, vec![tmp.path().join("a"), tmp.path().join("b")]);
    }

    #[test]
    fn test_local_store_open_missing_root() {
        let err = LocalStore::open(Path::new("/nonexistent/vault")).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_local_store_folder_outside_root() {
        let tmp = tempdir().unwrap();
        let store = LocalStore::open(tmp.path()).unwrap();
        assert!(store.folder(Path::new("/")).is_err());
        assert!(store.folder(Path::new("missing")).is_err());
        assert!(store.folder(Path::new("")).is_ok());
    }

    #[test]
    fn test_local_store_folder_rejects_parent_components() {
        let tmp = tempdir().unwrap();
        let vault = tmp.path().join("vault");
        fs::create_dir_all(vault.join("a")).unwrap();
        fs::create_dir_all(tmp.path().join("outside")).unwrap();
        let store = LocalStore::open(&vault).unwrap();

        assert!(store.folder(Path::new("../outside")).is_err());
        assert!(store.folder(&vault.join("a/../../outside")).is_err());
        assert!(store.folder(Path::new("a")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_local_store_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = tempdir().unwrap();
        let vault = tmp.path().join("vault");
        let elsewhere = tmp.path().join("elsewhere");
        fs::create_dir_all(&vault).unwrap();
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(elsewhere.join("target.pdf"), b"t").unwrap();
        symlink(elsewhere.join("target.pdf"), vault.join("linked_RevA.pdf")).unwrap();
        symlink(&elsewhere, vault.join("linked_dir")).unwrap();
        symlink(&vault, vault.join("loop")).unwrap();

        let store = LocalStore::open(&vault).unwrap();
        let root = store.root();
        let files = store.list_files(&root).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "linked_RevA.pdf");
        store.fetch(&files[0]).unwrap();

        assert!(store.list_subfolders(&root).unwrap().is_empty());
    }

    #[test]
    fn test_local_store_fetch_in_place() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.pdf"), b"a").unwrap();
        let store = LocalStore::open(tmp.path()).unwrap();

        let files = store.list_files(&store.root()).unwrap();
        assert_eq!(files[0].local_path, tmp.path().join("a.pdf"));
        store.fetch(&files[0]).unwrap();

        fs::remove_file(tmp.path().join("a.pdf")).unwrap();
        let err = store.fetch(&files[0]).unwrap_err();
        assert!(matches!(err, StoreError::FetchFailed { .. }));
    }

    #[test]
    fn test_local_store_fetch_copies_into_cache() {
        let vault = tempdir().unwrap();
        let cache = tempdir().unwrap();
        fs::create_dir_all(vault.path().join("parts")).unwrap();
        fs::write(vault.path().join("parts/PN-1_RevA.pdf"), b"drawing").unwrap();

        let store = LocalStore::open(vault.path()).unwrap().with_cache(cache.path());
        let folder = store.folder(Path::new("parts")).unwrap();
        let files = store.list_files(&folder).unwrap();
        let expected = cache.path().join("parts/PN-1_RevA.pdf");
        assert_eq!(files[0].local_path, expected);
        assert!(!expected.exists());

        store.fetch(&files[0]).unwrap();
        assert_eq!(fs::read(&expected).unwrap(), b"drawing");

        let source_time = fs::metadata(vault.path().join("parts/PN-1_RevA.pdf"))
            .unwrap()
            .modified()
            .unwrap();
        let cached_time = fs::metadata(&expected).unwrap().modified().unwrap();
        assert_eq!(source_time, cached_time);
    }

    #[test]
    fn test_memory_store_tree() {
        let mut store = MemoryStore::new();
        store
            .add_file("top.pdf", "/c/top.pdf")
            .add_file("a/b/deep.x_t", "/c/deep.x_t")
            .add_folder("empty");

        let root = store.root();
        assert_eq!(store.list_files(&root).unwrap().len(), 1);
        assert_eq!(store.list_subfolders(&root).unwrap(), vec!["a", "empty"]);
        assert_eq!(store.list_subfolders(&"a".to_string()).unwrap(), vec!["a/b"]);
        assert_eq!(store.list_files(&"a/b".to_string()).unwrap()[0].name, "deep.x_t");
    }

    #[test]
    fn test_memory_store_failing_fetch() {
        let mut store = MemoryStore::new();
        store.add_failing_file("bad.pdf", "/c/bad.pdf");
        let files = store.list_files(&store.root()).unwrap();
        assert!(matches!(
            store.fetch(&files[0]),
            Err(StoreError::FetchFailed { .. })
        ));
    }

    #[test]
    fn test_memory_store_unavailable() {
        let store = MemoryStore::unavailable();
        assert!(matches!(
            store.list_files(&store.root()),
            Err(StoreError::Unavailable(_))
        ));
    }
}
