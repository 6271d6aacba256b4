//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents an NPI workspace
///
/// A workspace is a directory containing `.npi/`. Inventories, resolution
/// files and archives are written to its `Lists/`, `Files/` and `ZIP/`
/// folders.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .npi/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current = std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(".npi").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(".npi").exists() {
            return Err(WorkspaceError::AlreadyExists(root));
        }
        Self::init_force(&root)
    }

    /// Initialize even if .npi/ exists; an existing config is kept
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let workspace = Self { root };

        std::fs::create_dir_all(workspace.npi_dir())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        let config_path = workspace.config_path();
        if !config_path.exists() {
            std::fs::write(&config_path, Self::default_config())
                .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }

        workspace.ensure_dirs()?;
        Ok(workspace)
    }

    fn default_config() -> &'static str {
        r#"# NPI Workspace Configuration

# Folder tree to scan when `npi scan` is given a relative folder
# vault_root: ""

# Copy fetched files here instead of using them in place
# cache_dir: ""

# How the newest model/drawing is picked (independent, shared-threshold)
# selection: independent

# Archive entries sharing a file name (rename, first-wins, reject)
# duplicates: rename
"#
    }

    /// Create the output folders if missing
    pub fn ensure_dirs(&self) -> Result<(), WorkspaceError> {
        for dir in [self.lists_dir(), self.files_dir(), self.zip_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }
        Ok(())
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .npi configuration directory
    pub fn npi_dir(&self) -> PathBuf {
        self.root.join(".npi")
    }

    /// Workspace configuration file
    pub fn config_path(&self) -> PathBuf {
        self.npi_dir().join("config.yaml")
    }

    /// Folder holding inventory files
    pub fn lists_dir(&self) -> PathBuf {
        self.root.join("Lists")
    }

    /// Folder holding resolution files
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("Files")
    }

    /// Folder holding archives
    pub fn zip_dir(&self) -> PathBuf {
        self.root.join("ZIP")
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not an npi workspace (searched from {searched_from:?}). Run 'npi init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("npi workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_workspace_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::init(tmp.path()).unwrap();

        assert!(workspace.npi_dir().is_dir());
        assert!(workspace.config_path().exists());
        assert!(workspace.lists_dir().is_dir());
        assert!(workspace.files_dir().is_dir());
        assert!(workspace.zip_dir().is_dir());
    }

    #[test]
    fn test_workspace_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let err = Workspace::init(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));
    }

    #[test]
    fn test_workspace_init_force_keeps_config() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::init(tmp.path()).unwrap();
        std::fs::write(workspace.config_path(), "vault_root: /v\n").unwrap();

        Workspace::init_force(tmp.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(workspace.config_path()).unwrap(),
            "vault_root: /v\n"
        );
    }

    #[test]
    fn test_workspace_discover_from_subdir() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("Lists");
        let workspace = Workspace::discover_from(&subdir).unwrap();
        assert_eq!(workspace.root(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_workspace_discover_not_found() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }
}
