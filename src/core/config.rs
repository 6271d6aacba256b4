//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::archive::DuplicatePolicy;
use crate::core::resolve::SelectionPolicy;
use crate::core::workspace::Workspace;

/// NPI configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local directory that stands in for the vault tree
    pub vault_root: Option<PathBuf>,

    /// Where fetched files are copied (none = use vault files in place)
    pub cache_dir: Option<PathBuf>,

    /// How the resolver picks the newest model and drawing
    pub selection: Option<SelectionPolicy>,

    /// Archive entry name collision policy
    pub duplicates: Option<DuplicatePolicy>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/npi/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 2. Workspace config (.npi/config.yaml)
        if let Some(workspace) = workspace {
            if let Some(local) = Self::read_file(&workspace.config_path()) {
                config.merge(local.relative_to(workspace.root()));
            }
        }

        // 3. Environment variables
        if let Ok(root) = std::env::var("NPI_VAULT_ROOT") {
            config.vault_root = Some(PathBuf::from(root));
        }
        if let Ok(cache) = std::env::var("NPI_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(cache));
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "npi")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Resolve relative paths against `base`
    fn relative_to(mut self, base: &Path) -> Self {
        let absolutize = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.vault_root = self.vault_root.map(absolutize);
        self.cache_dir = self.cache_dir.map(absolutize);
        self
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.vault_root.is_some() {
            self.vault_root = other.vault_root;
        }
        if other.cache_dir.is_some() {
            self.cache_dir = other.cache_dir;
        }
        if other.selection.is_some() {
            self.selection = other.selection;
        }
        if other.duplicates.is_some() {
            self.duplicates = other.duplicates;
        }
    }

    /// Resolver policy, defaulting to independent maxima
    pub fn selection(&self) -> SelectionPolicy {
        self.selection.unwrap_or_default()
    }

    /// Duplicate entry policy, defaulting to rename
    pub fn duplicates(&self) -> DuplicatePolicy {
        self.duplicates.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config_yaml() {
        let config: Config = serde_yml::from_str(
            "vault_root: /srv/vault\nselection: shared-threshold\nduplicates: first-wins\n",
        )
        .unwrap();
        assert_eq!(config.vault_root, Some(PathBuf::from("/srv/vault")));
        assert_eq!(config.selection(), SelectionPolicy::SharedThreshold);
        assert_eq!(config.duplicates(), DuplicatePolicy::FirstWins);
        assert_eq!(config.cache_dir, None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.selection(), SelectionPolicy::Independent);
        assert_eq!(config.duplicates(), DuplicatePolicy::Rename);
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            vault_root: Some(PathBuf::from("/a")),
            cache_dir: Some(PathBuf::from("/cache")),
            ..Default::default()
        };
        base.merge(Config {
            vault_root: Some(PathBuf::from("/b")),
            selection: Some(SelectionPolicy::SharedThreshold),
            ..Default::default()
        });
        assert_eq!(base.vault_root, Some(PathBuf::from("/b")));
        assert_eq!(base.cache_dir, Some(PathBuf::from("/cache")));
        assert_eq!(base.selection(), SelectionPolicy::SharedThreshold);
    }

    #[test]
    fn test_workspace_relative_paths() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::init(tmp.path()).unwrap();
        std::fs::write(workspace.config_path(), "vault_root: vault\ncache_dir: /abs/cache\n").unwrap();

        let config = Config::read_file(&workspace.config_path())
            .unwrap()
            .relative_to(workspace.root());
        assert_eq!(config.vault_root, Some(workspace.root().join("vault")));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/abs/cache")));
    }

    #[test]
    fn test_invalid_file_is_ignored() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "selection: sideways\n").unwrap();
        assert!(Config::read_file(&path).is_none());
    }
}
