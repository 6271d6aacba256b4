//! `npi scan` command - Record every drawing and model in a folder tree

use console::style;
use miette::{bail, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::{pipeline_options, require_workspace};
use crate::cli::progress::with_terminal_progress;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::pipeline::Pipeline;
use crate::core::progress::format_hms;
use crate::core::scan::ScanStats;
use crate::core::store::LocalStore;

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// Folder to scan; relative to the vault root when one is set
    pub folder: Option<PathBuf>,

    /// Vault root folder (default: vault_root from config)
    #[arg(long, value_name = "DIR")]
    pub vault: Option<PathBuf>,

    /// Copy fetched files into this folder instead of using them in place
    #[arg(long, value_name = "DIR")]
    pub cache: Option<PathBuf>,
}

impl ScanArgs {
    /// Open the store and resolve the folder to start from
    pub(crate) fn open_store(&self, config: &Config) -> Result<(LocalStore, PathBuf)> {
        let vault = self.vault.clone().or_else(|| config.vault_root.clone());
        let (root, start) = match (vault, self.folder.as_deref()) {
            (Some(root), folder) => (root, folder),
            (None, Some(folder)) => (folder.to_path_buf(), None),
            (None, None) => bail!(
                "No folder to scan. Pass FOLDER, --vault, or set vault_root in .npi/config.yaml"
            ),
        };

        let root = canonical(&root)?;
        let mut store = LocalStore::open(&root).map_err(|e| miette::miette!("{}", e))?;
        if let Some(cache) = self.cache.clone().or_else(|| config.cache_dir.clone()) {
            store = store.with_cache(&cache);
        }

        let start = match start {
            Some(folder) if folder.is_absolute() => store.folder(&canonical(folder)?),
            Some(folder) => store.folder(folder),
            None => store.folder(&store.root()),
        }
        .map_err(|e| miette::miette!("{}", e))?;
        Ok((store, start))
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|e| miette::miette!("Cannot open {}: {}", path.display(), e))
}

pub fn run(args: ScanArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = require_workspace()?;
    let config = Config::load_for(Some(&workspace));
    let (store, start) = args.open_store(&config)?;

    let mut pipeline = Pipeline::new(workspace, pipeline_options(&config, None, None));
    let (inventory, entries, stats) = with_terminal_progress(global.quiet, |observer| {
        pipeline.scan(&store, &start, observer)
    })
    .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "inventory": inventory,
                "folder": start,
                "stats": stats,
                "entries": entries,
            });
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        }
        OutputFormat::Tsv => {
            println!("{}", inventory.display());
        }
        OutputFormat::Auto => {
            if global.quiet {
                println!("{}", inventory.display());
            } else {
                print_summary(&start, &inventory, &stats);
            }
        }
    }

    Ok(())
}

pub(crate) fn print_summary(folder: &Path, inventory: &Path, stats: &ScanStats) {
    println!(
        "{} Scanned {} file(s) under {} in {}",
        style("✓").green(),
        stats.visited,
        style(folder.display()).cyan(),
        format_hms(stats.duration)
    );
    println!(
        "  {} drawing(s) and model(s) recorded",
        style(stats.matched).bold()
    );
    if stats.fetch_failures > 0 {
        println!(
            "  {} {} file(s) could not be fetched; their modification time is unknown",
            style("!").yellow(),
            stats.fetch_failures
        );
    }
    println!(
        "{} Inventory written to {}",
        style("✓").green(),
        style(inventory.display()).cyan()
    );
}
