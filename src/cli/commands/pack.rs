//! `npi pack` command - Zip the files named by a resolution

use chrono::Local;
use console::style;
use miette::{bail, Result};
use std::path::PathBuf;

use crate::cli::helpers::require_workspace;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::archive::{self, ArchiveManifest, ArchiveReport, DuplicatePolicy};
use crate::core::config::Config;
use crate::core::resolve;

#[derive(clap::Args, Debug)]
pub struct PackArgs {
    /// Resolution CSV to pack (default: newest in Files/)
    #[arg(long, value_name = "FILE")]
    pub resolution: Option<PathBuf>,

    /// Archive to write (default: ZIP/ProductionFiles_<timestamp>.zip)
    #[arg(long, short = 'o', value_name = "ZIP")]
    pub output: Option<PathBuf>,

    /// What to do with files sharing a name (default: from config)
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicatePolicy>,
}

pub fn run(args: PackArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = require_workspace()?;
    let config = Config::load_for(Some(&workspace));

    let resolution_path = match &args.resolution {
        Some(path) => path.clone(),
        None => match resolve::most_recent_resolution(&workspace.files_dir()) {
            Some(path) => path,
            None => bail!(
                "No resolution found in {}. Run 'npi resolve' first.",
                workspace.files_dir().display()
            ),
        },
    };
    let resolutions =
        resolve::read_resolutions(&resolution_path).map_err(|e| miette::miette!("{}", e))?;

    let policy = args.duplicates.unwrap_or_else(|| config.duplicates());
    let manifest = ArchiveManifest::from_resolutions(&resolutions, policy)
        .map_err(|e| miette::miette!("{}", e))?;
    if manifest.is_empty() {
        bail!(
            "None of the files in {} exist locally; no archive written",
            resolution_path.display()
        );
    }

    let destination = match args.output {
        Some(path) => path,
        None => {
            workspace.ensure_dirs().map_err(|e| miette::miette!("{}", e))?;
            workspace
                .zip_dir()
                .join(archive::archive_file_name(Local::now().naive_local()))
        }
    };
    let report = archive::write_manifest(manifest, &destination).map_err(|e| miette::miette!("{}", e))?;

    print_report(&report, global);
    Ok(())
}

/// Print an archive report in the selected format
pub(crate) fn print_report(report: &ArchiveReport, global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Tsv => {
            for entry in &report.manifest.entries {
                println!("{}\t{}", entry.entry_name, entry.source.display());
            }
        }
        OutputFormat::Auto => {
            if !global.quiet {
                for path in &report.manifest.missing {
                    println!(
                        "{} Missing, not packed: {}",
                        style("!").yellow(),
                        style(path.display()).dim()
                    );
                }
                for path in &report.manifest.skipped {
                    println!(
                        "{} Duplicate name, not packed: {}",
                        style("!").yellow(),
                        style(path.display()).dim()
                    );
                }
            }
            println!(
                "{} Packed {} file(s) into {}",
                style("✓").green(),
                report.manifest.entries.len(),
                style(report.destination.display()).cyan()
            );
        }
    }
}
