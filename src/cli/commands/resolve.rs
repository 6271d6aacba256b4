//! `npi resolve` command - Pick the newest production files for part numbers

use chrono::Local;
use console::style;
use miette::{bail, Result};
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    collect_part_numbers, display_name, escape_tsv, require_workspace, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::inventory;
use crate::core::resolve::{self, PartResolution, SelectionPolicy};

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Part number to look up (repeatable; "-" reads them from stdin)
    #[arg(long = "part", short = 'p', value_name = "PN")]
    pub parts: Vec<String>,

    /// File with one part number per line
    #[arg(long, value_name = "FILE")]
    pub parts_file: Option<PathBuf>,

    /// Inventory to read (default: newest in Lists/)
    #[arg(long, value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// How the newest model and drawing are picked (default: from config)
    #[arg(long, value_enum)]
    pub policy: Option<SelectionPolicy>,
}

pub fn run(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = require_workspace()?;
    let config = Config::load_for(Some(&workspace));

    let inventory_path = match &args.inventory {
        Some(path) => path.clone(),
        None => match inventory::most_recent(&workspace.lists_dir()) {
            Some(path) => path,
            None => bail!(
                "No inventory found in {}. Run 'npi scan' first.",
                workspace.lists_dir().display()
            ),
        },
    };

    let requested = collect_part_numbers(&args.parts, args.parts_file.as_deref())?;
    if requested.is_empty() {
        bail!("No part numbers entered; nothing to resolve");
    }

    let records = inventory::read_all(&inventory_path).map_err(|e| miette::miette!("{}", e))?;
    let policy = args.policy.unwrap_or_else(|| config.selection());
    let resolutions = resolve::resolve(&records, &requested, policy);

    workspace.ensure_dirs().map_err(|e| miette::miette!("{}", e))?;
    let output = resolve::write_new_resolutions(
        &resolutions,
        &workspace.files_dir(),
        Local::now().naive_local(),
    )
    .map_err(|e| miette::miette!("{}", e))?;

    print_resolutions(&resolutions, &output, global);
    Ok(())
}

/// Print resolutions in the selected format
pub(crate) fn print_resolutions(resolutions: &[PartResolution], written_to: &Path, global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "resolution": written_to,
                "parts": resolutions,
            });
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        }
        OutputFormat::Tsv => {
            println!("PART\tMODEL\tDRAWING");
            for r in resolutions {
                println!(
                    "{}\t{}\t{}",
                    escape_tsv(&r.part_number),
                    escape_tsv(&optional_path(r.best_xt.as_deref())),
                    escape_tsv(&optional_path(r.best_pdf.as_deref())),
                );
            }
        }
        OutputFormat::Auto => {
            if !global.quiet {
                let mut builder = Builder::default();
                builder.push_record(["Part Number", "Model (.x_t)", "Drawing (.pdf)"]);
                for r in resolutions {
                    builder.push_record([
                        truncate_str(&r.part_number, 32),
                        display_name(r.best_xt.as_deref()),
                        display_name(r.best_pdf.as_deref()),
                    ]);
                }
                println!("{}", builder.build().with(Style::rounded()));

                for r in resolutions.iter().filter(|r| r.is_empty()) {
                    println!(
                        "{} No production files found for {}",
                        style("!").yellow(),
                        style(&r.part_number).yellow()
                    );
                }
            }
            println!(
                "{} Resolution written to {}",
                style("✓").green(),
                style(written_to.display()).cyan()
            );
        }
    }
}

fn optional_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}
