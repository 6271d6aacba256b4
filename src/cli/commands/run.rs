//! `npi run` command - Scan, resolve and pack in one go

use miette::{bail, Result};
use std::path::PathBuf;

use crate::cli::commands::pack::print_report;
use crate::cli::commands::resolve::print_resolutions;
use crate::cli::commands::scan::{print_summary, ScanArgs};
use crate::cli::helpers::{collect_part_numbers, pipeline_options, require_workspace};
use crate::cli::progress::with_terminal_progress;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::archive::DuplicatePolicy;
use crate::core::config::Config;
use crate::core::pipeline::{Pipeline, PipelineError};
use crate::core::resolve::SelectionPolicy;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Part number to look up (repeatable; "-" reads them from stdin)
    #[arg(long = "part", short = 'p', value_name = "PN")]
    pub parts: Vec<String>,

    /// File with one part number per line
    #[arg(long, value_name = "FILE")]
    pub parts_file: Option<PathBuf>,

    /// How the newest model and drawing are picked (default: from config)
    #[arg(long, value_enum)]
    pub policy: Option<SelectionPolicy>,

    /// What to do with files sharing a name (default: from config)
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicatePolicy>,
}

pub fn run(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = require_workspace()?;
    let config = Config::load_for(Some(&workspace));
    let (store, start) = args.scan.open_store(&config)?;

    // Asked up front so a prompt never interrupts the progress line
    let requested = collect_part_numbers(&args.parts, args.parts_file.as_deref())?;
    if requested.is_empty() {
        bail!("No part numbers entered; nothing to do");
    }

    let options = pipeline_options(&config, args.policy, args.duplicates);
    let mut pipeline = Pipeline::new(workspace, options);
    let outcome = with_terminal_progress(global.quiet, |observer| {
        pipeline.run(&store, &start, &requested, observer)
    })
    .map_err(|e| match e {
        PipelineError::NothingToDo(reason) => miette::miette!("Cancelled: {}", reason),
        e => miette::miette!("{}", e),
    })?;

    if global.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
        return Ok(());
    }

    if global.format == OutputFormat::Auto && !global.quiet {
        print_summary(&start, &outcome.inventory, &outcome.scan);
        println!();
    }
    print_resolutions(&outcome.resolutions, &outcome.resolution, global);
    if global.format == OutputFormat::Auto {
        println!();
        print_report(&outcome.archive, global);
    } else {
        println!("{}", outcome.archive.destination.display());
    }
    Ok(())
}
