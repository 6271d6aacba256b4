//! `npi status` command - Workspace status dashboard

use console::style;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::helpers::{display_name, require_workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entry::{DocumentKind, FileEntry};
use crate::core::inventory;
use crate::core::resolve::{self, PartResolution};
use crate::core::workspace::Workspace;

/// Archive file names start with this
const ARCHIVE_PREFIX: &str = "ProductionFiles_";

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// List the parts of the latest resolution
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Serialize, Default, Debug, PartialEq, Eq)]
struct InventoryMetrics {
    path: Option<PathBuf>,
    total: usize,
    drawings: usize,
    models: usize,
    production: usize,
    work_in_progress: usize,
    unknown_modified: usize,
}

#[derive(Serialize, Default, Debug)]
struct ResolutionMetrics {
    path: Option<PathBuf>,
    parts: usize,
    unresolved: usize,
    #[serde(skip)]
    records: Vec<PartResolution>,
}

#[derive(Serialize, Debug)]
struct WorkspaceStatus {
    root: PathBuf,
    inventory: InventoryMetrics,
    resolution: ResolutionMetrics,
    archive: Option<PathBuf>,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = require_workspace()?;
    let status = collect_status(&workspace)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
        }
        OutputFormat::Tsv => {
            println!("inventory\t{}", optional(status.inventory.path.as_deref()));
            println!("resolution\t{}", optional(status.resolution.path.as_deref()));
            println!("archive\t{}", optional(status.archive.as_deref()));
        }
        OutputFormat::Auto => print_dashboard(&status, args.detailed),
    }
    Ok(())
}

fn collect_status(workspace: &Workspace) -> Result<WorkspaceStatus> {
    let mut inventory_metrics = InventoryMetrics::default();
    if let Some(path) = inventory::most_recent(&workspace.lists_dir()) {
        let records = inventory::read_all(&path).map_err(|e| miette::miette!("{}", e))?;
        inventory_metrics = inventory_metrics_for(&records);
        inventory_metrics.path = Some(path);
    }

    let mut resolution_metrics = ResolutionMetrics::default();
    if let Some(path) = resolve::most_recent_resolution(&workspace.files_dir()) {
        let records = resolve::read_resolutions(&path).map_err(|e| miette::miette!("{}", e))?;
        resolution_metrics.parts = records.len();
        resolution_metrics.unresolved = records.iter().filter(|r| r.is_empty()).count();
        resolution_metrics.records = records;
        resolution_metrics.path = Some(path);
    }

    Ok(WorkspaceStatus {
        root: workspace.root().to_path_buf(),
        inventory: inventory_metrics,
        resolution: resolution_metrics,
        archive: inventory::most_recent_matching(&workspace.zip_dir(), ARCHIVE_PREFIX, ".zip"),
    })
}

fn inventory_metrics_for(records: &[FileEntry]) -> InventoryMetrics {
    let mut metrics = InventoryMetrics {
        total: records.len(),
        ..Default::default()
    };
    for record in records {
        match record.kind() {
            Some(DocumentKind::Drawing) => metrics.drawings += 1,
            Some(DocumentKind::Model) => metrics.models += 1,
            None => {}
        }
        if record.is_production {
            metrics.production += 1;
        } else {
            metrics.work_in_progress += 1;
        }
        if record.has_unknown_modified() {
            metrics.unknown_modified += 1;
        }
    }
    metrics
}

fn optional(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

fn print_dashboard(status: &WorkspaceStatus, detailed: bool) {
    let width = 60;
    println!("{}", style("NPI Workspace Status").bold().underlined());
    println!("{}", "═".repeat(width));
    println!("Root: {}", style(status.root.display()).cyan());
    println!();

    println!("{}", style("INVENTORY").bold());
    match &status.inventory.path {
        Some(path) => {
            let m = &status.inventory;
            println!("  Latest:      {}", display_name(Some(path.as_path())));
            println!("  Files:       {} ({} drawings, {} models)", m.total, m.drawings, m.models);
            println!(
                "  Production:  {}   Work in progress: {}",
                style(m.production).green(),
                style(m.work_in_progress).yellow()
            );
            if m.unknown_modified > 0 {
                println!(
                    "  {} {} file(s) with unknown modification time",
                    style("!").yellow(),
                    m.unknown_modified
                );
            }
        }
        None => println!("  {}", style("none yet (run 'npi scan')").dim()),
    }
    println!();

    println!("{}", style("RESOLUTION").bold());
    match &status.resolution.path {
        Some(path) => {
            let m = &status.resolution;
            println!("  Latest:      {}", display_name(Some(path.as_path())));
            println!("  Parts:       {} ({} without files)", m.parts, m.unresolved);
            if detailed {
                for r in &m.records {
                    println!(
                        "    {:<24} {:<32} {}",
                        r.part_number,
                        display_name(r.best_xt.as_deref()),
                        display_name(r.best_pdf.as_deref())
                    );
                }
            }
        }
        None => println!("  {}", style("none yet (run 'npi resolve')").dim()),
    }
    println!();

    println!("{}", style("ARCHIVE").bold());
    match &status.archive {
        Some(path) => println!("  Latest:      {}", display_name(Some(path.as_path()))),
        None => println!("  {}", style("none yet (run 'npi pack')").dim()),
    }
    println!("{}", "═".repeat(width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::core::entry::unknown_modified;

    fn record(name: &str, modified: chrono::NaiveDateTime) -> FileEntry {
        FileEntry::from_listing(name, PathBuf::from("/v").join(name), modified)
    }

    #[test]
    fn test_inventory_metrics() {
        let t = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let records = vec![
            record("A_RevA.pdf", t),
            record("A_RevA.x_t", t),
            record("B.pdf", unknown_modified()),
        ];
        let m = inventory_metrics_for(&records);
        assert_eq!(m.total, 3);
        assert_eq!(m.drawings, 2);
        assert_eq!(m.models, 1);
        assert_eq!(m.production, 2);
        assert_eq!(m.work_in_progress, 1);
        assert_eq!(m.unknown_modified, 1);
    }
}
