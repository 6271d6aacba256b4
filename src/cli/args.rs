//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    completions::CompletionsArgs, init::InitArgs, pack::PackArgs, resolve::ResolveArgs,
    run::RunArgs, scan::ScanArgs, status::StatusArgs,
};

#[derive(Parser)]
#[command(name = "npi")]
#[command(author, version, about = "Production file inventory and packaging")]
#[command(long_about = "Scans a vault folder tree for drawings and models, records them in a CSV inventory, \
picks the newest production files for a list of part numbers and packs them into a zip archive.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new NPI workspace
    Init(InitArgs),

    /// Scan a folder tree and write a new inventory
    Scan(ScanArgs),

    /// Pick the newest production files for part numbers
    Resolve(ResolveArgs),

    /// Pack the files of a resolution into a zip archive
    Pack(PackArgs),

    /// Scan, resolve and pack in one go
    Run(RunArgs),

    /// Show the latest inventory, resolution and archive
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
}
