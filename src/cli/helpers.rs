//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};
use std::io::{IsTerminal, Read};
use std::path::Path;

use crate::core::archive::DuplicatePolicy;
use crate::core::config::Config;
use crate::core::pipeline::PipelineOptions;
use crate::core::resolve::{parse_part_numbers, SelectionPolicy};
use crate::core::workspace::Workspace;

/// Find the enclosing workspace or fail with a hint to run `npi init`
pub fn require_workspace() -> Result<Workspace> {
    Workspace::discover().map_err(|e| miette::miette!("{}", e))
}

/// Pipeline options from config, with command-line overrides applied
pub fn pipeline_options(
    config: &Config,
    selection: Option<SelectionPolicy>,
    duplicates: Option<DuplicatePolicy>,
) -> PipelineOptions {
    PipelineOptions {
        selection: selection.unwrap_or_else(|| config.selection()),
        duplicates: duplicates.unwrap_or_else(|| config.duplicates()),
    }
}

/// Gather the part numbers to look up
///
/// `--part` values are taken in order; a value of `-` reads the rest from
/// stdin. A `--parts-file` is read one part number per line. With neither,
/// piped stdin is read, and an attended terminal is prompted until a blank
/// entry.
pub fn collect_part_numbers(parts: &[String], parts_file: Option<&Path>) -> Result<Vec<String>> {
    let mut collected = Vec::new();

    for part in parts {
        if part == "-" {
            collected.extend(read_stdin_parts()?);
        } else {
            collected.extend(parse_part_numbers(part));
        }
    }

    if let Some(file) = parts_file {
        let text = std::fs::read_to_string(file)
            .map_err(|e| miette::miette!("Cannot read {}: {}", file.display(), e))?;
        collected.extend(parse_part_numbers(&text));
    }

    if !parts.is_empty() || parts_file.is_some() {
        return Ok(collected);
    }

    if !std::io::stdin().is_terminal() {
        return read_stdin_parts();
    }

    if console::user_attended() {
        return prompt_part_numbers();
    }

    Ok(collected)
}

fn read_stdin_parts() -> Result<Vec<String>> {
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text).into_diagnostic()?;
    Ok(parse_part_numbers(&text))
}

fn prompt_part_numbers() -> Result<Vec<String>> {
    let theme = ColorfulTheme::default();
    let mut parts = Vec::new();
    loop {
        let entry: String = Input::with_theme(&theme)
            .with_prompt("Part number (blank to finish)")
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        let entry = entry.trim();
        if entry.is_empty() {
            break;
        }
        parts.push(entry.to_string());
    }
    Ok(parts)
}

/// File name part of a path, for table columns
pub fn display_name(path: Option<&Path>) -> String {
    match path {
        Some(p) => p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| p.display().to_string()),
        None => "-".to_string(),
    }
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Make a value safe for one TSV field
pub fn escape_tsv(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}
