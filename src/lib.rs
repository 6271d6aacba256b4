//! NPI: production file inventory and packaging
//!
//! Scans a vault folder tree for drawings (`.pdf`) and models (`.x_t`),
//! keeps a CSV inventory of what it found, picks the newest production
//! files for a list of part numbers and packs them into a zip archive.

pub mod cli;
pub mod core;
