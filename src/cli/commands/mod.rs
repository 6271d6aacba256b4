//! CLI command implementations

pub mod completions;
pub mod init;
pub mod pack;
pub mod resolve;
pub mod run;
pub mod scan;
pub mod status;
