//! Exclude command: write the draft manifest for external copy tools.

use crate::cli::args::ExcludeArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::error::{ExitCode, Result, SyncError};
use crate::manifest::Manifest;
use crate::tree::{SourceEntry, SourceTree};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ExcludeOutput {
    pub manifest: String,
    pub scanned: usize,
    pub excluded: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<String>,
}

pub fn run(config: &Config, args: &ExcludeArgs, output: &Output) -> Result<ExitCode> {
    let path = args
        .output
        .clone()
        .or_else(|| config.exclude_file.clone())
        .ok_or_else(|| {
            SyncError::ConfigError("no manifest path; set exclude_file or pass --output".to_string())
        })?;

    let entries = SourceTree::open(&config.source_root)?.scan()?;
    let manifest = Manifest::from_drafts(&entries);
    manifest.write(&path)?;
    info!(path = %path.display(), entries = manifest.len(), "manifest written");

    let unreadable = entries
        .iter()
        .filter_map(|e| match e {
            SourceEntry::Unreadable(u) => Some(u.id.clone()),
            _ => None,
        })
        .collect();

    output.print(&ExcludeOutput {
        manifest: path.to_string_lossy().into_owned(),
        scanned: entries.len(),
        excluded: manifest.entries().map(str::to_string).collect(),
        unreadable,
    })?;
    Ok(ExitCode::Success)
}
