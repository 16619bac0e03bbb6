//! Site packaging command.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::commands::open_state;
use crate::config::ConfigFile;

/// Run the pack command.
pub fn run(config: &ConfigFile, id: &str, output: Option<PathBuf>) -> Result<()> {
    let state = open_state(config)?;

    let record = state
        .records
        .find_by_id(id)
        .with_context(|| format!("Failed to load record {id}"))?;
    let packed = state
        .packager
        .pack(&record)
        .with_context(|| format!("Failed to package site {id}"))?;

    let output = output.unwrap_or_else(|| PathBuf::from(&packed.download_name));
    let entries = packed.entries;

    let mut file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let size = packed
        .copy_to(&mut file)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!("Wrote {} ({} files, {} bytes)", output.display(), entries, size);

    Ok(())
}
