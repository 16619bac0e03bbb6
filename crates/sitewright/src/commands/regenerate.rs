//! Site regeneration command.

use anyhow::{Context, Result};

use crate::commands::open_state;
use crate::config::ConfigFile;

/// Run the regenerate command.
pub fn run(config: &ConfigFile, id: &str) -> Result<()> {
    let state = open_state(config)?;

    let result = state
        .renderer
        .generate_by_id(id)
        .with_context(|| format!("Failed to regenerate site {id}"))?;

    tracing::info!(
        "Generated {} with {} images in {}ms",
        result.location,
        result.images,
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
