//! Template listing command.

use anyhow::{Context, Result};
use sitewright_store::TemplateStore;

use crate::config::ConfigFile;

/// Run the templates command.
pub fn run(config: &ConfigFile) -> Result<()> {
    let paths = config.storage.paths();
    let store = TemplateStore::open(&paths.templates_dir).context("Failed to open template store")?;
    let templates = store.list().context("Failed to list templates")?;

    if templates.is_empty() {
        tracing::info!("No templates in {}", paths.templates_dir.display());
        return Ok(());
    }

    for template in &templates {
        let mut missing = Vec::new();
        if !template.has_markup {
            missing.push("markup");
        }
        if !template.has_stylesheet {
            missing.push("stylesheet");
        }

        let status = if template.eligible {
            "ready".to_string()
        } else {
            format!("missing {}", missing.join(", "))
        };
        let preview = if template.has_preview { " [preview]" } else { "" };

        println!("{:<24} {:<16} {}{}", template.id, template.category, status, preview);
    }

    Ok(())
}
