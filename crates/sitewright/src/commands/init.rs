//! Initialize a sitewright data directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sitewright_static::{STARTER_MARKUP, STARTER_STYLESHEET};
use sitewright_store::{StoreError, TemplateStore, UploadedFile};

use crate::config::{ConfigFile, DEFAULT_CONFIG};

/// Id of the template slot written by init.
const STARTER_TEMPLATE: &str = "starter";

/// Run the init command.
pub fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing sitewright...");

    write_config(config_path, yes)?;

    let config = ConfigFile::load(config_path)?;
    let paths = config.storage.paths();
    for dir in [&paths.uploads_dir, &paths.sites_dir, &paths.records_dir] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let store = TemplateStore::open(&paths.templates_dir).context("Failed to open template store")?;
    write_starter_template(&store, yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sitewright serve' to start the server.");

    Ok(())
}

fn write_config(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
        return Ok(());
    }

    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());
    Ok(())
}

fn write_starter_template(store: &TemplateStore, overwrite: bool) -> Result<()> {
    let files = [
        UploadedFile::new("index.ejs", Some("text/html"), STARTER_MARKUP),
        UploadedFile::new("style.css", Some("text/css"), STARTER_STYLESHEET),
    ];

    match store.put_direct(Some(STARTER_TEMPLATE), &files, Some("Business")) {
        Ok(_) => {}
        Err(StoreError::Conflict(_)) if overwrite => {
            store.delete(STARTER_TEMPLATE)?;
            store.put_direct(Some(STARTER_TEMPLATE), &files, Some("Business"))?;
        }
        Err(StoreError::Conflict(_)) => {
            tracing::warn!(
                "Template '{}' already exists. Use --yes to overwrite.",
                STARTER_TEMPLATE
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to write starter template"),
    }

    tracing::info!(
        "Created template '{}' in {}",
        STARTER_TEMPLATE,
        store.root().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn writes_config_once() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sitewright.toml");

        write_config(&path, false).unwrap();
        fs::write(&path, "# edited").unwrap();
        write_config(&path, false).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "# edited");

        write_config(&path, true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }

    #[test]
    fn starter_template_is_generation_ready() {
        let temp = tempdir().unwrap();
        let store = TemplateStore::open(temp.path()).unwrap();

        write_starter_template(&store, false).unwrap();
        write_starter_template(&store, false).unwrap();

        let snapshot = store.snapshot(STARTER_TEMPLATE).unwrap();
        assert_eq!(snapshot.markup, STARTER_MARKUP);
        assert_eq!(snapshot.category, "Business");
    }

    #[test]
    fn overwrite_restores_starter_files() {
        let temp = tempdir().unwrap();
        let store = TemplateStore::open(temp.path()).unwrap();
        write_starter_template(&store, false).unwrap();
        fs::write(temp.path().join(STARTER_TEMPLATE).join("style.css"), "").unwrap();

        write_starter_template(&store, true).unwrap();

        let snapshot = store.snapshot(STARTER_TEMPLATE).unwrap();
        assert_eq!(snapshot.stylesheet, STARTER_STYLESHEET.as_bytes().to_vec());
    }
}
