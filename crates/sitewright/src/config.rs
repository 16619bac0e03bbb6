//! Configuration file (sitewright.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sitewright_server::{ServerConfig, StoragePaths};

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub limits: LimitsSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin used in preview links
    pub public_url: Option<String>,
    #[serde(default)]
    pub open: bool,
}

/// Storage locations. Unset directories default to subdirectories of
/// `data_dir`.
#[derive(Debug, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    pub templates_dir: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub sites_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub records_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_max_upload_mb() -> usize {
    50
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
            open: false,
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            templates_dir: None,
            uploads_dir: None,
            sites_dir: None,
            staging_dir: None,
            records_dir: None,
            temp_dir: None,
        }
    }
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl StorageSection {
    pub fn paths(&self) -> StoragePaths {
        let defaults = StoragePaths::under(&self.data_dir);
        let pick = |dir: &Option<PathBuf>, default: PathBuf| dir.clone().unwrap_or(default);

        StoragePaths {
            templates_dir: pick(&self.templates_dir, defaults.templates_dir),
            uploads_dir: pick(&self.uploads_dir, defaults.uploads_dir),
            sites_dir: pick(&self.sites_dir, defaults.sites_dir),
            staging_dir: pick(&self.staging_dir, defaults.staging_dir),
            records_dir: pick(&self.records_dir, defaults.records_dir),
            temp_dir: pick(&self.temp_dir, defaults.temp_dir),
        }
    }
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());

        Ok(config)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            public_url: self.server.public_url.clone(),
            open: self.server.open,
            paths: self.storage.paths(),
            max_upload_bytes: self.limits.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

/// Written by `sitewright init`.
pub const DEFAULT_CONFIG: &str = r#"# Sitewright Configuration

[server]
host = "127.0.0.1"
port = 5000

# Origin used in preview links (defaults to http://host:port)
# public_url = "https://sites.example.com"

# Open a browser when the server starts
open = false

[storage]
# Every storage area lives below this directory unless overridden
data_dir = "data"

# templates_dir = "data/templates"
# uploads_dir = "data/uploads"
# sites_dir = "data/sites"
# staging_dir = "data/staging"   # must be on the same filesystem as sites_dir
# records_dir = "data/records"
# temp_dir = "data/tmp"

[limits]
# Largest accepted upload request, in megabytes
max_upload_mb = 50
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_means_defaults() {
        let temp = tempdir().unwrap();

        let config = ConfigFile::load(&temp.path().join("sitewright.toml")).unwrap();
        let server = config.server_config();

        assert_eq!(server.port, 5000);
        assert_eq!(server.paths, StoragePaths::under("data"));
        assert_eq!(server.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn default_config_parses_to_defaults() {
        let config: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.paths(), StoragePaths::under("data"));
    }

    #[test]
    fn directory_overrides_apply() {
        let config: ConfigFile = toml::from_str(
            r#"
            [storage]
            data_dir = "/srv/site"
            sites_dir = "/var/www/sites"

            [limits]
            max_upload_mb = 5
            "#,
        )
        .unwrap();

        let server = config.server_config();

        assert_eq!(server.paths.sites_dir, PathBuf::from("/var/www/sites"));
        assert_eq!(server.paths.uploads_dir, PathBuf::from("/srv/site/uploads"));
        assert_eq!(server.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sitewright.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(ConfigFile::load(&path).is_err());
    }
}
