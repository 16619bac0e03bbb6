pub mod init;
pub mod pack;
pub mod regenerate;
pub mod serve;
pub mod templates;

use anyhow::{Context, Result};
use sitewright_server::AppState;

use crate::config::ConfigFile;

/// Open the storage areas named by `config`.
fn open_state(config: &ConfigFile) -> Result<AppState> {
    let server = config.server_config();
    AppState::open(&server.paths, &server.base_url()).context("Failed to open storage")
}
