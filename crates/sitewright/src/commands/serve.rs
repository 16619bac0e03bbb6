//! HTTP server command.

use anyhow::Result;
use sitewright_server::SiteServer;

use crate::config::ConfigFile;

/// Run the serve command.
pub async fn run(config: ConfigFile, port: Option<u16>, no_open: bool) -> Result<()> {
    let mut server = config.server_config();
    if let Some(port) = port {
        server.port = port;
    }
    if no_open {
        server.open = false;
    }

    SiteServer::new(server).start().await?;

    Ok(())
}
