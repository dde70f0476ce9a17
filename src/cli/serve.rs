//! Serve command handler.

use std::path::PathBuf;

use anyhow::{Context, Result};

use chatline::utils::logging::init_logging;

use super::load_config;

/// Load config, apply flag overrides, install logging and run the server.
pub(crate) async fn cmd_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().context("Invalid server settings")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;

    chatline::http::serve(&config)
        .await
        .context("Server exited with an error")?;
    Ok(())
}
