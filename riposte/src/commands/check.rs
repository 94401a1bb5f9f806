use std::net::ToSocketAddrs;

use anyhow::{Context, Result};
use tracing::*;

use crate::config::load_config;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    config
        .store
        .server
        .listen_addr()
        .to_socket_addrs()
        .context("Checking the listen address")?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve the listen address"))?;
    info!("No problems found");
    Ok(())
}
