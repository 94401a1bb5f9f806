use std::net::ToSocketAddrs;

use anyhow::Result;
use tracing::*;
use riposte_core::Services;
use riposte_server::EventServer;

use crate::config::load_config;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    info!(%version, "Riposte");

    let config = load_config(&cli.config)?;
    let services = Services::new(config).await?;

    let address = services
        .config
        .store
        .server
        .listen_addr()
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve the listen address"))?;

    let server = EventServer::new(&services);

    if console::user_attended() {
        info!("--------------------------------------------");
        info!("Riposte is now running.");
        info!("Accepting events on http://{address}");
        info!("--------------------------------------------");
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
        result = server.run(address) => {
            result?;
        }
    }

    info!("Exiting");
    Ok(())
}
