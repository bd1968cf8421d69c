use anyhow::{Context, Result};
use std::sync::Arc;
use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;
use txbench_common::{config::VERSION, logger::init_logger, tokio::spawn_task};
use txbench_daemon::{
    config::{Config, NodeConfig},
    NodeServer,
};

const APP_NAME: &str = "txbench_daemon";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logger(&config.log, APP_NAME).context("Failed to initialize the logger")?;
    info!("txbench_daemon v{}", VERSION);

    let server = NodeServer::bind(&config.bind_address, NodeConfig::from(&config))
        .await
        .context("Failed to start the node server")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        spawn_task("ctrl-c", async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, exiting");
                    cancel.cancel();
                }
                Err(e) => error!("Error while listening for Ctrl-C: {}", e),
            }
        });
    }

    let pool = Arc::clone(server.pool());
    server.run(cancel).await?;

    info!(
        "Received {} transactions ({} duplicated, {} with invalid signatures)",
        pool.get_total(),
        pool.get_duplicated(),
        pool.get_invalid_signatures()
    );
    Ok(())
}
