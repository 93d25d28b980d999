//! Runs the publisher until Ctrl-C.

use std::sync::Arc;

use chunkxfer_publisher::PublisherServer;
use tracing::{error, info};

use crate::config::Config;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let server = PublisherServer::new(config.publisher_config());

    let signal_server = Arc::clone(&server);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => error!(error = %e, "failed to listen for Ctrl-C"),
        }
        signal_server.shutdown();
    });

    server.run(config.listen).await?;
    Ok(())
}
