//! Runs one retrieval.

use anyhow::Context;
use chunkxfer_retriever::{RetrieveError, Retrieval, ServerClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;

pub async fn run(config: Config, generate: bool) -> anyhow::Result<()> {
    let client = ServerClient::new(&config.server, config.request_timeout())
        .context("configuring server client")?;

    if generate {
        client
            .generate()
            .await
            .context("requesting a new blob")?;
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("cancellation requested"),
            Err(e) => error!(error = %e, "failed to listen for Ctrl-C"),
        }
        signal_cancel.cancel();
    });

    let retrieval = Retrieval::new(client, config.retrieval_config());
    let report = retrieval.run(&cancel).await.map_err(|e| {
        let what = stage(&e);
        anyhow::Error::new(e).context(what)
    })?;

    info!(
        sha1 = %report.metadata.content_hash,
        chunks = report.fetched.chunks,
        bytes = report.fetched.bytes,
        verified = report.verified,
        "retrieval complete"
    );
    if let Some(path) = &report.assembled {
        info!(path = %path.display(), "blob assembled");
    }
    Ok(())
}

/// Names the retrieval stage an error came from.
fn stage(err: &RetrieveError) -> String {
    match err {
        RetrieveError::Chunk { index, .. } => format!("fetching chunk {index}"),
        RetrieveError::Cancelled => "fetching chunks".into(),
        RetrieveError::Transfer(_) | RetrieveError::Join(_) => "storing or verifying chunks".into(),
        RetrieveError::Io(_) => "preparing data directory".into(),
        _ => "fetching metadata".into(),
    }
}
