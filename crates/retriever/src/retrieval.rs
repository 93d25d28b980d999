//! One complete retrieval: metadata, chunks, then verification.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use chunkxfer_protocol::{StoreLayout, TransferMetadata};
use chunkxfer_transfer::{assemble_chunks, save_metadata, verify_chunks};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::RetrieveError;
use crate::client::ServerClient;
use crate::fetcher::{ChunkFetcher, FetchSummary};

/// Settings for a [`Retrieval`].
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Local directory mirroring the publisher's store layout.
    pub data_dir: PathBuf,
    /// Number of concurrent chunk workers.
    pub concurrency: usize,
    /// Check the fetched chunks against the published content hash.
    pub verify: bool,
    /// Write the reassembled blob to `<data_dir>/datafile`.
    pub assemble: bool,
}

/// Outcome of a successful retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalReport {
    pub metadata: TransferMetadata,
    pub fetched: FetchSummary,
    pub verified: bool,
    pub assembled: Option<PathBuf>,
}

/// Fetches the published metadata and every chunk it lists.
pub struct Retrieval {
    client: Arc<ServerClient>,
    config: RetrievalConfig,
}

impl Retrieval {
    pub fn new(client: ServerClient, config: RetrievalConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }

    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.config.data_dir)
    }

    /// Runs the retrieval until done, failed or cancelled.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RetrievalReport, RetrieveError> {
        let layout = self.layout();
        let chunk_dir = layout.chunk_dir();
        // Chunks left by an earlier retrieval may belong to another blob.
        match tokio::fs::remove_dir_all(&chunk_dir).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        tokio::fs::create_dir_all(&chunk_dir).await?;

        let meta = self.client.fetch_metadata().await?;
        {
            let path = layout.meta_file();
            let meta = meta.clone();
            tokio::task::spawn_blocking(move || save_metadata(&path, &meta)).await??;
        }

        let fetcher = ChunkFetcher::new(
            Arc::clone(&self.client),
            chunk_dir.clone(),
            self.config.concurrency,
        );
        let fetched = fetcher.fetch_all(meta.chunks, cancel).await?;

        let assembled = if self.config.assemble {
            let out = layout.data_file();
            let digest = {
                let (dir, out, count) = (chunk_dir.clone(), out.clone(), meta.chunks);
                tokio::task::spawn_blocking(move || assemble_chunks(&dir, count, &out)).await??
            };
            if self.config.verify {
                digest.check(&meta)?;
            }
            Some(out)
        } else {
            if self.config.verify {
                let (dir, meta) = (chunk_dir.clone(), meta.clone());
                tokio::task::spawn_blocking(move || verify_chunks(&dir, &meta)).await??;
            }
            None
        };

        if self.config.verify {
            info!(sha1 = %meta.content_hash, "content hash verified");
        }

        Ok(RetrievalReport {
            metadata: meta,
            fetched,
            verified: self.config.verify,
            assembled,
        })
    }
}
