//! Concurrent chunk fetching over a bounded worker pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chunkxfer_protocol::chunk_path;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::RetrieveError;
use crate::client::ServerClient;

// ---------------------------------------------------------------------------
// ChunkQueue
// ---------------------------------------------------------------------------

/// Hands out chunk indices `1..=count`, each exactly once.
pub struct ChunkQueue {
    next: AtomicU64,
    count: u64,
}

impl ChunkQueue {
    pub fn new(count: u64) -> Self {
        Self {
            next: AtomicU64::new(1),
            count,
        }
    }

    /// Claims the next unclaimed index, or `None` once all are taken.
    pub fn claim(&self) -> Option<u64> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        (index <= self.count).then_some(index)
    }
}

// ---------------------------------------------------------------------------
// ChunkFetcher
// ---------------------------------------------------------------------------

/// Totals of a completed fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub chunks: u64,
    pub bytes: u64,
}

/// Fetches a chunk set into a local directory with `concurrency` workers.
pub struct ChunkFetcher {
    client: Arc<ServerClient>,
    chunk_dir: PathBuf,
    concurrency: usize,
}

impl ChunkFetcher {
    /// A `concurrency` of zero is treated as one.
    pub fn new(client: Arc<ServerClient>, chunk_dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            client,
            chunk_dir: chunk_dir.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Fetches chunks `1..=count` into the chunk directory.
    ///
    /// Fails on the first chunk error, naming that chunk. Workers stop
    /// claiming new chunks once any worker fails or `cancel` fires, but
    /// requests already in flight run to completion. No chunk is retried.
    pub async fn fetch_all(
        &self,
        count: u64,
        cancel: &CancellationToken,
    ) -> Result<FetchSummary, RetrieveError> {
        let queue = Arc::new(ChunkQueue::new(count));
        let stop = cancel.child_token();

        info!(
            chunks = count,
            workers = self.concurrency,
            dir = %self.chunk_dir.display(),
            "fetching chunks"
        );

        let mut workers = JoinSet::new();
        for id in 0..self.concurrency {
            workers.spawn(worker(
                id,
                Arc::clone(&self.client),
                self.chunk_dir.clone(),
                Arc::clone(&queue),
                stop.clone(),
            ));
        }

        let mut summary = FetchSummary::default();
        let mut first_error: Option<RetrieveError> = None;
        while let Some(joined) = workers.join_next().await {
            let result = joined.map_err(RetrieveError::from).and_then(|r| r);
            match result {
                Ok(done) => {
                    summary.chunks += done.chunks;
                    summary.bytes += done.bytes;
                }
                Err(e) => {
                    stop.cancel();
                    if first_error.is_none() {
                        first_error = Some(e);
                    } else {
                        warn!(error = %e, "additional worker failure");
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if summary.chunks < count {
            return Err(RetrieveError::Cancelled);
        }

        info!(chunks = summary.chunks, bytes = summary.bytes, "all chunks fetched");
        Ok(summary)
    }
}

async fn worker(
    id: usize,
    client: Arc<ServerClient>,
    chunk_dir: PathBuf,
    queue: Arc<ChunkQueue>,
    stop: CancellationToken,
) -> Result<FetchSummary, RetrieveError> {
    debug!(worker = id, "worker started");
    let mut done = FetchSummary::default();

    while !stop.is_cancelled() {
        let Some(index) = queue.claim() else {
            break;
        };
        let dest = chunk_path(&chunk_dir, index);

        match client.download_chunk(index, &dest).await {
            Ok(bytes) => {
                done.chunks += 1;
                done.bytes += bytes;
            }
            Err(e) => {
                stop.cancel();
                // Drop the partial file so only complete chunks stay on disk.
                if let Err(rm) = tokio::fs::remove_file(&dest).await {
                    debug!(worker = id, index, error = %rm, "no partial chunk to remove");
                }
                return Err(RetrieveError::Chunk {
                    index,
                    source: Box::new(e),
                });
            }
        }
    }

    debug!(worker = id, chunks = done.chunks, "worker exiting");
    Ok(done)
}
