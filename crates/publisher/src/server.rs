//! Publisher server lifecycle.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chunkxfer_protocol::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_GENERATE_SIZE};
use chunkxfer_transfer::GenerateOptions;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::PublisherError;
use crate::routes::router;
use crate::store::BlobStore;

/// Configuration for the publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Directory holding the blob, its chunks and metadata.
    pub base_dir: PathBuf,
    /// Chunk size in bytes.
    pub chunk_size: u64,
    /// Size of each generated blob.
    pub generate_size: u64,
    /// Log every chunk write during generation.
    pub verbose: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/tmp/chunkxfer"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            generate_size: DEFAULT_GENERATE_SIZE,
            verbose: false,
        }
    }
}

/// HTTP server publishing one blob store.
pub struct PublisherServer {
    store: Arc<BlobStore>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl PublisherServer {
    pub fn new(config: PublisherConfig) -> Arc<Self> {
        let options = GenerateOptions {
            size: config.generate_size,
            chunk_size: config.chunk_size,
            verbose: config.verbose,
        };
        Arc::new(Self {
            store: Arc::new(BlobStore::new(config.base_dir, options)),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<BlobStore> {
        &self.store
    }

    /// Address the server is bound to, once serving.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }

    /// Binds `addr` and serves until [`shutdown`](Self::shutdown).
    pub async fn run(self: &Arc<Self>, addr: SocketAddr) -> Result<(), PublisherError> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener until [`shutdown`](Self::shutdown).
    ///
    /// In-flight requests complete before this returns.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), PublisherError> {
        let addr = listener.local_addr()?;
        if let Ok(mut slot) = self.local_addr.lock() {
            *slot = Some(addr);
        }
        info!(
            %addr,
            base_dir = %self.store.layout().base_dir().display(),
            chunk_size = self.store.options().chunk_size,
            "publisher listening"
        );

        let cancel = self.cancel.clone();
        axum::serve(listener, router(Arc::clone(&self.store)))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("publisher stopped");
        Ok(())
    }

    /// Stops accepting connections.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkxfer_protocol::TransferMetadata;
    use chunkxfer_protocol::constants::chunk_route;
    use chunkxfer_transfer::checksum_bytes;
    use reqwest::StatusCode;

    struct Running {
        server: Arc<PublisherServer>,
        base: String,
        task: tokio::task::JoinHandle<Result<(), PublisherError>>,
        _dir: tempfile::TempDir,
    }

    async fn start(generate_size: u64, chunk_size: u64) -> Running {
        let dir = tempfile::tempdir().unwrap();
        let server = PublisherServer::new(PublisherConfig {
            base_dir: dir.path().to_path_buf(),
            chunk_size,
            generate_size,
            verbose: false,
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(listener).await })
        };
        Running {
            server,
            base,
            task,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn serves_generated_blob_and_chunks() {
        let running = start(2500, 1000).await;
        let http = reqwest::Client::new();

        let resp = http
            .get(format!("{}/file", running.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let meta: TransferMetadata = http
            .post(format!("{}/newtest", running.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(meta.chunks, 3);
        assert_eq!(meta.size, 2500);

        let fetched: TransferMetadata = http
            .get(format!("{}/file", running.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched, meta);

        let blob = http
            .get(format!("{}/file/", running.base))
            .send()
            .await
            .unwrap();
        assert_eq!(
            blob.headers()[reqwest::header::CONTENT_TYPE],
            "application/octet-stream"
        );
        let blob = blob.bytes().await.unwrap();
        assert_eq!(checksum_bytes(&blob), meta.content_hash);

        let mut joined = Vec::new();
        for index in 1..=meta.chunks {
            let part = http
                .get(format!("{}{}", running.base, chunk_route(index)))
                .send()
                .await
                .unwrap();
            assert_eq!(part.status(), StatusCode::OK);
            joined.extend_from_slice(&part.bytes().await.unwrap());
        }
        assert_eq!(joined, blob);

        running.server.shutdown();
        running.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn chunk_request_errors() {
        let running = start(2500, 1000).await;
        let http = reqwest::Client::new();
        http.get(format!("{}/newtest", running.base))
            .send()
            .await
            .unwrap();

        let status = |path: &'static str| {
            let http = http.clone();
            let url = format!("{}{}", running.base, path);
            async move { http.get(url).send().await.unwrap().status() }
        };

        assert_eq!(status("/chunk/abc").await, StatusCode::BAD_REQUEST);
        assert_eq!(status("/chunk/-1").await, StatusCode::BAD_REQUEST);
        assert_eq!(status("/chunk/0").await, StatusCode::NOT_FOUND);
        assert_eq!(status("/chunk/4").await, StatusCode::NOT_FOUND);
        assert_eq!(status("/chunk/3").await, StatusCode::OK);

        running.server.shutdown();
        running.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn error_body_is_generic() {
        let running = start(100, 10).await;
        let resp = reqwest::get(format!("{}/file/", running.base))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = resp.text().await.unwrap();
        assert!(!body.contains("datafile"));

        running.server.shutdown();
        running.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn server_records_bound_address() {
        let running = start(0, 1500).await;
        // The serve task may not have started yet.
        for _ in 0..50 {
            if running.server.local_addr().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let addr = running.server.local_addr().unwrap();
        assert_eq!(format!("http://{addr}"), running.base);

        running.server.shutdown();
        running.task.await.unwrap().unwrap();
    }
}
