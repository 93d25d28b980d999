//! On-disk blob store shared by all request handlers.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use chunkxfer_protocol::{StoreLayout, TransferMetadata};
use chunkxfer_transfer::{GenerateOptions, RandomSource, generate, load_metadata_async};
use tokio::fs::File;
use tokio::sync::RwLock;
use tracing::debug;

use crate::PublisherError;

/// An opened file ready to stream, with its length.
#[derive(Debug)]
pub struct OpenedFile {
    pub file: File,
    pub len: u64,
}

/// The published blob, its chunk set and metadata under one base directory.
///
/// Generation takes the write lock for the whole pass; lookups take the
/// read lock while resolving and opening files. A request therefore sees
/// either the previous blob or the new one, never a mix.
///
/// The write guard moves into the blocking generation job, so it is held
/// until the job ends even if the calling request is dropped.
pub struct BlobStore {
    layout: StoreLayout,
    options: GenerateOptions,
    lock: Arc<RwLock<()>>,
}

impl BlobStore {
    pub fn new(base_dir: impl Into<PathBuf>, options: GenerateOptions) -> Self {
        Self {
            layout: StoreLayout::new(base_dir),
            options,
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Replaces the published blob with fresh random content.
    pub async fn generate(&self) -> Result<TransferMetadata, PublisherError> {
        let guard = Arc::clone(&self.lock).write_owned().await;

        let layout = self.layout.clone();
        let options = self.options;
        let meta = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            generate(RandomSource::new(), &layout, &options)
        })
        .await??;
        Ok(meta)
    }

    /// Current metadata record.
    pub async fn metadata(&self) -> Result<TransferMetadata, PublisherError> {
        let _guard = self.lock.read().await;
        Ok(load_metadata_async(&self.layout.meta_file()).await?)
    }

    /// Opens the whole-blob file.
    pub async fn open_blob(&self) -> Result<OpenedFile, PublisherError> {
        let _guard = self.lock.read().await;
        open(self.layout.data_file(), "data file").await
    }

    /// Opens chunk `index`, which must lie in `1..=chunks` of the current
    /// metadata.
    pub async fn open_chunk(&self, index: u64) -> Result<OpenedFile, PublisherError> {
        let _guard = self.lock.read().await;

        let meta = load_metadata_async(&self.layout.meta_file()).await?;
        if !meta.has_chunk(index) {
            return Err(PublisherError::NotFound(format!(
                "chunk {index} of {}",
                meta.chunks
            )));
        }
        open(self.layout.chunk_file(index), "chunk").await
    }
}

async fn open(path: PathBuf, what: &str) -> Result<OpenedFile, PublisherError> {
    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PublisherError::NotFound(format!(
                "{what} {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata().await?.len();
    debug!(path = %path.display(), len, "serving file");
    Ok(OpenedFile { file, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn store(dir: &std::path::Path, size: u64, chunk_size: u64) -> BlobStore {
        BlobStore::new(
            dir,
            GenerateOptions {
                size,
                chunk_size,
                verbose: false,
            },
        )
    }

    #[tokio::test]
    async fn metadata_before_generation_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 100, 10);

        let err = store.metadata().await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        let err = store.open_chunk(1).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_then_open() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 2500, 1000);

        let meta = store.generate().await.unwrap();
        assert_eq!(meta.chunks, 3);
        assert_eq!(store.metadata().await.unwrap(), meta);

        let blob = store.open_blob().await.unwrap();
        assert_eq!(blob.len, 2500);

        let mut last = store.open_chunk(3).await.unwrap();
        assert_eq!(last.len, 500);
        let mut bytes = Vec::new();
        last.file.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes.len(), 500);
    }

    #[tokio::test]
    async fn chunk_index_out_of_range() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 2500, 1000);
        store.generate().await.unwrap();

        assert!(matches!(
            store.open_chunk(0).await,
            Err(PublisherError::NotFound(_))
        ));
        assert!(matches!(
            store.open_chunk(4).await,
            Err(PublisherError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn dropped_generation_keeps_store_locked() {
        let tmp = tempfile::tempdir().unwrap();
        let size = 32 * 1024 * 1024;
        let store = store(tmp.path(), size, 1500);

        // Give up on the request long before the blob is written.
        let dropped =
            tokio::time::timeout(std::time::Duration::from_millis(1), store.generate()).await;
        assert!(dropped.is_err());

        // Readers wait for the abandoned generation and then see all of it.
        let meta = store.metadata().await.unwrap();
        assert_eq!(meta.size, size);
        assert_eq!(meta.chunks, chunkxfer_protocol::chunk_count(size, 1500));
        assert_eq!(
            std::fs::metadata(store.layout().data_file()).unwrap().len(),
            size
        );
    }

    #[tokio::test]
    async fn removed_chunk_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 2500, 1000);
        store.generate().await.unwrap();
        std::fs::remove_file(store.layout().chunk_file(2)).unwrap();

        assert!(matches!(
            store.open_chunk(2).await,
            Err(PublisherError::NotFound(_))
        ));
    }
}
