//! Metadata persistence.
//!
//! The record is written once per generation through a temporary file and
//! a rename, so readers never observe a partially written record.

use std::io::ErrorKind;
use std::path::Path;

use chunkxfer_protocol::TransferMetadata;
use tracing::debug;

use crate::TransferError;

/// Parses and validates a metadata record.
pub fn parse_metadata(bytes: &[u8]) -> Result<TransferMetadata, TransferError> {
    let meta: TransferMetadata = serde_json::from_slice(bytes)
        .map_err(|e| TransferError::MetadataFormat(e.to_string()))?;
    meta.validate()
        .map_err(|e| TransferError::MetadataFormat(e.to_string()))?;
    Ok(meta)
}

/// Writes `meta` to `path`, replacing any previous record.
pub fn save_metadata(path: &Path, meta: &TransferMetadata) -> Result<(), TransferError> {
    let json = serde_json::to_vec(meta).map_err(|e| TransferError::MetadataFormat(e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path)?;

    debug!(path = %path.display(), "metadata saved");
    Ok(())
}

/// Reads the record at `path`.
pub fn load_metadata(path: &Path) -> Result<TransferMetadata, TransferError> {
    let bytes = std::fs::read(path).map_err(|e| not_found_or_io(e, path))?;
    parse_metadata(&bytes)
}

/// Async variant of [`load_metadata`] for use inside request handlers.
pub async fn load_metadata_async(path: &Path) -> Result<TransferMetadata, TransferError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| not_found_or_io(e, path))?;
    parse_metadata(&bytes)
}

fn not_found_or_io(e: std::io::Error, path: &Path) -> TransferError {
    if e.kind() == ErrorKind::NotFound {
        TransferError::MetadataNotFound(path.to_path_buf())
    } else {
        TransferError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let meta = TransferMetadata::new(HASH, 2, 3000);

        save_metadata(&path, &meta).unwrap();
        assert_eq!(load_metadata(&path).unwrap(), meta);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");

        save_metadata(&path, &TransferMetadata::new(HASH, 1, 10)).unwrap();
        let newer = TransferMetadata::new(HASH, 7, 100);
        save_metadata(&path, &newer).unwrap();

        assert_eq!(load_metadata(&path).unwrap(), newer);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("meta.json");
        let result = save_metadata(&path, &TransferMetadata::new(HASH, 1, 1));
        assert!(matches!(result, Err(TransferError::Io(_))));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_metadata(&dir.path().join("meta.json"));
        assert!(matches!(result, Err(TransferError::MetadataNotFound(_))));
    }

    #[test]
    fn load_rejects_partial_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(&path, format!(r#"{{"sha1":"{HASH}","size":10}}"#)).unwrap();

        let result = load_metadata(&path);
        assert!(matches!(result, Err(TransferError::MetadataFormat(_))));
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            load_metadata(&path),
            Err(TransferError::MetadataFormat(_))
        ));
    }

    #[test]
    fn parse_rejects_inconsistent_record() {
        let json = format!(r#"{{"sha1":"{HASH}","chunks":0,"size":10}}"#);
        assert!(matches!(
            parse_metadata(json.as_bytes()),
            Err(TransferError::MetadataFormat(_))
        ));
    }

    #[tokio::test]
    async fn async_load_matches_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let meta = TransferMetadata::new(HASH, 3, 4000);
        save_metadata(&path, &meta).unwrap();

        assert_eq!(load_metadata_async(&path).await.unwrap(), meta);
        assert!(matches!(
            load_metadata_async(&dir.path().join("other.json")).await,
            Err(TransferError::MetadataNotFound(_))
        ));
    }
}
