use serde::{Deserialize, Serialize};

use crate::constants::CONTENT_HASH_HEX_LEN;

/// Reasons a metadata record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("content hash must be {CONTENT_HASH_HEX_LEN} hex characters, got {0:?}")]
    InvalidHash(String),

    #[error("chunk count {chunks} is inconsistent with size {size}")]
    InconsistentCount { chunks: u64, size: u64 },
}

/// Published description of a chunked blob.
///
/// All three fields are mandatory on the wire; a record missing any of
/// them fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMetadata {
    /// Hex SHA-1 of the whole, unsplit blob.
    #[serde(rename = "sha1")]
    pub content_hash: String,
    /// Number of chunk files, indexed `1..=chunks`.
    pub chunks: u64,
    /// Total blob size in bytes.
    pub size: u64,
}

impl TransferMetadata {
    pub fn new(content_hash: impl Into<String>, chunks: u64, size: u64) -> Self {
        Self {
            content_hash: content_hash.into(),
            chunks,
            size,
        }
    }

    /// Checks the record is internally consistent.
    ///
    /// The chunk size is not part of the record, so only the bounds that
    /// hold for any chunk size are checked: an empty blob has no chunks,
    /// and a non-empty blob has between one and `size` chunks.
    pub fn validate(&self) -> Result<(), MetadataError> {
        let hash_ok = self.content_hash.len() == CONTENT_HASH_HEX_LEN
            && self.content_hash.bytes().all(|b| b.is_ascii_hexdigit());
        if !hash_ok {
            return Err(MetadataError::InvalidHash(self.content_hash.clone()));
        }

        let count_ok = if self.size == 0 {
            self.chunks == 0
        } else {
            self.chunks >= 1 && self.chunks <= self.size
        };
        if !count_ok {
            return Err(MetadataError::InconsistentCount {
                chunks: self.chunks,
                size: self.size,
            });
        }

        Ok(())
    }

    /// Returns `true` if `index` names a published chunk.
    pub fn has_chunk(&self, index: u64) -> bool {
        index >= 1 && index <= self.chunks
    }
}
