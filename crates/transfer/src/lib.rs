//! Chunked blob storage: splitting, hashing, persisting and reassembling.
//!
//! The publisher side runs [`generate`], which streams a source through a
//! [`HashingReader`] into both the whole-blob file and a [`ChunkWriter`],
//! then persists the resulting [`TransferMetadata`](chunkxfer_protocol::TransferMetadata).
//! The retriever side uses [`verify_chunks`] and [`assemble_chunks`] to
//! check and rebuild a fetched chunk set.

mod assemble;
mod chunked;
mod generate;
mod hashing;
mod metadata;

use std::path::PathBuf;

pub use assemble::{ChunkDigest, assemble_chunks, hash_chunks, verify_chunks};
pub use chunked::{ChunkSummary, ChunkWriter, WriteProgress};
pub use generate::{GenerateOptions, RandomSource, generate};
pub use hashing::{HashingReader, checksum_bytes, checksum_file};
pub use metadata::{load_metadata, load_metadata_async, parse_metadata, save_metadata};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("creating chunk directory {path}: {source}")]
    CreateChunkDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("creating chunk file {index}: {source}")]
    CreateChunk { index: u64, source: std::io::Error },

    #[error("writing chunk file {index}: {source}")]
    WriteChunk { index: u64, source: std::io::Error },

    #[error("source ended after {actual} of {expected} bytes")]
    SourceExhausted { expected: u64, actual: u64 },

    #[error("metadata not found: {0}")]
    MetadataNotFound(PathBuf),

    #[error("malformed metadata: {0}")]
    MetadataFormat(String),

    #[error("chunk {0} is missing")]
    ChunkMissing(u64),

    #[error("content hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}
