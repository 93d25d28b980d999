//! Wire types and on-disk layout shared by the chunkxfer publisher and
//! retriever.
//!
//! The publisher splits a generated blob into fixed-size chunk files and
//! publishes a [`TransferMetadata`] record describing it. The retriever
//! reads that record to plan a concurrent fetch of every chunk.

pub mod constants;
pub mod layout;
pub mod types;

// Re-export primary types for convenience.
pub use layout::{StoreLayout, chunk_count, chunk_len, chunk_path};
pub use types::{MetadataError, TransferMetadata};
