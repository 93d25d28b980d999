//! Client side of chunkxfer: fetches a published blob's metadata, then all
//! of its chunks over a bounded pool of concurrent workers.

mod client;
mod error;
mod fetcher;
mod retrieval;

pub use client::ServerClient;
pub use error::RetrieveError;
pub use fetcher::{ChunkFetcher, ChunkQueue, FetchSummary};
pub use retrieval::{Retrieval, RetrievalConfig, RetrievalReport};
