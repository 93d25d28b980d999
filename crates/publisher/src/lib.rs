//! HTTP publisher for chunked blobs.
//!
//! Generates a random blob on request, splits it into numbered chunk files
//! and serves the blob, its chunks and its metadata over HTTP:
//!
//! | Route | Response |
//! |---|---|
//! | `GET/POST /newtest` | generate a new blob, respond with its metadata |
//! | `GET /file` | metadata JSON `{sha1, chunks, size}` |
//! | `GET /file/` | whole blob |
//! | `GET /chunk/{n}` | chunk `n` (1-based) |

mod error;
mod routes;
mod server;
mod store;

pub use error::PublisherError;
pub use routes::router;
pub use server::{PublisherConfig, PublisherServer};
pub use store::BlobStore;
