//! Shared constants: routes, file names and sizing defaults.

/// Default chunk size in bytes.
///
/// Small enough that a single chunk fits in one Ethernet frame payload.
pub const DEFAULT_CHUNK_SIZE: u64 = 1500;

/// Number of bytes produced by a generation request (10 MiB).
pub const DEFAULT_GENERATE_SIZE: u64 = 10 * 1024 * 1024;

/// Name of the whole-blob file inside the store directory.
pub const DATA_FILE_NAME: &str = "datafile";

/// Name of the metadata file inside the store directory.
pub const META_FILE_NAME: &str = "meta.json";

/// Name of the chunk subdirectory inside the store directory.
pub const CHUNK_DIR_NAME: &str = "chunks";

/// Length of a hex-encoded SHA-1 digest.
pub const CONTENT_HASH_HEX_LEN: usize = 40;

/// Route that triggers generation of a new blob.
pub const ROUTE_GENERATE: &str = "/newtest";

/// Route serving the metadata record.
pub const ROUTE_METADATA: &str = "/file";

/// Route serving the whole blob.
pub const ROUTE_BLOB: &str = "/file/";

/// Prefix of the per-chunk route; the 1-based index follows.
pub const ROUTE_CHUNK_PREFIX: &str = "/chunk/";

/// Builds the request path for chunk `index`.
pub fn chunk_route(index: u64) -> String {
    format!("{ROUTE_CHUNK_PREFIX}{index}")
}
