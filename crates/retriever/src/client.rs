//! HTTP client for a chunkxfer publisher.

use std::path::Path;
use std::time::Duration;

use chunkxfer_protocol::TransferMetadata;
use chunkxfer_protocol::constants::{ROUTE_GENERATE, ROUTE_METADATA, chunk_route};
use chunkxfer_transfer::parse_metadata;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::RetrieveError;

/// Client for one publisher.
#[derive(Clone)]
pub struct ServerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ServerClient {
    /// Creates a client for `server`, given as `host:port` or a full
    /// `http://` URL.
    ///
    /// `timeout` bounds each request, including its body.
    pub fn new(server: &str, timeout: Option<Duration>) -> Result<Self, RetrieveError> {
        let base_url = normalize_address(server)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues a GET and rejects non-2xx responses.
    async fn get(&self, path: &str) -> Result<reqwest::Response, RetrieveError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(&url).send().await?;
        check_status(url, resp)
    }

    /// Asks the publisher to generate a new blob.
    pub async fn generate(&self) -> Result<TransferMetadata, RetrieveError> {
        let url = format!("{}{}", self.base_url, ROUTE_GENERATE);
        let resp = self.http.post(&url).send().await?;
        let resp = check_status(url, resp)?;
        let meta = decode_metadata(&resp.bytes().await?)?;
        info!(sha1 = %meta.content_hash, chunks = meta.chunks, size = meta.size, "blob generated");
        Ok(meta)
    }

    /// Fetches the published metadata record.
    pub async fn fetch_metadata(&self) -> Result<TransferMetadata, RetrieveError> {
        let body = self.get(ROUTE_METADATA).await?.bytes().await?;
        let meta = decode_metadata(&body)?;
        info!(sha1 = %meta.content_hash, chunks = meta.chunks, size = meta.size, "metadata fetched");
        Ok(meta)
    }

    /// Downloads chunk `index` into `dest` and returns its length.
    ///
    /// `dest` is created (or truncated) before the request is sent.
    pub async fn download_chunk(&self, index: u64, dest: &Path) -> Result<u64, RetrieveError> {
        let mut file = File::create(dest).await?;
        let mut resp = self.get(&chunk_route(index)).await?;

        let mut written = 0u64;
        while let Some(bytes) = resp.chunk().await? {
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }
        file.flush().await?;

        debug!(index, bytes = written, "chunk stored");
        Ok(written)
    }
}

fn check_status(url: String, resp: reqwest::Response) -> Result<reqwest::Response, RetrieveError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(RetrieveError::Status {
            url,
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

fn decode_metadata(body: &[u8]) -> Result<TransferMetadata, RetrieveError> {
    parse_metadata(body).map_err(|e| RetrieveError::Metadata(e.to_string()))
}

/// Turns `host:port` or a URL into a base URL without a trailing slash.
fn normalize_address(server: &str) -> Result<String, RetrieveError> {
    let invalid = |reason: &str| RetrieveError::InvalidAddress(format!("{server}: {reason}"));

    let trimmed = server.trim();
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme @ ("http" | "https"), rest)) => (scheme, rest),
        Some((scheme, _)) => return Err(invalid(&format!("unsupported scheme {scheme:?}"))),
        None => ("http", trimmed),
    };
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(invalid("missing host"));
    }

    let candidate = format!("{scheme}://{rest}");
    let url = reqwest::Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(candidate)
}
