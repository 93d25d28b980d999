//! HTTP routes.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chunkxfer_protocol::TransferMetadata;
use chunkxfer_protocol::constants::{
    ROUTE_BLOB, ROUTE_CHUNK_PREFIX, ROUTE_GENERATE, ROUTE_METADATA,
};
use tokio_util::io::ReaderStream;
use tracing::{Instrument, debug, info, info_span};

use crate::PublisherError;
use crate::store::{BlobStore, OpenedFile};

/// Builds the publisher router over `store`.
pub fn router(store: Arc<BlobStore>) -> Router {
    Router::new()
        .route(ROUTE_GENERATE, get(new_blob).post(new_blob))
        .route(ROUTE_METADATA, get(metadata))
        .route(ROUTE_BLOB, get(blob))
        .route(&format!("{ROUTE_CHUNK_PREFIX}{{index}}"), get(chunk))
        .layer(middleware::from_fn(log_request))
        .with_state(store)
}

/// Logs each request and runs it inside a span carrying its method and
/// path, so handler and error logs name the request.
async fn log_request(req: Request, next: Next) -> Response {
    let span = info_span!("request", method = %req.method(), path = %req.uri().path());
    async move {
        info!("received");
        let resp = next.run(req).await;
        debug!(status = resp.status().as_u16(), "response");
        resp
    }
    .instrument(span)
    .await
}

async fn new_blob(
    State(store): State<Arc<BlobStore>>,
) -> Result<Json<TransferMetadata>, PublisherError> {
    Ok(Json(store.generate().await?))
}

async fn metadata(
    State(store): State<Arc<BlobStore>>,
) -> Result<Json<TransferMetadata>, PublisherError> {
    Ok(Json(store.metadata().await?))
}

async fn blob(State(store): State<Arc<BlobStore>>) -> Result<Response, PublisherError> {
    Ok(octet_stream(store.open_blob().await?))
}

async fn chunk(
    State(store): State<Arc<BlobStore>>,
    Path(raw): Path<String>,
) -> Result<Response, PublisherError> {
    let index: u64 = raw
        .parse()
        .map_err(|_| PublisherError::BadRequest(format!("invalid chunk index {raw:?}")))?;
    Ok(octet_stream(store.open_chunk(index).await?))
}

fn octet_stream(opened: OpenedFile) -> Response {
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(opened.len)),
    ];
    (headers, Body::from_stream(ReaderStream::new(opened.file))).into_response()
}
