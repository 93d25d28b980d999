use chunkxfer_transfer::TransferError;

/// Errors produced while retrieving a blob.
#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed metadata: {0}")]
    Metadata(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("chunk {index} failed: {source}")]
    Chunk {
        index: u64,
        #[source]
        source: Box<RetrieveError>,
    },

    #[error("retrieval cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RetrieveError {
    /// Index of the chunk whose fetch failed, if this is a chunk failure.
    pub fn failed_chunk(&self) -> Option<u64> {
        match self {
            Self::Chunk { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_error_names_index_and_cause() {
        let err = RetrieveError::Chunk {
            index: 42,
            source: Box::new(RetrieveError::Status {
                url: "http://127.0.0.1:9090/chunk/42".into(),
                status: 404,
            }),
        };
        assert_eq!(err.failed_chunk(), Some(42));
        let msg = err.to_string();
        assert!(msg.contains("chunk 42"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn other_errors_have_no_chunk() {
        assert_eq!(RetrieveError::Cancelled.failed_chunk(), None);
        assert_eq!(RetrieveError::Metadata("x".into()).failed_chunk(), None);
    }
}
