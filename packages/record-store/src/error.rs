use std::path::PathBuf;

use thiserror::Error;

use crate::record::RecordId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The payload decoded as JSON but is not an attribute map.
    #[error("payload must be a JSON object, got {0}")]
    InvalidPayload(&'static str),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed source {path:?}: {reason}")]
    Shape { path: PathBuf, reason: String },
}
