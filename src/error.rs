use std::io;

use thiserror::Error;

/// Failures at the key-value store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("store not initialized; run 'tracker init' first")]
    NotInitialized,
    #[error("failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}
