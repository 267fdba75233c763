use thiserror::Error;

/// Everything that can go wrong while moving chunks in and out of storage
#[derive(Error, Debug)]
pub enum TesselStorageError {
    /// A chunk could not be serialized
    #[error("Chunk could not be encoded: {0}")]
    EncodeFailed(String),

    /// Stored bytes could not be turned back into a chunk
    #[error("Chunk could not be decoded: {0}")]
    DecodeFailed(String),

    /// The backend failed, or could not be set up
    #[error("Chunk storage failed: {0}")]
    StorageBackend(String),
}
