use tessel_storage::TesselStorageError;
use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug)]
pub enum TesselMapError {
    /// An edit was requested that would break the ordering of the map, or
    /// that reaches past the entries that exist
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// There was a problem when accessing storage
    #[error("Storage error: {0}")]
    Storage(TesselStorageError),

    /// A referenced chunk is missing from storage
    #[error("Chunk not found in storage: {0}")]
    MissingChunk(String),

    /// A key could not be encoded for hashing
    #[error("Failed to encode key: {0}")]
    Encoding(String),

    /// The tree did not match the expected shape
    #[error("Tree did not match expected shape: {0}")]
    UnexpectedTreeShape(String),

    /// A callback passed to [`OrderedMap::for_each`] reported a failure
    ///
    /// [`OrderedMap::for_each`]: crate::OrderedMap::for_each
    #[error("Callback failed: {0}")]
    Callback(String),
}

impl From<TesselStorageError> for TesselMapError {
    fn from(value: TesselStorageError) -> Self {
        TesselMapError::Storage(value)
    }
}
