use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tessel_common::ConditionalSync;

use crate::{Encoder, HashType, StorageBackend, TesselStorageError};

/// The chunk store a map is persisted into. Chunks are written once and named
/// by the hash of their encoding, so the same chunk written by two different
/// maps is stored (and later recognized) as one.
///
/// Any type that is both an [Encoder] and a [StorageBackend] keyed by that
/// encoder's hashes is a [ContentAddressedStorage]; in practice that is a
/// [Storage](crate::Storage) envelope.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ContentAddressedStorage: Clone + ConditionalSync + 'static {
    /// The name given to every chunk
    type Hash: HashType;
    /// Failures reading or writing chunks
    type Error: Into<TesselStorageError>;

    /// Load the chunk named `hash`, or `None` if it was never written
    async fn read<T>(&self, hash: &Self::Hash) -> Result<Option<T>, Self::Error>
    where
        T: DeserializeOwned + ConditionalSync;

    /// Persist `chunk` and return its name
    async fn write<T>(&mut self, chunk: &T) -> Result<Self::Hash, Self::Error>
    where
        T: Serialize + ConditionalSync;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<Store, Hash, Bytes> ContentAddressedStorage for Store
where
    Hash: HashType,
    Bytes: AsRef<[u8]> + 'static + ConditionalSync,
    Store: Encoder<Hash = Hash, Bytes = Bytes>
        + StorageBackend<Key = Hash, Value = Bytes>
        + ConditionalSync
        + 'static,
{
    type Hash = Hash;
    type Error = TesselStorageError;

    async fn read<T>(&self, hash: &Self::Hash) -> Result<Option<T>, Self::Error>
    where
        T: DeserializeOwned + ConditionalSync,
    {
        let Some(bytes) = self.get(hash).await.map_err(into_storage_error)? else {
            tracing::trace!(hash = %hash.display(), "Chunk not found");
            return Ok(None);
        };

        let chunk = self
            .decode(bytes.as_ref())
            .await
            .map_err(into_storage_error)?;
        Ok(Some(chunk))
    }

    async fn write<T>(&mut self, chunk: &T) -> Result<Self::Hash, Self::Error>
    where
        T: Serialize + ConditionalSync,
    {
        let (hash, bytes) = self.encode(chunk).await.map_err(into_storage_error)?;
        self.set(hash.clone(), bytes)
            .await
            .map_err(into_storage_error)?;
        Ok(hash)
    }
}

fn into_storage_error<Error>(error: Error) -> TesselStorageError
where
    Error: Into<TesselStorageError>,
{
    error.into()
}
