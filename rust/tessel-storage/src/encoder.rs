use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tessel_common::ConditionalSync;

use crate::{HashType, TesselStorageError};

mod cbor;
pub use cbor::*;

/// Turns chunks into bytes and names those bytes.
///
/// Implementations must be deterministic: encoding equal chunks has to yield
/// equal bytes (and therefore equal hashes), otherwise maps holding the same
/// entries stop sharing chunks.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Encoder: Clone {
    /// Encoded chunk
    type Bytes: AsRef<[u8]> + 'static + ConditionalSync;
    /// Name of an encoded chunk
    type Hash: HashType;
    /// Failure to encode or decode
    type Error: Into<TesselStorageError>;

    /// Encode `chunk`, returning its name along with its bytes
    async fn encode<T>(&self, chunk: &T) -> Result<(Self::Hash, Self::Bytes), Self::Error>
    where
        T: Serialize + ConditionalSync;

    /// Decode a chunk from `bytes`
    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + ConditionalSync;

    /// The name `chunk` would be stored under, without keeping its bytes
    async fn hash<T>(&self, chunk: &T) -> Result<Self::Hash, Self::Error>
    where
        T: Serialize + ConditionalSync,
    {
        let (hash, _) = self.encode(chunk).await?;
        Ok(hash)
    }
}
