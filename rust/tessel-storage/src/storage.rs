use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tessel_common::ConditionalSync;

mod backend;
pub use backend::*;

mod cache;
pub use cache::*;

mod measure;
pub use measure::*;

mod content_addressed;
pub use content_addressed::*;

/// A universal envelope for all compatible combinations of [Encoder] and
/// [StorageBackend] implementations. See the crate documentation for
/// a practical example of usage.
///
/// [Encoder]: crate::Encoder
#[derive(Clone)]
pub struct Storage<Encoder, Backend>
where
    Encoder: crate::Encoder,
    Backend: StorageBackend,
{
    /// The [Encoder] used by the [Storage]
    ///
    /// [Encoder]: crate::Encoder
    pub encoder: Encoder,
    /// The [StorageBackend] used by the [Storage]
    pub backend: Backend,
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<Encoder, Backend> crate::Encoder for Storage<Encoder, Backend>
where
    Encoder: crate::Encoder,
    Backend: StorageBackend,
    Self: ConditionalSync,
{
    type Bytes = Encoder::Bytes;
    type Hash = Encoder::Hash;
    type Error = Encoder::Error;

    async fn encode<T>(&self, chunk: &T) -> Result<(Self::Hash, Self::Bytes), Self::Error>
    where
        T: Serialize + ConditionalSync,
    {
        self.encoder.encode(chunk).await
    }

    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + ConditionalSync,
    {
        self.encoder.decode(bytes).await
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<Encoder, Backend> StorageBackend for Storage<Encoder, Backend>
where
    Encoder: crate::Encoder,
    Backend: StorageBackend,
    Self: ConditionalSync,
{
    type Key = Backend::Key;
    type Value = Backend::Value;
    type Error = Backend::Error;

    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error> {
        self.backend.set(key, value).await
    }

    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error> {
        self.backend.get(key).await
    }
}
